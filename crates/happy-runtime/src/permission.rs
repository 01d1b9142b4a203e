//! Permission-request flow (spec §4.3, "Permission-request flow").
//!
//! When the assistant child asks to run a gated tool, the runtime emits a
//! structured [`happy_core::ApprovalRequest`] into the session log and
//! waits for either a remote `processPermissionRequest` RPC or, if the
//! session's permission mode auto-approves plan-only calls, resolves it
//! locally without waiting. A pending request that times out always
//! denies (spec §4.3, "the default is deny").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use happy_core::{ApprovalDecision, ApprovalOption, ApprovalRequest, SessionId, timeout_decision};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::child::PermissionMode;
use crate::error::{RuntimeError, RuntimeResult};

/// A tool call the child wants to make, before it's wrapped as an
/// [`ApprovalRequest`].
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Name of the tool being invoked.
    pub tool_name: String,
    /// Arguments passed to the tool, rendered for display.
    pub arguments: serde_json::Value,
    /// Whether this tool is read-only / plan-safe (eligible for
    /// auto-approve-plan).
    pub is_plan_safe: bool,
}

/// Gates tool calls behind user approval, honoring the auto-approve-plan
/// bit and a configurable timeout-denies-by-default policy.
pub struct PermissionGate {
    session_id: SessionId,
    permission_mode: PermissionMode,
    timeout: Duration,
    pending: Mutex<HashMap<Uuid, oneshot::Sender<ApprovalDecision>>>,
}

impl PermissionGate {
    /// Creates a gate for one session.
    #[must_use]
    pub fn new(session_id: SessionId, permission_mode: PermissionMode, timeout: Duration) -> Self {
        Self { session_id, permission_mode, timeout, pending: Mutex::new(HashMap::new()) }
    }

    /// Requests approval for a tool invocation.
    ///
    /// `publish` is called with the [`ApprovalRequest`] to append to the
    /// session message log and forward to remote clients; it runs before
    /// this call starts waiting, so a remote client sees the request as
    /// soon as this function can possibly be answered.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::PermissionDenied`] if the request is denied,
    /// explicitly or by timeout.
    pub async fn request<F>(&self, invocation: ToolInvocation, publish: F) -> RuntimeResult<ApprovalDecision>
    where
        F: FnOnce(ApprovalRequest) -> RuntimeResult<()>,
    {
        if self.permission_mode == PermissionMode::BypassPermissions {
            return Ok(ApprovalDecision::new(Uuid::new_v4(), ApprovalOption::AllowAlways));
        }

        if self.permission_mode == PermissionMode::AutoApprovePlan && invocation.is_plan_safe {
            debug!(tool = %invocation.tool_name, "auto-approving plan-safe tool call");
            return Ok(ApprovalDecision::new(Uuid::new_v4(), ApprovalOption::AllowOnce));
        }

        let request = ApprovalRequest::new(
            self.session_id.clone(),
            invocation.tool_name.clone(),
            format!("run tool `{}`", invocation.tool_name),
        )
        .with_resource(invocation.arguments.to_string());

        let request_id = request.request_id;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id, tx);

        publish(request)?;

        let decision = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(_)) => {
                self.pending.lock().await.remove(&request_id);
                timeout_decision(request_id)
            },
            Err(_) => {
                self.pending.lock().await.remove(&request_id);
                warn!(%request_id, "permission request timed out, denying by default");
                timeout_decision(request_id)
            },
        };

        if decision.is_approved() {
            Ok(decision)
        } else {
            Err(RuntimeError::PermissionDenied {
                reason: decision.reason.unwrap_or_else(|| "denied".to_string()),
            })
        }
    }

    /// Resolves a pending request with a remote decision (the
    /// `processPermissionRequest` RPC handler calls this).
    ///
    /// Returns `false` if no request with that ID is pending (already
    /// resolved or timed out).
    pub async fn resolve(&self, decision: ApprovalDecision) -> bool {
        if let Some(tx) = self.pending.lock().await.remove(&decision.request_id) {
            tx.send(decision).is_ok()
        } else {
            false
        }
    }

    /// Number of requests currently awaiting a decision.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

/// Shared handle type sessions hand to their RPC layer.
pub type SharedPermissionGate = Arc<PermissionGate>;

#[cfg(test)]
mod tests {
    use super::*;
    use happy_core::types::SessionId;

    fn session_id() -> SessionId {
        SessionId::generate()
    }

    #[tokio::test]
    async fn bypass_mode_allows_without_publishing() {
        let gate = PermissionGate::new(session_id(), PermissionMode::BypassPermissions, Duration::from_secs(5));
        let invocation =
            ToolInvocation { tool_name: "bash".into(), arguments: serde_json::json!({}), is_plan_safe: false };
        let decision = gate
            .request(invocation, |_| panic!("should not publish in bypass mode"))
            .await
            .expect("allowed");
        assert!(decision.is_approved());
    }

    #[tokio::test]
    async fn auto_approve_plan_allows_plan_safe_without_waiting() {
        let gate = PermissionGate::new(session_id(), PermissionMode::AutoApprovePlan, Duration::from_secs(5));
        let invocation =
            ToolInvocation { tool_name: "read_file".into(), arguments: serde_json::json!({}), is_plan_safe: true };
        let decision = gate
            .request(invocation, |_| panic!("should not publish for plan-safe auto-approve"))
            .await
            .expect("allowed");
        assert!(decision.is_approved());
    }

    #[tokio::test]
    async fn auto_approve_plan_still_gates_non_plan_tools() {
        let gate = Arc::new(PermissionGate::new(
            session_id(),
            PermissionMode::AutoApprovePlan,
            Duration::from_millis(50),
        ));
        let invocation =
            ToolInvocation { tool_name: "bash".into(), arguments: serde_json::json!({}), is_plan_safe: false };
        let result = gate.request(invocation, |_| Ok(())).await;
        assert!(matches!(result, Err(RuntimeError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn remote_allow_resolves_pending_request() {
        let gate = Arc::new(PermissionGate::new(session_id(), PermissionMode::Default, Duration::from_secs(5)));
        let gate_clone = Arc::clone(&gate);
        let invocation =
            ToolInvocation { tool_name: "bash".into(), arguments: serde_json::json!({}), is_plan_safe: false };

        let handle = tokio::spawn(async move {
            gate_clone
                .request(invocation, |_| Ok(()))
                .await
        });

        // Give the request task a chance to register as pending.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let pending_id = {
            let pending = gate.pending.lock().await;
            *pending.keys().next().expect("one pending request")
        };
        let resolved = gate.resolve(ApprovalDecision::new(pending_id, ApprovalOption::AllowOnce)).await;
        assert!(resolved);

        let decision = handle.await.unwrap().expect("approved");
        assert!(decision.is_approved());
    }

    #[tokio::test]
    async fn timeout_denies_by_default() {
        let gate = PermissionGate::new(session_id(), PermissionMode::Default, Duration::from_millis(20));
        let invocation =
            ToolInvocation { tool_name: "bash".into(), arguments: serde_json::json!({}), is_plan_safe: false };
        let result = gate.request(invocation, |_| Ok(())).await;
        assert!(matches!(result, Err(RuntimeError::PermissionDenied { .. })));
    }
}
