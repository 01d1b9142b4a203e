//! The top-level per-session orchestrator (spec §4.3).
//!
//! [`SessionRuntime`] owns one [`Session`] entity, its spawned assistant
//! child, its [`MessagePump`], and its [`PermissionGate`], and bridges
//! between them: remote input flows in through the pump, child output
//! flows out through the Sync Client as [`Message`]/[`Update`] publishes,
//! and permission requests round-trip through the gate.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use happy_core::protocol::{EntityRef, Scope};
use happy_core::{AgentEvent, AgentId, ApprovalDecision, Message, MessageBody, Session, SessionStatus};
use happy_sync::{SyncClient, SyncEvent};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::child::{AgentEventKind, ChildEvent, ChildSupervisor, SpawnConfig};
use crate::config::SessionConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::permission::PermissionGate;
use crate::pump::{MessagePump, ModeFingerprint, PumpAction, PumpInput};
use crate::store::LocalSessionStore;

/// Whether the terminal-attached CLI or a remote client currently drives
/// input (spec §4.3, "Control-mode switch").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Keyboard input on the controlling terminal is accepted.
    Local,
    /// Keyboard input is ignored; a remote (phone-driven) client drives.
    Remote,
}

/// Ties a spawned assistant child to its session bookkeeping.
pub struct SessionRuntime {
    session: RwLock<Session>,
    sync: SyncClient,
    child: Mutex<ChildSupervisor>,
    pump: Mutex<MessagePump>,
    permission_gate: Arc<PermissionGate>,
    local_store: LocalSessionStore,
    control_mode: RwLock<ControlMode>,
    cancellation: CancellationToken,
    config: SessionConfig,
    /// Open tool calls awaiting their result, keyed by the assistant's own
    /// tool-call id, so a `ChildEvent::ToolResult` can merge into the same
    /// message entity rather than creating a second one.
    tool_calls: Mutex<HashMap<String, Uuid>>,
}

impl SessionRuntime {
    /// Runs the full session-start sequence from spec §4.3:
    ///
    /// 1. (machine identity is resolved by the caller, which owns the
    ///    daemon-wide `Machine` entity)
    /// 2. Creates the `Session` entity.
    /// 3. The caller already opened the session-scoped Sync Client
    ///    connection and passes it in.
    /// 4-6. Spawns the assistant child pointed at the tool-extension and
    ///    hook servers.
    /// 7. Returns with the message pump ready to run.
    ///
    /// `permission_gate` is constructed by the caller rather than here,
    /// since it must already back the tool-extension server's own gating
    /// before the child is spawned and told that server's URL.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] if the assistant binary can't be found or
    /// fails to spawn.
    pub async fn start(
        session: Session,
        sync: SyncClient,
        spawn_config: SpawnConfig,
        config: SessionConfig,
        local_store: LocalSessionStore,
        permission_gate: Arc<PermissionGate>,
    ) -> RuntimeResult<Self> {
        info!(session_id = %session.id, flavor = %spawn_config.flavor, "starting session runtime");

        let child = ChildSupervisor::spawn(spawn_config)?;

        register_permission_handler(&sync, session.id.clone(), Arc::clone(&permission_gate)).await;

        Ok(Self {
            session: RwLock::new(session),
            sync,
            child: Mutex::new(child),
            pump: Mutex::new(MessagePump::new(config.shell_command_timeout)),
            permission_gate,
            local_store,
            control_mode: RwLock::new(ControlMode::Local),
            cancellation: CancellationToken::new(),
            config,
            tool_calls: Mutex::new(HashMap::new()),
        })
    }

    /// Shared handle to this session's permission gate, for the RPC layer
    /// that implements `processPermissionRequest`.
    #[must_use]
    pub fn permission_gate(&self) -> Arc<PermissionGate> {
        Arc::clone(&self.permission_gate)
    }

    /// The cancellation token tied to this session's lifetime (spec §5:
    /// "All suspension points MUST be cancellable via a shared cancellation
    /// token tied to the session lifetime").
    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Current control mode.
    pub async fn control_mode(&self) -> ControlMode {
        *self.control_mode.read().await
    }

    /// Flips the control-mode bit and publishes the change as a persistent
    /// update (spec §4.3). The first keypress on a `remote`-mode terminal
    /// calls this with `Local`; an explicit remote command calls it with
    /// `Remote`.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError::SyncError`] if publishing the update
    /// fails.
    pub async fn set_control_mode(&self, mode: ControlMode) -> RuntimeResult<()> {
        {
            let current = *self.control_mode.read().await;
            if current == mode {
                return Ok(());
            }
        }
        *self.control_mode.write().await = mode;

        let controlled_by_user = mode == ControlMode::Local;
        let session_id = self.session.read().await.id.clone();
        let entity = EntityRef::Session { id: session_id };
        self.sync
            .mutate(entity, move |_current| {
                // The session's full metadata body isn't reconstructed
                // here; agentState changes are metadata-only updates and
                // the applier merges by entity, not by replacing the
                // whole document.
                serde_json::to_vec(&serde_json::json!({ "controlledByUser": controlled_by_user }))
                    .unwrap_or_default()
            })
            .await?;

        let mut session = self.session.write().await;
        session.set_controlled_by_user(controlled_by_user);
        Ok(())
    }

    /// Publishes the `thinking` presence bit (spec §3, "presence bits").
    /// Flips to `true` the moment input reaches the child and back to
    /// `false` on the next `ready` event, mirroring [`Self::set_control_mode`]'s
    /// publish-then-mutate pattern.
    async fn publish_thinking(&self, thinking: bool) -> RuntimeResult<()> {
        let session_id = self.session.read().await.id.clone();
        let entity = EntityRef::Session { id: session_id };
        self.sync
            .mutate(entity, move |_current| serde_json::to_vec(&serde_json::json!({ "thinking": thinking })).unwrap_or_default())
            .await?;

        let mut session = self.session.write().await;
        session.set_thinking(thinking);
        Ok(())
    }

    /// Accepts one line of remote (or local terminal) input, running it
    /// through the message pump.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] if a resulting batch fails to reach the
    /// child, or if publishing a shell-result message fails.
    pub async fn accept_input(&self, text: String, fingerprint: ModeFingerprint) -> RuntimeResult<()> {
        let action = self.pump.lock().await.feed(PumpInput { text, fingerprint }).await;
        self.apply_pump_action(action).await
    }

    async fn apply_pump_action(&self, action: PumpAction) -> RuntimeResult<()> {
        let session_id = self.session.read().await.id.clone();
        match action {
            PumpAction::Queued => Ok(()),
            PumpAction::Flushed(batch) => self.deliver_batch(&session_id, batch).await,
            PumpAction::FlushedIsolated { discarded, command } => {
                if discarded > 0 {
                    warn!(session_id = %session_id, discarded, "flush-and-isolate discarded queued messages");
                }
                self.deliver_batch(&session_id, vec![command]).await
            },
            PumpAction::ShellResult { rendered, .. } => {
                self.publish_body(&session_id, MessageBody::AgentText { text: rendered }).await
            },
        }
    }

    async fn deliver_batch(&self, session_id: &happy_core::types::SessionId, batch: Vec<String>) -> RuntimeResult<()> {
        {
            let child = self.child.lock().await;
            for line in &batch {
                self.publish_body(session_id, MessageBody::UserText { text: line.clone() }).await?;
                child.send_input(session_id, line).await?;
            }
        }
        self.publish_thinking(true).await
    }

    /// Publishes a brand-new message entity with the given body.
    async fn publish_body(&self, session_id: &happy_core::types::SessionId, body: MessageBody) -> RuntimeResult<()> {
        let message = Message::new(session_id.clone(), body);
        let entity = EntityRef::Message { session_id: session_id.clone(), message_id: message.id };
        let encoded = serde_json::to_vec(&message).map_err(|e| RuntimeError::StorageError(e.to_string()))?;
        self.sync.mutate(entity, move |_current| encoded.clone()).await?;
        Ok(())
    }

    /// Publishes a new tool-call message and remembers its id so the
    /// matching result can be merged in later, rather than flattened into a
    /// second plain-text message (spec §9, "tool-call children").
    async fn publish_tool_call(
        &self,
        session_id: &happy_core::types::SessionId,
        tool_id: String,
        name: String,
        arguments: serde_json::Value,
    ) -> RuntimeResult<()> {
        let message = Message::new(session_id.clone(), MessageBody::ToolCall(happy_core::ToolCallBody::new(tool_id.clone(), name, arguments)));
        let message_id = message.id;
        let entity = EntityRef::Message { session_id: session_id.clone(), message_id };
        let encoded = serde_json::to_vec(&message).map_err(|e| RuntimeError::StorageError(e.to_string()))?;
        self.sync.mutate(entity, move |_current| encoded.clone()).await?;
        self.tool_calls.lock().await.insert(tool_id, message_id);
        Ok(())
    }

    /// Merges a tool result into its already-published call entity. If the
    /// call id is unknown (e.g. the call was published before this runtime
    /// started), the result is logged and dropped rather than fabricating
    /// an orphaned call.
    async fn complete_tool_call(
        &self,
        session_id: &happy_core::types::SessionId,
        tool_id: &str,
        output: String,
        is_error: bool,
    ) -> RuntimeResult<()> {
        let Some(message_id) = self.tool_calls.lock().await.remove(tool_id) else {
            warn!(session_id = %session_id, tool_id, "tool result for an unknown tool call, dropping");
            return Ok(());
        };
        let entity = EntityRef::Message { session_id: session_id.clone(), message_id };
        self.sync
            .mutate(entity, move |current| {
                let Some(current) = current else { return Vec::new() };
                let Ok(mut message) = serde_json::from_slice::<Message>(current) else {
                    return current.to_vec();
                };
                if let MessageBody::ToolCall(ref mut call) = message.body {
                    call.output = Some(output.clone());
                    call.is_error = is_error;
                }
                message.touch();
                serde_json::to_vec(&message).unwrap_or_else(|_| current.to_vec())
            })
            .await?;
        Ok(())
    }

    /// Drains child events, translating each into exactly one protocol
    /// message and publishing it, until the child exits (spec §4.3,
    /// "Child-process lifecycle": "each event translates into one protocol
    /// message published via the Sync Client").
    ///
    /// Runs until the child exits or the session's cancellation token
    /// fires; callers spawn this as the session's long-running task.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] if publishing an event fails
    /// persistently (transient relay loss is absorbed by the Sync
    /// Client's own reconnect logic and never surfaces here).
    pub async fn run_event_loop(&self) -> RuntimeResult<()> {
        let session_id = self.session.read().await.id.clone();
        loop {
            let event = {
                let mut child = self.child.lock().await;
                tokio::select! {
                    () = self.cancellation.cancelled() => return self.handle_shutdown().await,
                    event = child.next_event() => event,
                }
            };

            match event {
                Some(ChildEvent::TextChunk(text)) => {
                    self.publish_body(&session_id, MessageBody::AgentText { text }).await?;
                },
                Some(ChildEvent::ToolCall { id, name, arguments }) => {
                    self.publish_tool_call(&session_id, id, name, arguments).await?;
                },
                Some(ChildEvent::ToolResult { id, output, is_error }) => {
                    self.complete_tool_call(&session_id, &id, output, is_error).await?;
                },
                Some(ChildEvent::AgentEvent(kind)) => {
                    self.publish_body(&session_id, MessageBody::AgentEvent(agent_event_from_kind(kind))).await?;
                },
                Some(ChildEvent::Ready(usage)) => {
                    info!(
                        session_id = %session_id,
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "assistant child reported usage and went idle"
                    );
                    self.publish_body(
                        &session_id,
                        MessageBody::AgentEvent(AgentEvent::ReadyWithUsage {
                            input_tokens: usage.input_tokens,
                            output_tokens: usage.output_tokens,
                        }),
                    )
                    .await?;
                    self.publish_thinking(false).await?;
                },
                Some(ChildEvent::Unparsed(line)) => {
                    warn!(session_id = %session_id, %line, "unparsed assistant output line");
                },
                Some(ChildEvent::Exit { code }) => {
                    return self.handle_exit(code).await;
                },
                None => {
                    return self.handle_exit(None).await;
                },
            }
        }
    }

    /// Watches this session's own scope for `Message`/`User` updates
    /// authored by some other connection — a phone/web client appending
    /// directly to the message log, per spec §4.3: "Also receives remote
    /// messages (from phone/web) via the Sync Client and injects them into
    /// the child." Messages this runtime itself published (via
    /// `deliver_batch`) never reach here: the Sync Client's self-echo
    /// suppression drops them before the subscription observes them, so
    /// every arrival on this loop is genuinely remote.
    ///
    /// Runs until the session's cancellation token fires; callers spawn
    /// this alongside [`Self::run_event_loop`].
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`] if feeding an accepted message into the
    /// pump fails.
    pub async fn run_remote_input_loop(&self) -> RuntimeResult<()> {
        let session_id = self.session.read().await.id.clone();
        let mut events = self.sync.subscribe(Scope::Session { id: session_id.clone() }).await;
        loop {
            let event = tokio::select! {
                () = self.cancellation.cancelled() => return Ok(()),
                event = events.recv() => event,
            };

            let entity = match event {
                Ok(SyncEvent::EntityUpdated { entity, .. }) => entity,
                Ok(SyncEvent::Resumed | SyncEvent::Ephemeral { .. }) => continue,
                Ok(SyncEvent::ResyncRequired { min_seq }) => {
                    warn!(session_id = %session_id, min_seq, "remote input subscription needs resync");
                    continue;
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(session_id = %session_id, skipped, "remote input subscription lagged");
                    continue;
                },
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
            };

            let EntityRef::Message { session_id: ref msg_session_id, .. } = entity else { continue };
            if *msg_session_id != session_id {
                continue;
            }

            let Some(body) = self.sync.peek(&entity) else { continue };
            let message: Message = match serde_json::from_slice(&body) {
                Ok(message) => message,
                Err(error) => {
                    warn!(session_id = %session_id, %error, "undecodable remote message, dropping");
                    continue;
                },
            };
            let MessageBody::UserText { text } = message.body else { continue };

            self.accept_input(text, self.fingerprint().await).await?;
        }
    }

    /// The fingerprint in effect right now, derived from this session's
    /// static config (spec §4.3, "Message pump": "keyed by a mode
    /// fingerprint"). Tool allow/deny lists and system-prompt overrides
    /// aren't yet surfaced as live per-session knobs, so they're empty/unset
    /// here rather than threaded through from elsewhere.
    async fn fingerprint(&self) -> ModeFingerprint {
        ModeFingerprint::new(self.config.permission_mode, self.config.model.clone(), Vec::new(), Vec::new(), None)
    }

    async fn handle_exit(&self, code: Option<i32>) -> RuntimeResult<()> {
        let session_id = self.session.read().await.id.clone();
        info!(session_id = %session_id, ?code, "assistant child exited");
        self.publish_body(&session_id, MessageBody::AgentEvent(AgentEvent::SessionDeath)).await?;
        self.publish_status(SessionStatus::Archived).await?;
        self.local_store.remove(&session_id).await?;
        Ok(())
    }

    async fn handle_shutdown(&self) -> RuntimeResult<()> {
        let session_id = self.session.read().await.id.clone();
        info!(session_id = %session_id, "session runtime received shutdown signal");
        self.child.lock().await.terminate(self.config.shutdown_grace).await;
        self.publish_status(SessionStatus::Archived).await?;
        Ok(())
    }

    /// Publishes a lifecycle transition through the Sync Client before
    /// touching the local `Session` copy, the same publish-then-mutate
    /// pattern [`Self::set_control_mode`] uses for `controlledByUser` — so
    /// every other connected client observes the session ending/archiving
    /// via the update log rather than only this process's in-memory state.
    async fn publish_status(&self, status: SessionStatus) -> RuntimeResult<()> {
        let session_id = self.session.read().await.id.clone();
        let entity = EntityRef::Session { id: session_id };
        self.sync
            .mutate(entity, move |_current| serde_json::to_vec(&serde_json::json!({ "status": status })).unwrap_or_default())
            .await?;

        let mut session = self.session.write().await;
        session.set_status(status);
        Ok(())
    }

    /// Requests graceful shutdown: cancels the event loop, which kills the
    /// child with the configured grace period (spec §4.3, "On signal
    /// (SIGTERM/SIGINT): ... kills the child with a grace period").
    pub fn shutdown(&self) {
        self.cancellation.cancel();
    }
}

/// Registers this session as the primary handler for the
/// `processPermissionRequest` RPC (spec §4.3, "Permission-request flow":
/// "A remote client responds with `allow` or `deny` via an RPC").
///
/// The handler itself is synchronous (the Sync Client's `HandlerFn`
/// contract), so it decodes the decision and hands resolution off to a
/// spawned task rather than awaiting `PermissionGate::resolve` inline;
/// the RPC reply is an immediate ack, not a wait for the gate to unblock.
async fn register_permission_handler(sync: &SyncClient, session_id: happy_core::types::SessionId, gate: Arc<PermissionGate>) {
    let handler: happy_sync::HandlerFn = Arc::new(move |body: Vec<u8>| {
        let decision: ApprovalDecision = serde_json::from_slice(&body)?;
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            gate.resolve(decision).await;
        });
        Ok(serde_json::to_vec(&serde_json::json!({ "ok": true })).unwrap_or_default())
    });
    sync.register(Scope::Session { id: session_id }, "processPermissionRequest", handler).await;
}

/// Seeds a fresh relay-backed session from the assistant's own on-disk
/// session file after a reconnect (spec §4.3, "Offline fallback").
///
/// Returns the queued plaintext lines that were accumulated while offline,
/// in order, so the caller can re-deliver them through the message pump
/// once the new session is live.
///
/// # Errors
///
/// Returns a [`RuntimeError::StorageError`] if the local seed can't be
/// read.
pub async fn reseed_from_offline(
    local_store: &LocalSessionStore,
    offline_session_id: &happy_core::types::SessionId,
) -> RuntimeResult<Vec<String>> {
    let Some(seed) = local_store.load(offline_session_id).await? else {
        return Ok(Vec::new());
    };
    if seed.consumed {
        return Ok(Vec::new());
    }
    local_store.mark_consumed(offline_session_id).await?;
    Ok(seed.pending_messages)
}

/// Resolves the agent identifier for a flavor, matching the binary name
/// convention the CLI launches under (spec §3, Machine/Session relation).
#[must_use]
pub fn agent_id_for_flavor(flavor: crate::child::AssistantFlavor) -> AgentId {
    AgentId::new(flavor.binary_name())
}

/// Maps the child-process wire-level [`AgentEventKind`] onto the protocol's
/// closed [`AgentEvent`] message body.
fn agent_event_from_kind(kind: AgentEventKind) -> AgentEvent {
    match kind {
        AgentEventKind::SwitchMode(mode) => AgentEvent::SwitchMode { mode },
        AgentEventKind::LimitReached => AgentEvent::LimitReached,
        AgentEventKind::Other(kind) => AgentEvent::Other { kind },
    }
}

/// Default path under the workspace where the assistant's own session
/// transcript is expected to live, used as the `assistant_session_file`
/// when seeding an offline [`crate::store::LocalSessionSeed`].
#[must_use]
pub fn default_assistant_session_file(workspace_root: &std::path::Path, flavor: crate::child::AssistantFlavor) -> PathBuf {
    workspace_root.join(format!(".{}", flavor.binary_name())).join("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_matches_binary_name() {
        assert_eq!(agent_id_for_flavor(crate::child::AssistantFlavor::Claude).as_str(), "claude");
    }

    #[tokio::test]
    async fn reseed_returns_empty_for_unknown_session() {
        let store = crate::store::in_memory_store();
        let id = happy_core::types::SessionId::generate();
        let pending = reseed_from_offline(&store, &id).await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn reseed_returns_pending_messages_once() {
        let store = crate::store::in_memory_store();
        let id = happy_core::types::SessionId::generate();
        store
            .append_pending(&id, std::path::Path::new("/tmp/x"), "hello")
            .await
            .unwrap();
        let pending = reseed_from_offline(&store, &id).await.unwrap();
        assert_eq!(pending, vec!["hello".to_string()]);

        // A second reseed attempt finds the seed already consumed.
        let pending_again = reseed_from_offline(&store, &id).await.unwrap();
        assert!(pending_again.is_empty());
    }
}
