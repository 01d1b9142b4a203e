//! Derives a session's runtime configuration from the layered [`Config`].
//!
//! This replaces the teacher's `config_bridge`, which translated the same
//! root config into an LLM-provider-calling `RuntimeConfig`. Here there is
//! no provider to configure: a session's config is the subset of knobs the
//! child-process supervisor, message pump, and permission gate need.

use std::time::Duration;

use happy_config::types::Config;

use crate::child::{AssistantFlavor, PermissionMode, SandboxConfig};

/// Everything [`crate::session::SessionRuntime::start`] needs, derived once
/// from the loaded [`Config`] plus the per-invocation flavor/workspace.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Which assistant to spawn.
    pub flavor: AssistantFlavor,
    /// Initial permission mode.
    pub permission_mode: PermissionMode,
    /// Sandbox posture.
    pub sandbox: SandboxConfig,
    /// Timeout for a pending permission request before it denies by
    /// default (spec §4.3).
    pub permission_timeout: Duration,
    /// Timeout for a shell-prefix (`$ ...` / `! ...`) short-circuit
    /// command.
    pub shell_command_timeout: Duration,
    /// Grace period before a SIGKILL on session stop.
    pub shutdown_grace: Duration,
    /// Idle timeout after which a session with no activity is closed.
    pub idle_timeout: Duration,
    /// Model override passed through to the child's env var, if any.
    pub model: Option<String>,
    /// Maximum reconnect attempts the Sync Client should make before
    /// surfacing a disconnected status.
    pub relay_max_attempts: u32,
}

impl SessionConfig {
    /// Builds a session config from the root config for one invocation.
    #[must_use]
    pub fn from_config(config: &Config, flavor: AssistantFlavor, model: Option<String>) -> Self {
        let permission_mode = if config.security.policy.require_approval_for_delete
            || config.security.policy.require_approval_for_network
        {
            PermissionMode::Default
        } else {
            PermissionMode::AutoApprovePlan
        };

        Self {
            flavor,
            permission_mode,
            sandbox: SandboxConfig {
                restrict_writes_to_workspace: true,
                deny_network: !config.security.policy.denied_hosts.is_empty()
                    && config.security.policy.allowed_hosts.is_empty(),
            },
            permission_timeout: Duration::from_secs(config.timeouts.approval_secs),
            shell_command_timeout: Duration::from_secs(config.timeouts.tool_secs),
            shutdown_grace: Duration::from_secs(config.gateway.shutdown_timeout_secs),
            idle_timeout: Duration::from_secs(config.timeouts.idle_secs),
            model,
            relay_max_attempts: config.retry.relay_max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_produce_auto_approve_plan_mode() {
        let config = Config::default();
        let session_config = SessionConfig::from_config(&config, AssistantFlavor::Claude, None);
        // Default policy requires approval for delete/network, so the
        // derived mode stays fully gated rather than auto-approving.
        assert_eq!(session_config.permission_mode, PermissionMode::Default);
    }

    #[test]
    fn model_override_is_carried_through() {
        let config = Config::default();
        let session_config =
            SessionConfig::from_config(&config, AssistantFlavor::Codex, Some("gpt-5".to_string()));
        assert_eq!(session_config.model.as_deref(), Some("gpt-5"));
    }
}
