//! Hook event types shared across crates.
//!
//! `HookEvent` lives in `happy-core` so that both `happy-hooks` and
//! `happy-runtime` can reference it without creating a circular dependency.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Events that can trigger hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    /// Session has started.
    SessionStart,
    /// Session is ending.
    SessionEnd,
    /// User has submitted a prompt.
    UserPrompt,
    /// Before a tool call is executed.
    PreToolCall,
    /// After a tool call completes successfully.
    PostToolCall,
    /// A tool call resulted in an error.
    ToolError,
    /// Before an approval request is shown.
    PreApproval,
    /// After an approval decision is made.
    PostApproval,
    /// A notification needs to be sent.
    Notification,
    /// Before context compaction.
    PreCompact,
    /// The daemon is starting.
    DaemonStart,
    /// The daemon is stopping.
    DaemonStop,
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionStart => write!(f, "session_start"),
            Self::SessionEnd => write!(f, "session_end"),
            Self::UserPrompt => write!(f, "user_prompt"),
            Self::PreToolCall => write!(f, "pre_tool_call"),
            Self::PostToolCall => write!(f, "post_tool_call"),
            Self::ToolError => write!(f, "tool_error"),
            Self::PreApproval => write!(f, "pre_approval"),
            Self::PostApproval => write!(f, "post_approval"),
            Self::Notification => write!(f, "notification"),
            Self::PreCompact => write!(f, "pre_compact"),
            Self::DaemonStart => write!(f, "daemon_start"),
            Self::DaemonStop => write!(f, "daemon_stop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_snake_case_serde_tag() {
        for event in [
            HookEvent::SessionStart,
            HookEvent::SessionEnd,
            HookEvent::UserPrompt,
            HookEvent::PreToolCall,
            HookEvent::PostToolCall,
            HookEvent::ToolError,
            HookEvent::PreApproval,
            HookEvent::PostApproval,
            HookEvent::Notification,
            HookEvent::PreCompact,
            HookEvent::DaemonStart,
            HookEvent::DaemonStop,
        ] {
            let json = serde_json::to_string(&event).unwrap();
            let tag = json.trim_matches('"');
            assert_eq!(tag, event.to_string());
        }
    }
}
