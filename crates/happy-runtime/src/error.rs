//! Runtime error types.

use happy_core::types::SessionId;
use thiserror::Error;

/// Errors that can occur in the session runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Session not found.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// Session already exists.
    #[error("session already exists: {0}")]
    SessionExists(SessionId),

    /// The configured assistant binary could not be located on `PATH`.
    #[error("assistant binary not found: {0}")]
    AssistantNotFound(String),

    /// Spawning the assistant child process failed.
    #[error("failed to spawn assistant child: {0}")]
    SpawnFailed(#[source] std::io::Error),

    /// The child process exited before accepting the requested write.
    #[error("child process for session {0} is no longer running")]
    ChildGone(SessionId),

    /// MCP error surfaced from the tool-extension server.
    #[error("MCP error: {0}")]
    McpError(#[from] happy_mcp::McpError),

    /// Audit error.
    #[error("audit error: {0}")]
    AuditError(#[from] happy_audit::AuditError),

    /// Capability error.
    #[error("capability error: {0}")]
    CapabilityError(#[from] happy_capabilities::CapabilityError),

    /// Security error.
    #[error("security error: {0}")]
    SecurityError(#[from] happy_core::SecurityError),

    /// Sync client error (publishing a session update to the relay failed).
    #[error("sync error: {0}")]
    SyncError(#[from] happy_sync::SyncError),

    /// Local on-disk session state could not be read or written.
    #[error("storage error: {0}")]
    StorageError(String),

    /// A pending permission request timed out with no decision; per the
    /// design notes this is not itself a terminal error but callers that
    /// need to surface it as one (e.g. the shell-command short-circuit)
    /// use this variant.
    #[error("permission request denied: {reason}")]
    PermissionDenied {
        /// Why the request was denied (explicit deny, or timeout default).
        reason: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
