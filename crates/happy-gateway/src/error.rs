//! Gateway error taxonomy.

use happy_core::types::SessionId;
use thiserror::Error;

/// Errors the daemon surface can return, either to its own startup
/// sequence or across the local control RPC boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Loading the layered configuration failed.
    #[error("config error: {0}")]
    Config(#[from] happy_config::error::ConfigError),

    /// A session-runtime operation failed.
    #[error("runtime error: {0}")]
    Runtime(#[from] happy_runtime::RuntimeError),

    /// Opening or using a durable KV store failed.
    #[error("storage error: {0}")]
    Storage(#[from] happy_storage::error::StorageError),

    /// Opening a relay Sync Client connection or an RPC over it failed.
    #[error("sync error: {0}")]
    Sync(#[from] happy_sync::SyncError),

    /// An unknown assistant flavor was requested.
    #[error("{0}")]
    InvalidFlavor(String),

    /// The requested session isn't tracked by this daemon.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// `spawnSession` was called with a `workingDir` that isn't a directory.
    #[error("working directory does not exist or is not a directory: {0}")]
    InvalidWorkingDir(String),

    /// The state directory already holds a live daemon (spec: "Opening a
    /// second daemon on the same state directory MUST be rejected").
    #[error("a daemon is already running for this state directory (pid {0})")]
    AlreadyRunning(u32),

    /// Reading or writing the daemon state file failed.
    #[error("daemon state file error: {0}")]
    StateFile(#[source] std::io::Error),

    /// The jsonrpsee server failed to bind or start.
    #[error("RPC server error: {0}")]
    RpcServer(String),

    /// I/O failure not covered by a more specific variant above.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<&GatewayError> for jsonrpsee::types::ErrorObjectOwned {
    fn from(err: &GatewayError) -> Self {
        let code = match err {
            GatewayError::SessionNotFound(_) => error_codes::SESSION_NOT_FOUND,
            GatewayError::InvalidWorkingDir(_) | GatewayError::InvalidFlavor(_) => error_codes::INVALID_REQUEST,
            GatewayError::AlreadyRunning(_) => error_codes::DAEMON_SHUTTING_DOWN,
            _ => error_codes::INTERNAL_ERROR,
        };
        jsonrpsee::types::ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
    }
}

/// JSON-RPC error codes for the `happy` namespace, matching spec §6's
/// terminal RPC outcomes (`no-handler`/`timeout`/transport errors are
/// synthesized by the Sync Client's own `invoke`; these are the daemon's
/// own application-level failures).
pub mod error_codes {
    /// The session id named in the request is not tracked by this daemon.
    pub const SESSION_NOT_FOUND: i32 = -32001;
    /// Arguments failed validation (bad working directory, unknown flavor).
    pub const INVALID_REQUEST: i32 = -32002;
    /// The daemon is tearing down and cannot accept new work.
    pub const DAEMON_SHUTTING_DOWN: i32 = -32003;
    /// An internal failure occurred; see the error message for detail.
    pub const INTERNAL_ERROR: i32 = -32004;
}
