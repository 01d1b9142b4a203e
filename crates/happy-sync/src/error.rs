//! The Sync Client's error taxonomy, matching spec §7's propagation policy:
//! transient transport errors are recovered internally and never reach this
//! enum; only terminal failures the caller must react to are represented
//! here.

use happy_core::protocol::Scope;
use thiserror::Error;

/// Errors a caller of [`crate::SyncClient`] can observe.
///
/// Transport drops and reconnect attempts are handled internally by the
/// client's reconnect loop and never surface as a `SyncError` — callers
/// instead observe them through [`crate::ConnectionState`]. Everything in
/// this enum is a terminal, application-visible outcome.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A [`crate::mutate`](crate::SyncClient::mutate) call exhausted its
    /// rebase-and-retry budget against repeated `version-mismatch`
    /// rejections.
    #[error("state conflict: exhausted {attempts} rebase attempts against {scope}")]
    StateConflict {
        /// How many rebase attempts were made before giving up.
        attempts: u32,
        /// The scope the conflicting entity belongs to.
        scope: Scope,
    },
    /// The outbox is full and the pending mutation cannot be coalesced with
    /// an already-queued one for the same entity.
    #[error("backpressure: outbox is full")]
    Backpressure,
    /// An RPC call's `timeoutMs` elapsed with no response.
    #[error("rpc call timed out")]
    Timeout,
    /// No connection currently holds the primary handler for the target
    /// `(scope, method)`.
    #[error("no handler registered for this method")]
    NoHandler,
    /// The handler connection's transport closed mid-call.
    #[error("rpc transport failure")]
    RpcTransport,
    /// The bearer credential was rejected; the connection cannot proceed
    /// until the caller supplies a fresh one.
    #[error("authentication failed")]
    AuthFailed,
    /// The envelope could not be sealed or opened.
    #[error("encryption failure: {0}")]
    Crypto(#[from] happy_crypto::CryptoError),
    /// A message failed to (de)serialize as the wire JSON envelope.
    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
    /// The client was dropped or shut down while the call was in flight.
    #[error("sync client is shutting down")]
    Closed,
    /// The underlying WebSocket transport failed to connect or carry a
    /// frame. Recovered internally by the reconnect loop; only escalates to
    /// a caller when it happens mid-RPC-call.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Convenience alias for this crate's fallible operations.
pub type SyncResult<T> = Result<T, SyncError>;
