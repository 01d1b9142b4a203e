//! The Relay Core's error taxonomy, mirrored 1:1 onto the wire `reason`
//! tags carried by `update-reject` and `rpc-error` (see `happy_core::protocol`)
//! so the taxonomy in spec §7 is enforced by the type system rather than by
//! string matching at the edges.

use happy_core::protocol::{RpcErrorReason, UpdateRejectReason};
use happy_core::types::ConnectionId;
use happy_storage::StorageError;
use thiserror::Error;

/// Errors raised while publishing an update against the durable log.
#[derive(Debug, Error)]
pub enum PublishError {
    /// `expectedVersion` did not match the entity's current version.
    #[error("version mismatch: expected {expected}, current is {current}")]
    VersionMismatch {
        /// The version the publisher proposed against.
        expected: u64,
        /// The entity's actual current version.
        current: u64,
        /// The entity's actual current body.
        current_body: Vec<u8>,
    },
    /// The connection is not authorized to publish against this scope.
    #[error("connection not authorized for this scope")]
    Unauthorized,
    /// The publisher is exceeding its rate limit.
    #[error("rate limit exceeded")]
    RateLimit,
    /// The durable store could not complete the write.
    #[error("durable store failed: {0}")]
    Storage(#[from] StorageError),
}

impl PublishError {
    /// Maps this error to the wire-level rejection reason and, where
    /// applicable, the current state to carry alongside it.
    #[must_use]
    pub fn reject_reason(&self) -> UpdateRejectReason {
        match self {
            Self::VersionMismatch { .. } => UpdateRejectReason::VersionMismatch,
            Self::Unauthorized => UpdateRejectReason::Auth,
            Self::RateLimit => UpdateRejectReason::RateLimit,
            Self::Storage(_) => UpdateRejectReason::RateLimit,
        }
    }
}

/// Errors raised while subscribing to or replaying a scope.
#[derive(Debug, Error)]
pub enum SubscribeError {
    /// The connection is not authorized to subscribe to this scope.
    #[error("connection not authorized for this scope")]
    Unauthorized,
    /// The requested `sinceSeq` is below the account's retention horizon;
    /// the caller must refetch a full snapshot.
    #[error("resync required: retention floor is {min_seq}")]
    ResyncRequired {
        /// The lowest `seq` the server can still replay.
        min_seq: u64,
    },
    /// The durable store could not complete the read.
    #[error("durable store failed: {0}")]
    Storage(#[from] StorageError),
}

/// The terminal outcome of an RPC call, matching the three states spec §4.1
/// names plus the transport-loss case added by §6's `rpc-error` reasons.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No connection currently holds the primary handler for the target
    /// `(scope, method)` pair.
    #[error("no handler registered for this method")]
    NoHandler,
    /// The call's timeout elapsed with no response.
    #[error("rpc call timed out")]
    Timeout,
    /// The handler connection's transport closed mid-call.
    #[error("handler connection closed mid-call")]
    Transport,
}

impl From<&RpcError> for RpcErrorReason {
    fn from(err: &RpcError) -> Self {
        match err {
            RpcError::NoHandler => Self::NoHandler,
            RpcError::Timeout => Self::Timeout,
            RpcError::Transport => Self::Transport,
        }
    }
}

/// Errors raised while admitting or managing a connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The bearer credential did not resolve to an account.
    #[error("authentication failed")]
    AuthFailed,
    /// A message arrived that violates the protocol's state machine (e.g. a
    /// publish before authentication completed).
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// The connection named in a lookup is no longer registered.
    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),
}
