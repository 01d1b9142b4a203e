//! Error types for capability token issuance, storage, and validation.

use thiserror::Error;

/// Result alias for fallible capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Errors raised while creating, storing, or checking capability tokens.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The token's ed25519 signature did not verify against the issuer's
    /// public key, or the signing data could not be reconstructed.
    #[error("capability token signature is invalid")]
    InvalidSignature,

    /// The token's `expires_at` (with clock skew tolerance applied) has
    /// passed.
    #[error("capability token {token_id} has expired")]
    TokenExpired {
        /// The expired token's id.
        token_id: String,
    },

    /// A single-use token was presented a second time.
    #[error("capability token {token_id} has already been used")]
    TokenAlreadyUsed {
        /// The already-used token's id.
        token_id: String,
    },

    /// The token id has been explicitly revoked.
    #[error("capability token {token_id} has been revoked")]
    TokenRevoked {
        /// The revoked token's id.
        token_id: String,
    },

    /// No token with the given id exists in the store.
    #[error("capability token {token_id} not found")]
    TokenNotFound {
        /// The id that was looked up.
        token_id: String,
    },

    /// The resource pattern string could not be parsed.
    #[error("invalid resource pattern: {0}")]
    InvalidPattern(String),

    /// The underlying key-value store failed to read or write.
    #[error("capability storage error: {0}")]
    StorageError(String),

    /// A token failed to (de)serialize to/from its stored representation.
    #[error("capability serialization error: {0}")]
    SerializationError(String),
}
