//! Out-of-band verification: confirming a sensitive action through the
//! frontend itself rather than through the capability/approval flow (e.g.
//! the CLI printing a one-time code the user must acknowledge before a new
//! machine is allowed to link to their account).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Timestamp;

/// A request for the user to confirm something out of band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Unique request id.
    pub request_id: Uuid,
    /// Human-readable message to show the user.
    pub message: String,
    /// When the request was created.
    pub created_at: Timestamp,
}

impl VerificationRequest {
    /// Creates a new verification request.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            message: message.into(),
            created_at: Timestamp::now(),
        }
    }
}

/// The user's response to a [`VerificationRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResponse {
    /// Request this responds to.
    pub request_id: Uuid,
    /// Whether the user confirmed.
    pub confirmed: bool,
}

impl VerificationResponse {
    /// Creates a confirming response.
    #[must_use]
    pub fn confirmed(request_id: Uuid) -> Self {
        Self { request_id, confirmed: true }
    }

    /// Creates a denying response.
    #[must_use]
    pub fn denied(request_id: Uuid) -> Self {
        Self { request_id, confirmed: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmed_response_marks_request() {
        let req = VerificationRequest::new("link this machine?");
        let resp = VerificationResponse::confirmed(req.request_id);
        assert_eq!(resp.request_id, req.request_id);
        assert!(resp.confirmed);
    }
}
