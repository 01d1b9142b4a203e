//! The hook server (spec §4.3 step 4): a small `axum` application the CLI
//! binds on loopback, receiving lifecycle callbacks posted by the assistant
//! child (e.g. "I rotated my internal session id to X").
//!
//! Grounded on the same `axum::Router` + `with_state` shape happy-relay
//! uses for its `/ws` endpoint, scaled down to a couple of POST routes and
//! a shared-secret header check instead of a full authenticator.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A lifecycle callback the assistant child posted to the hook server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HookEvent {
    /// The assistant rotated its own on-disk session id (happens on
    /// `/clear`-style resets internal to the assistant, independent of the
    /// Happy session id).
    SessionRotated {
        /// The new session id the assistant will use for its own on-disk
        /// transcript going forward.
        new_session_id: String,
    },
    /// A free-form lifecycle notice the assistant flavor doesn't map to a
    /// typed event (logged, not acted on).
    Other {
        /// Raw event name as reported by the child.
        name: String,
        /// Raw payload, if any.
        #[serde(default)]
        payload: serde_json::Value,
    },
}

/// Shared state for the hook server: where events are forwarded, and the
/// shared secret every request must present.
pub struct HookServerState {
    events_tx: mpsc::UnboundedSender<HookEvent>,
    token: String,
}

impl HookServerState {
    /// Builds hook-server state, returning the state and the receiving end
    /// of the event channel for the session loop to drain.
    #[must_use]
    pub fn new(token: String) -> (Arc<Self>, mpsc::UnboundedReceiver<HookEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (Arc::new(Self { events_tx, token }), events_rx)
    }
}

/// Builds the `axum` router serving the hook server's single `/hooks`
/// endpoint. Callers own binding a listener and calling `axum::serve`.
pub fn app(state: Arc<HookServerState>) -> axum::Router {
    axum::Router::new().route("/hooks", post(receive_hook)).with_state(state)
}

async fn receive_hook(
    State(state): State<Arc<HookServerState>>,
    headers: HeaderMap,
    body: axum::Json<HookEvent>,
) -> StatusCode {
    let presented = headers.get("x-happy-hook-token").and_then(|v| v.to_str().ok()).unwrap_or_default();
    if presented != state.token {
        warn!("hook server rejected request with bad token");
        return StatusCode::UNAUTHORIZED;
    }

    let event = body.0;
    debug!(?event, "received hook event");
    if state.events_tx.send(event).is_err() {
        // Receiver dropped: the session has already torn down its loop.
        return StatusCode::GONE;
    }
    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn rejects_request_with_wrong_token() {
        let (state, _rx) = HookServerState::new("secret".to_string());
        let app = app(state);

        let request = Request::post("/hooks")
            .header("content-type", "application/json")
            .header("x-happy-hook-token", "wrong")
            .body(Body::from(r#"{"kind":"other","name":"ping"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn accepts_session_rotated_with_correct_token() {
        let (state, mut rx) = HookServerState::new("secret".to_string());
        let app = app(state);

        let request = Request::post("/hooks")
            .header("content-type", "application/json")
            .header("x-happy-hook-token", "secret")
            .body(Body::from(r#"{"kind":"session_rotated","new_session_id":"abc123"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let event = rx.recv().await.unwrap();
        match event {
            HookEvent::SessionRotated { new_session_id } => assert_eq!(new_session_id, "abc123"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn gone_when_receiver_already_dropped() {
        let (state, rx) = HookServerState::new("secret".to_string());
        drop(rx);
        let app = app(state);

        let request = Request::post("/hooks")
            .header("content-type", "application/json")
            .header("x-happy-hook-token", "secret")
            .body(Body::from(r#"{"kind":"other","name":"ping"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::GONE);
    }
}
