//! The RPC broker: `(scope, method)` handler registration and in-flight
//! call tracking.
//!
//! Spec §4.1's routing rule is "at most one primary handler at a time: the
//! most recently registered connection" — registering again simply
//! overwrites the prior handler, there is no explicit unregister. Calls to
//! an absent handler fail fast with `no-handler`; calls to a live handler
//! are tracked in `pending` until the handler responds or the caller's
//! timeout fires.

use std::collections::HashMap;
use std::time::Duration;

use happy_core::protocol::Scope;
use happy_core::types::ConnectionId;
use tokio::sync::{Mutex, oneshot};
use uuid::Uuid;

use crate::error::RpcError;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct HandlerKey {
    scope: Scope,
    method: String,
}

/// The result a handler's `rpc-response` carries back to the caller.
#[derive(Debug, Clone)]
pub enum RpcOutcome {
    /// The call succeeded.
    Success {
        /// Opaque encrypted response body.
        response: happy_core::protocol::Ciphertext,
    },
    /// The call failed at the application level (still a response, not a
    /// transport failure).
    Failure {
        /// Opaque encrypted error body.
        error_body: happy_core::protocol::Ciphertext,
    },
}

/// Registered handlers and in-flight calls for the whole relay.
#[derive(Default)]
pub struct RpcBroker {
    handlers: Mutex<HashMap<HandlerKey, ConnectionId>>,
    pending: Mutex<HashMap<Uuid, oneshot::Sender<RpcOutcome>>>,
}

impl RpcBroker {
    /// Creates an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `connection_id` as the primary handler for
    /// `(scope, method)`, replacing whatever connection held it before.
    pub async fn register(&self, scope: Scope, method: String, connection_id: ConnectionId) {
        self.handlers.lock().await.insert(HandlerKey { scope, method }, connection_id);
    }

    /// Drops every handler registration `connection_id` held, called on
    /// disconnect so a dead connection never looks like a live handler.
    pub async fn deregister_connection(&self, connection_id: ConnectionId) {
        self.handlers.lock().await.retain(|_, holder| *holder != connection_id);
    }

    /// Looks up the current primary handler for `(scope, method)`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::NoHandler`] if nothing is currently registered.
    pub async fn resolve_handler(&self, scope: &Scope, method: &str) -> Result<ConnectionId, RpcError> {
        self.handlers
            .lock()
            .await
            .get(&HandlerKey { scope: scope.clone(), method: method.to_string() })
            .copied()
            .ok_or(RpcError::NoHandler)
    }

    /// Registers a pending call awaiting a response, returning the receiver
    /// half that the caller should await with its own timeout wrapper.
    pub async fn begin_call(&self, call_id: Uuid) -> oneshot::Receiver<RpcOutcome> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(call_id, tx);
        rx
    }

    /// Resolves a pending call with the handler's response. Returns `false`
    /// if no call with this id is outstanding (already timed out, or a
    /// duplicate/bogus `rpc-response`).
    pub async fn resolve_call(&self, call_id: Uuid, outcome: RpcOutcome) -> bool {
        if let Some(tx) = self.pending.lock().await.remove(&call_id) {
            tx.send(outcome).is_ok()
        } else {
            false
        }
    }

    /// Fails every pending call whose handler was `connection_id`, used
    /// when that connection's transport closes mid-call (spec §4.1's
    /// "handler connection's transport closed mid-call" -> `transport`).
    ///
    /// Since `pending` only tracks call ids, not which handler owns them,
    /// callers pass the specific ids they know were routed to the departed
    /// connection (tracked by the connection actor itself).
    pub async fn fail_call(&self, call_id: Uuid) {
        if let Some(tx) = self.pending.lock().await.remove(&call_id) {
            let _ = tx.send(RpcOutcome::Failure { error_body: happy_core::protocol::Ciphertext::new(Vec::new()) });
        }
    }

    /// Awaits `rx` up to `timeout`, synthesizing [`RpcError::Timeout`] if it
    /// elapses first.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Timeout`] on elapsed deadline, or
    /// [`RpcError::Transport`] if the sender was dropped without a
    /// response (the handler connection died without an explicit
    /// `fail_call`).
    pub async fn await_response(
        rx: oneshot::Receiver<RpcOutcome>,
        timeout: Duration,
    ) -> Result<RpcOutcome, RpcError> {
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(RpcError::Transport),
            Err(_) => Err(RpcError::Timeout),
        }
    }
}
