//! Client-side RPC plumbing (spec §4.2 "RPC dispatcher: outstanding calls
//! awaiting response, and registered inbound handlers").
//!
//! Mirrors the relay's own call bookkeeping in structure
//! (`happy_relay::rpc::RpcBroker` tracks the same `call_id -> waiter`
//! shape server-side) but from the calling client's perspective: this
//! module tracks calls *this* client issued and is waiting on, plus the
//! local method handlers it has registered to serve inbound calls.

use std::collections::HashMap;
use std::sync::Arc;

use happy_core::protocol::{Ciphertext, RpcErrorReason, Scope};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

/// The outcome of an RPC call this client made.
#[derive(Debug, Clone)]
pub enum RpcOutcome {
    /// The remote handler succeeded.
    Ok(Ciphertext),
    /// The remote handler returned an application-level error.
    Err(Ciphertext),
}

/// Tracks outbound calls awaiting a response and inbound method handlers
/// this client has registered.
#[derive(Default)]
pub struct RpcTable {
    pending: HashMap<Uuid, oneshot::Sender<SyncResult<RpcOutcome>>>,
    handled_methods: HashMap<(Scope, String), ()>,
}

impl RpcTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins tracking a call, returning the receiver the caller awaits.
    pub fn begin_call(&mut self, call_id: Uuid) -> oneshot::Receiver<SyncResult<RpcOutcome>> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(call_id, tx);
        rx
    }

    /// Resolves a pending call with its outcome. No-ops if the call is no
    /// longer tracked (already timed out, or a stray duplicate response).
    pub fn resolve(&mut self, call_id: Uuid, outcome: SyncResult<RpcOutcome>) {
        if let Some(tx) = self.pending.remove(&call_id) {
            let _ = tx.send(outcome);
        }
    }

    /// Resolves a pending call from the relay's terminal-failure reason.
    pub fn fail(&mut self, call_id: Uuid, reason: RpcErrorReason) {
        let err = match reason {
            RpcErrorReason::NoHandler => SyncError::NoHandler,
            RpcErrorReason::Timeout => SyncError::Timeout,
            RpcErrorReason::Transport => SyncError::RpcTransport,
        };
        self.resolve(call_id, Err(err));
    }

    /// Fails every still-pending call, used when the transport drops; a
    /// reconnect cannot resume an in-flight call since the relay has
    /// already forgotten it.
    pub fn fail_all_transport(&mut self) {
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(SyncError::RpcTransport));
        }
    }

    /// Records that this client now serves `method` on `scope`. Idempotent.
    pub fn register_handler(&mut self, scope: Scope, method: String) {
        self.handled_methods.insert((scope, method), ());
    }

    /// Whether this client has registered itself as the primary handler for
    /// `(scope, method)`. Used to route an inbound `ServerMessage::RpcCall`
    /// to the right local dispatch table; the relay itself enforces
    /// single-primary-handler semantics, so this is just a local lookup of
    /// "did I ask to serve this."
    #[must_use]
    pub fn is_registered(&self, scope: &Scope, method: &str) -> bool {
        self.handled_methods.contains_key(&(scope.clone(), method.to_string()))
    }

    /// Number of calls still awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// A local handler for one `(scope, method)` pair, invoked when an inbound
/// [`happy_core::protocol::ServerMessage::RpcCall`] is routed to this
/// client. Handlers receive the opaque request body already opened to
/// plaintext and return the plaintext response to seal and send back.
pub type HandlerFn = Arc<dyn Fn(Vec<u8>) -> SyncResult<Vec<u8>> + Send + Sync>;

/// Maps `(scope, method)` to the closure serving it locally.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: std::collections::HashMap<(Scope, String), HandlerFn>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` to serve `method` on `scope`, replacing any
    /// prior handler for the same pair.
    pub fn insert(&mut self, scope: Scope, method: String, handler: HandlerFn) {
        self.handlers.insert((scope, method), handler);
    }

    /// Looks up the handler for `(scope, method)`, if registered locally.
    #[must_use]
    pub fn get(&self, scope: &Scope, method: &str) -> Option<HandlerFn> {
        self.handlers.get(&(scope.clone(), method.to_string())).cloned()
    }

    /// Every distinct method name registered locally, for re-announcing
    /// `rpcHandle` after a reconnect.
    #[must_use]
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.handlers.keys().map(|(_, method)| method.clone()).collect();
        methods.sort_unstable();
        methods.dedup();
        methods
    }
}

#[cfg(test)]
mod tests {
    use happy_core::types::AccountId;

    use super::*;

    fn scope() -> Scope {
        Scope::Account { id: AccountId::new() }
    }

    #[test]
    fn resolve_delivers_the_outcome_to_the_waiter() {
        let mut table = RpcTable::new();
        let call_id = Uuid::new_v4();
        let rx = table.begin_call(call_id);
        table.resolve(call_id, Ok(RpcOutcome::Ok(Ciphertext::new(vec![1]))));
        let outcome = rx.try_recv().unwrap().unwrap();
        assert!(matches!(outcome, RpcOutcome::Ok(_)));
    }

    #[test]
    fn resolving_an_untracked_call_is_a_silent_noop() {
        let mut table = RpcTable::new();
        table.resolve(Uuid::new_v4(), Ok(RpcOutcome::Ok(Ciphertext::new(vec![]))));
    }

    #[test]
    fn fail_all_transport_drains_every_waiter_with_an_error() {
        let mut table = RpcTable::new();
        let call_id = Uuid::new_v4();
        let rx = table.begin_call(call_id);
        table.fail_all_transport();
        assert!(matches!(rx.try_recv().unwrap(), Err(SyncError::RpcTransport)));
        assert_eq!(table.pending_count(), 0);
    }

    #[test]
    fn handler_registry_round_trips() {
        let mut registry = HandlerRegistry::new();
        let scope = scope();
        registry.insert(scope.clone(), "ping".into(), Arc::new(|req| Ok(req)));
        assert!(registry.get(&scope, "ping").is_some());
        assert!(registry.get(&scope, "pong").is_none());
    }

    #[test]
    fn is_registered_reflects_local_handler_claims() {
        let mut table = RpcTable::new();
        let scope = scope();
        assert!(!table.is_registered(&scope, "ping"));
        table.register_handler(scope.clone(), "ping".into());
        assert!(table.is_registered(&scope, "ping"));
    }
}
