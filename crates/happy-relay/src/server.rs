//! Wires the durable store, router, RPC broker, and authenticator into one
//! [`RelayContext`] and exposes it as an `axum` application.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use happy_storage::KvStore;

use crate::auth::Authenticator;
use crate::connection::ws_handler;
use crate::router::Router;
use crate::rpc::RpcBroker;
use crate::store::UpdateStore;

/// Every shared piece of Relay Core state, handed to each connection's
/// handler task via `axum`'s `State` extractor.
pub struct RelayContext<S> {
    pub(crate) router: Router,
    pub(crate) rpc: RpcBroker,
    pub(crate) store: UpdateStore<S>,
    pub(crate) authenticator: Arc<dyn Authenticator>,
    /// How often the server expects a `heartbeat` before it considers a
    /// connection's transport unresponsive. Enforcement lives with the
    /// hosting process's idle-reaper, not inline in the per-message
    /// dispatch loop; this field documents the contract new transports
    /// must honor.
    pub heartbeat_interval: Duration,
}

impl<S: KvStore> RelayContext<S> {
    /// Builds a context over an already-open [`UpdateStore`] and
    /// [`Authenticator`], with fresh (empty) routing and RPC state.
    #[must_use]
    pub fn new(store: UpdateStore<S>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            router: Router::new(),
            rpc: RpcBroker::new(),
            store,
            authenticator,
            heartbeat_interval: Duration::from_secs(15),
        }
    }

    /// Overrides the documented heartbeat interval (default 15s).
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

/// Builds the `axum` router serving the Relay Core's single `/ws` endpoint.
///
/// Callers own binding a listener and calling `axum::serve`; this crate
/// only describes the routes and connection handling, not the process
/// lifecycle around it.
pub fn app<S>(context: Arc<RelayContext<S>>) -> axum::Router
where
    S: KvStore + Send + Sync + 'static,
{
    axum::Router::new().route("/ws", get(ws_handler::<S>)).with_state(context)
}

#[cfg(test)]
mod tests {
    use happy_core::types::AccountId;
    use happy_storage::MemoryKvStore;

    use super::*;
    use crate::auth::StaticAuthenticator;

    #[test]
    fn app_builds_without_panicking() {
        let store = UpdateStore::with_defaults(MemoryKvStore::new());
        let authenticator: Arc<dyn Authenticator> =
            Arc::new(StaticAuthenticator::new().with_token("tok", AccountId::new()));
        let context = Arc::new(RelayContext::new(store, authenticator));
        let _router = app(context);
    }
}
