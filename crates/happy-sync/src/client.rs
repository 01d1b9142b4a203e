//! The Sync Client proper: a single multiplexed connection to the Relay
//! Core, presenting a local view of entities that converges to the
//! server's, plus `invoke`/`register` RPC surfaces (spec §4.2).
//!
//! The public [`SyncClient`] is a thin, cloneable handle; all state lives
//! behind `Arc`s shared with a background task (spawned by
//! [`SyncClient::connect`]) that owns the transport, runs the reconnect
//! loop, and dispatches inbound server messages. Application calls never
//! touch the socket directly — they go through bounded channels into the
//! background task, the same separation this codebase's gateway keeps
//! between its public handle and its connection-owning task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use happy_core::protocol::{
    Ciphertext, ClientMessage, ConnectionKind, EntityRef, RpcErrorReason, Scope, ServerMessage,
    UpdateEnvelope, UpdateRejectReason,
};
use happy_core::types::{AccountId, ConnectionId};
use happy_crypto::EnvelopeKey;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::applier::Applier;
use crate::backoff::Backoff;
use crate::cache::EntityCache;
use crate::cursor::CursorStore;
use crate::error::{SyncError, SyncResult};
use crate::outbox::Outbox;
use crate::rpc::{HandlerFn, HandlerRegistry, RpcOutcome, RpcTable};
use crate::subscription::{SubscriptionRegistry, SyncEvent};

/// Upper bound on rebase-and-retry attempts for a single [`SyncClient::mutate`]
/// call before the conflict is escalated to the caller (spec §9: "bounded
/// retry count; exhaustion escalates as a non-recoverable error").
const MAX_MUTATE_ATTEMPTS: u32 = 5;

/// Observable connection lifecycle state, exposed so a hosting process
/// (e.g. the CLI daemon's status RPC) can report "connected" /
/// "reconnecting" without reaching into transport internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial or post-drop connect attempt in flight.
    Connecting,
    /// Authenticated and serving traffic.
    Connected,
    /// Transport dropped; backoff is running before the next attempt.
    Reconnecting,
    /// [`SyncClient::shutdown`] was called; the background task has exited.
    Closed,
}

/// The outcome of one resolved `mutate` attempt, passed from the background
/// task back to the waiting caller.
enum MutateResolution {
    Accepted { seq: u64, new_version: u64 },
    Rejected { reason: UpdateRejectReason, current_version: Option<u64>, current_body: Option<Ciphertext> },
}

/// Configuration for [`SyncClient::connect`].
pub struct SyncClientConfig {
    /// Relay WebSocket URL (`wss://relay.example/ws`).
    pub url: String,
    /// Bearer credential presented on auth.
    pub token: String,
    /// Connection kind, determining the auto-subscribed scope.
    pub connection_kind: ConnectionKind,
    /// The account's envelope key, for sealing/opening update and ephemeral
    /// bodies.
    pub envelope_key: EnvelopeKey,
    /// Where to durably cache per-scope resume cursors across restarts.
    /// `None` disables persistence (every connect starts from a fresh
    /// snapshot).
    pub cursor_path: Option<std::path::PathBuf>,
}

struct Shared {
    cache: EntityCache,
    subscriptions: Mutex<SubscriptionRegistry>,
    rpc_table: Mutex<RpcTable>,
    handlers: Mutex<HandlerRegistry>,
    outbox: Mutex<Outbox>,
    mutate_waiters: Mutex<HashMap<happy_core::protocol::LocalId, oneshot::Sender<MutateResolution>>>,
    envelope_key: EnvelopeKey,
    account_id: RwLock<Option<AccountId>>,
    connection_id: RwLock<Option<ConnectionId>>,
    state_tx: watch::Sender<ConnectionState>,
    outbound_tx: mpsc::UnboundedSender<ClientMessage>,
    cancellation: CancellationToken,
}

/// A handle to a live (or reconnecting) Sync Client connection.
///
/// Cloning shares the same underlying connection and caches; there is
/// exactly one background task per connected client regardless of how many
/// handles exist.
#[derive(Clone)]
pub struct SyncClient {
    shared: Arc<Shared>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl SyncClient {
    /// Spawns the background connection task and returns a handle
    /// immediately; the actual relay handshake happens asynchronously.
    /// Callers that need to know when the client first becomes usable
    /// should await [`SyncClient::wait_connected`].
    #[must_use]
    pub fn connect(config: SyncClientConfig) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let cursor_store = config.cursor_path.map(CursorStore::new);
        let mut subscriptions = SubscriptionRegistry::new();
        if let Some(store) = &cursor_store
            && let Ok(cursors) = store.load()
        {
            for (scope, seq) in cursors {
                subscriptions.subscribe(scope.clone());
                subscriptions.advance(&scope, seq);
            }
        }

        let shared = Arc::new(Shared {
            cache: EntityCache::new(),
            subscriptions: Mutex::new(subscriptions),
            rpc_table: Mutex::new(RpcTable::new()),
            handlers: Mutex::new(HandlerRegistry::new()),
            outbox: Mutex::new(Outbox::default()),
            mutate_waiters: Mutex::new(HashMap::new()),
            envelope_key: config.envelope_key,
            account_id: RwLock::new(None),
            connection_id: RwLock::new(None),
            state_tx,
            outbound_tx,
            cancellation: CancellationToken::new(),
        });

        let task_shared = Arc::clone(&shared);
        tokio::spawn(run_loop(
            config.url,
            config.token,
            config.connection_kind,
            task_shared,
            outbound_rx,
            cursor_store,
        ));

        Self { shared, state_rx }
    }

    /// The current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Resolves once the client reaches [`ConnectionState::Connected`], or
    /// immediately if already connected.
    pub async fn wait_connected(&self) {
        let mut rx = self.state_rx.clone();
        while *rx.borrow() != ConnectionState::Connected {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Subscribes to `scope`, returning a receiver of [`SyncEvent`]s for it.
    /// Idempotent: calling this again for an already-subscribed scope
    /// returns a fresh receiver on the existing channel.
    pub async fn subscribe(&self, scope: Scope) -> broadcast::Receiver<SyncEvent> {
        let (since_seq, rx) = {
            let mut subscriptions = self.shared.subscriptions.lock().await;
            let rx = subscriptions.subscribe(scope.clone());
            let since = subscriptions.last_seq(&scope);
            (since, rx)
        };
        let since_seq = if since_seq == 0 { None } else { Some(since_seq) };
        let _ = self.shared.outbound_tx.send(ClientMessage::Subscribe { scope, since_seq });
        rx
    }

    /// Reads the current cached state of `entity`, if observed.
    #[must_use]
    pub fn peek(&self, entity: &EntityRef) -> Option<Vec<u8>> {
        self.shared.cache.get(entity).map(|cached| cached.body)
    }

    /// Proposes a mutation on `entity`. `patch` receives the current
    /// plaintext body (`None` if never observed) and returns the new
    /// plaintext body.
    ///
    /// Implements the publish protocol of spec §4.2: optimistic local
    /// apply, `publishUpdate` with `expectedVersion`, and on
    /// `version-mismatch`, adopt the server body, reapply `patch`, and
    /// retry — bounded at [`MAX_MUTATE_ATTEMPTS`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StateConflict`] if every retry attempt is
    /// rejected, or [`SyncError::Closed`] if the client shut down mid-call.
    pub async fn mutate(
        &self,
        entity: EntityRef,
        mut patch: impl FnMut(Option<&[u8]>) -> Vec<u8>,
    ) -> SyncResult<u64> {
        let mut version = self.shared.cache.get(&entity).map_or(0, |c| c.version);
        let mut body = self.shared.cache.get(&entity).map(|c| c.body);

        for attempt in 0..MAX_MUTATE_ATTEMPTS {
            let new_plaintext = patch(body.as_deref());
            let sealed = self.shared.envelope_key.seal(&new_plaintext)?;
            let envelope = UpdateEnvelope::publish(entity.clone(), version, Ciphertext::new(sealed));
            let local_id = envelope.local_id;

            self.shared.cache.apply_optimistic(&entity, envelope.version, new_plaintext);
            self.shared.outbox.lock().await.enqueue(entity.clone(), envelope.clone())?;

            let (tx, rx) = oneshot::channel();
            self.shared.mutate_waiters.lock().await.insert(local_id, tx);
            if self.shared.outbound_tx.send(ClientMessage::Update(envelope)).is_err() {
                self.shared.mutate_waiters.lock().await.remove(&local_id);
                return Err(SyncError::Closed);
            }

            match rx.await {
                Ok(MutateResolution::Accepted { new_version, .. }) => return Ok(new_version),
                Ok(MutateResolution::Rejected { reason: UpdateRejectReason::VersionMismatch, current_version, current_body }) => {
                    version = current_version.unwrap_or(version);
                    body = current_body.and_then(|ct| self.shared.envelope_key.open(ct.as_bytes()).ok());
                    debug!(attempt, %entity, "mutate rebased after version-mismatch");
                }
                Ok(MutateResolution::Rejected { reason, .. }) => {
                    warn!(?reason, %entity, "mutate rejected");
                    return Err(SyncError::StateConflict { attempts: attempt.saturating_add(1), scope: entity.scope(self.account_id().await.unwrap_or_default()) });
                }
                Err(_) => return Err(SyncError::Closed),
            }
        }

        Err(SyncError::StateConflict { attempts: MAX_MUTATE_ATTEMPTS, scope: entity.scope(self.account_id().await.unwrap_or_default()) })
    }

    /// Issues an RPC call and awaits the response.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Timeout`] if `timeout` elapses,
    /// [`SyncError::NoHandler`] if the relay reports no registered primary
    /// handler, or [`SyncError::RpcTransport`] if the handler connection
    /// dropped mid-call.
    pub async fn invoke(&self, target_scope: Scope, method: &str, request: &[u8], timeout: Duration) -> SyncResult<Vec<u8>> {
        let call_id = uuid::Uuid::new_v4();
        let sealed = self.shared.envelope_key.seal(request)?;
        let rx = self.shared.rpc_table.lock().await.begin_call(call_id);

        self.shared
            .outbound_tx
            .send(ClientMessage::RpcCall {
                call_id,
                target_scope,
                method: method.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                request: Ciphertext::new(sealed),
            })
            .map_err(|_| SyncError::Closed)?;

        let outcome = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome?,
            Ok(Err(_)) => return Err(SyncError::Closed),
            Err(_) => {
                self.shared.rpc_table.lock().await.fail(call_id, RpcErrorReason::Timeout);
                return Err(SyncError::Timeout);
            }
        };

        match outcome {
            RpcOutcome::Ok(body) => self.shared.envelope_key.open(body.as_bytes()).map_err(SyncError::from),
            RpcOutcome::Err(body) => {
                let message = self
                    .shared
                    .envelope_key
                    .open(body.as_bytes())
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    .unwrap_or_else(|_| "<undecryptable error body>".to_string());
                Err(SyncError::Transport(message))
            }
        }
    }

    /// Registers this client as the primary handler for `method` on
    /// `scope`. Replaces this client's own prior registration for the same
    /// pair; does not affect other connections (the relay enforces
    /// last-registration-wins globally).
    pub async fn register(&self, scope: Scope, method: &str, handler: HandlerFn) {
        self.shared.handlers.lock().await.insert(scope.clone(), method.to_string(), handler);
        self.shared.rpc_table.lock().await.register_handler(scope.clone(), method.to_string());
        let _ = self.shared.outbound_tx.send(ClientMessage::RpcHandle { method: method.to_string() });
    }

    /// The account this client authenticated as, once known.
    pub async fn account_id(&self) -> Option<AccountId> {
        *self.shared.account_id.read().await
    }

    /// Shuts the client down: cancels the background task and closes the
    /// transport.
    pub fn shutdown(&self) {
        self.shared.cancellation.cancel();
    }
}

#[allow(clippy::too_many_lines)]
async fn run_loop(
    url: String,
    token: String,
    connection_kind: ConnectionKind,
    shared: Arc<Shared>,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientMessage>,
    cursor_store: Option<CursorStore>,
) {
    let mut backoff = Backoff::with_defaults();

    loop {
        if shared.cancellation.is_cancelled() {
            let _ = shared.state_tx.send(ConnectionState::Closed);
            return;
        }

        let _ = shared.state_tx.send(ConnectionState::Connecting);
        let mut conn = match crate::transport::RelayConnection::connect(&url).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "relay connect failed");
                let _ = shared.state_tx.send(ConnectionState::Reconnecting);
                tokio::select! {
                    () = tokio::time::sleep(backoff.next_delay()) => continue,
                    () = shared.cancellation.cancelled() => { let _ = shared.state_tx.send(ConnectionState::Closed); return; }
                }
            }
        };

        if conn
            .send(&ClientMessage::Auth { token: token.clone(), connection_kind: connection_kind.clone() })
            .await
            .is_err()
        {
            continue;
        }

        let authenticated = loop {
            match conn.recv().await {
                Ok(Some(ServerMessage::AuthOk { connection_id, account_id, .. })) => {
                    *shared.account_id.write().await = Some(account_id);
                    *shared.connection_id.write().await = Some(connection_id);
                    break true;
                }
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => break false,
            }
        };
        if !authenticated {
            let _ = shared.state_tx.send(ConnectionState::Reconnecting);
            tokio::select! {
                () = tokio::time::sleep(backoff.next_delay()) => continue,
                () = shared.cancellation.cancelled() => { let _ = shared.state_tx.send(ConnectionState::Closed); return; }
            }
        }
        backoff.reset();
        info!("relay connection established");

        let scopes: Vec<Scope> = shared.subscriptions.lock().await.scopes().cloned().collect();
        for scope in scopes {
            let since = shared.subscriptions.lock().await.last_seq(&scope);
            let since_seq = if since == 0 { None } else { Some(since) };
            if conn.send(&ClientMessage::Subscribe { scope, since_seq }).await.is_err() {
                break;
            }
        }
        let pending: Vec<UpdateEnvelope> = shared.outbox.lock().await.iter().map(|p| p.envelope.clone()).collect();
        for envelope in pending {
            if conn.send(&ClientMessage::Update(envelope)).await.is_err() {
                break;
            }
        }
        let handled_methods: Vec<String> = shared.handlers.lock().await.methods();
        for method in handled_methods {
            if conn.send(&ClientMessage::RpcHandle { method }).await.is_err() {
                break;
            }
        }
        let _ = shared.state_tx.send(ConnectionState::Connected);

        loop {
            tokio::select! {
                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(message) => {
                            if conn.send(&message).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            conn.close().await;
                            let _ = shared.state_tx.send(ConnectionState::Closed);
                            return;
                        }
                    }
                }
                inbound = conn.recv() => {
                    match inbound {
                        Ok(Some(message)) => handle_server_message(&shared, message).await,
                        Ok(None) | Err(_) => break,
                    }
                }
                () = shared.cancellation.cancelled() => {
                    conn.close().await;
                    let _ = shared.state_tx.send(ConnectionState::Closed);
                    return;
                }
            }
        }

        warn!("relay connection dropped; reconnecting");
        shared.rpc_table.lock().await.fail_all_transport();
        if let Some(store) = &cursor_store {
            let cursors: HashMap<Scope, u64> = {
                let subscriptions = shared.subscriptions.lock().await;
                subscriptions.scopes().map(|scope| (scope.clone(), subscriptions.last_seq(scope))).collect()
            };
            if let Err(e) = store.save(&cursors) {
                warn!(error = %e, "failed to persist sync cursors");
            }
        }
        let _ = shared.state_tx.send(ConnectionState::Reconnecting);
        tokio::select! {
            () = tokio::time::sleep(backoff.next_delay()) => {}
            () = shared.cancellation.cancelled() => { let _ = shared.state_tx.send(ConnectionState::Closed); return; }
        }
    }
}

async fn handle_server_message(shared: &Arc<Shared>, message: ServerMessage) {
    let account_id = *shared.account_id.read().await;
    let connection_id = *shared.connection_id.read().await;
    let Some(account_id) = account_id else { return };
    let Some(connection_id) = connection_id else { return };
    let applier = Applier::new(&shared.envelope_key, connection_id);

    match message {
        ServerMessage::AuthOk { .. } => {}
        ServerMessage::Update(envelope) => {
            let scope = envelope.entity.scope(account_id);
            let mut subscriptions = shared.subscriptions.lock().await;
            let outcome = applier.apply_update(&shared.cache, &mut subscriptions, account_id, &scope, envelope);
            match outcome {
                crate::applier::UpdateOutcome::Gap { expected, got } => {
                    warn!(expected, got, %scope, "sequence gap detected; requesting resubscribe");
                    subscriptions.notify(&scope, SyncEvent::ResyncRequired { min_seq: expected });
                }
                crate::applier::UpdateOutcome::DecryptFailed => {
                    let min_seq = subscriptions.last_seq(&scope).saturating_add(1);
                    warn!(%scope, "envelope failed to decrypt; requesting resubscribe");
                    subscriptions.notify(&scope, SyncEvent::ResyncRequired { min_seq });
                }
                _ => {}
            }
        }
        ServerMessage::UpdateAck { local_id, seq, new_version } => {
            shared.outbox.lock().await.remove(local_id);
            if let Some(tx) = shared.mutate_waiters.lock().await.remove(&local_id) {
                let _ = tx.send(MutateResolution::Accepted { seq, new_version });
            }
        }
        ServerMessage::UpdateReject { local_id, reason, current_version, current_body } => {
            shared.outbox.lock().await.remove(local_id);
            if let Some(tx) = shared.mutate_waiters.lock().await.remove(&local_id) {
                let _ = tx.send(MutateResolution::Rejected { reason, current_version, current_body });
            }
        }
        ServerMessage::Ephemeral { scope, kind, ts, payload } => {
            applier.apply_ephemeral(&shared.subscriptions.lock().await, scope, kind, ts, payload);
        }
        ServerMessage::RpcCall { call_id, target_scope, method, request } => {
            handle_inbound_rpc_call(shared, call_id, target_scope, method, request).await;
        }
        ServerMessage::RpcResponse { call_id, ok, response, error_body } => {
            let outcome = if ok {
                Ok(RpcOutcome::Ok(response.unwrap_or_else(|| Ciphertext::new(Vec::new()))))
            } else {
                Ok(RpcOutcome::Err(error_body.unwrap_or_else(|| Ciphertext::new(Vec::new()))))
            };
            shared.rpc_table.lock().await.resolve(call_id, outcome);
        }
        ServerMessage::RpcError { call_id, reason } => {
            shared.rpc_table.lock().await.fail(call_id, reason);
        }
        ServerMessage::Heartbeat { ts } => {
            debug!(?ts, "heartbeat");
        }
        ServerMessage::ResyncRequired { scope, min_seq } => {
            let mut subscriptions = shared.subscriptions.lock().await;
            applier.apply_resync_required(&shared.cache, &mut subscriptions, scope.clone(), min_seq, std::iter::empty());
            let _ = shared.outbound_tx.send(ClientMessage::Subscribe { scope, since_seq: None });
        }
    }
}

async fn handle_inbound_rpc_call(shared: &Arc<Shared>, call_id: uuid::Uuid, target_scope: Scope, method: String, request: Ciphertext) {
    let handler = shared.handlers.lock().await.get(&target_scope, &method);
    let Some(handler) = handler else {
        return;
    };
    let opened = match shared.envelope_key.open(request.as_bytes()) {
        Ok(bytes) => bytes,
        Err(_) => return,
    };
    let reply = match handler(opened) {
        Ok(plaintext) => shared.envelope_key.seal(&plaintext).ok().map(|sealed| ClientMessage::RpcResponse {
            call_id,
            ok: true,
            response: Some(Ciphertext::new(sealed)),
            error_body: None,
        }),
        Err(e) => shared.envelope_key.seal(e.to_string().as_bytes()).ok().map(|sealed| ClientMessage::RpcResponse {
            call_id,
            ok: false,
            response: None,
            error_body: Some(Ciphertext::new(sealed)),
        }),
    };
    if let Some(message) = reply {
        let _ = shared.outbound_tx.send(message);
    }
}
