//! The per-connection actor: admits one `WebSocket`, drives it through the
//! `unauthenticated -> authenticated -> subscribed -> closed` state machine
//! of spec §4.1, and dispatches every [`ClientMessage`] it reads to the
//! router, store, and RPC broker.
//!
//! Mirrors the shape of `happy-sync`'s own transport loop (send/receive
//! split, one task pumping inbound frames, the socket owned by a single
//! future for its whole lifetime) but from the server's side of the same
//! wire protocol.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use happy_core::protocol::{ClientMessage, RpcErrorReason, Scope, ServerMessage, UpdateEnvelope};
use happy_core::types::{ConnectionId, Timestamp};
use happy_storage::KvStore;
use tracing::{debug, info, warn};

use crate::rpc::RpcOutcome;
use crate::server::RelayContext;

/// How long a freshly opened socket has to send `auth` before it's dropped.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Upgrades an inbound HTTP request to a `WebSocket` and hands it to
/// [`handle_socket`]. Mounted at `/ws` by [`crate::server::app`].
pub async fn ws_handler<S>(
    State(context): State<Arc<RelayContext<S>>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse
where
    S: KvStore + Send + Sync + 'static,
{
    ws.on_upgrade(move |socket| handle_socket(socket, context))
}

async fn handle_socket<S>(socket: WebSocket, context: Arc<RelayContext<S>>)
where
    S: KvStore + Send + Sync + 'static,
{
    let (mut writer, mut reader) = socket.split();

    let Some((connection_id, account_id, initial_scope)) =
        authenticate(&context, &mut writer, &mut reader).await
    else {
        return;
    };
    info!(%connection_id, %account_id, "relay connection authenticated");

    let mut outbound_rx = context.router.admit(connection_id, account_id).await;
    handle_subscribe(&context, connection_id, account_id, initial_scope, None).await;

    // Pump the router's outbound channel onto the socket on its own task so
    // a slow reader never blocks fan-out into other connections' queues.
    let pump_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let Ok(json) = serde_json::to_string(&message) else { continue };
            if writer.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = writer.send(Message::Close(None)).await;
    });

    loop {
        match reader.next().await {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => dispatch(&context, connection_id, account_id, message).await,
                    Err(e) => warn!(%connection_id, error = %e, "malformed client message"),
                }
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(%connection_id, error = %e, "relay connection read error");
                break;
            }
        }
    }

    context.router.remove(connection_id).await;
    context.rpc.deregister_connection(connection_id).await;
    pump_task.abort();
    debug!(%connection_id, "relay connection closed");
}

async fn authenticate<S>(
    context: &Arc<RelayContext<S>>,
    writer: &mut futures::stream::SplitSink<WebSocket, Message>,
    reader: &mut futures::stream::SplitStream<WebSocket>,
) -> Option<(ConnectionId, happy_core::types::AccountId, Scope)>
where
    S: KvStore + Send + Sync + 'static,
{
    let first = tokio::time::timeout(AUTH_TIMEOUT, reader.next()).await;
    let Ok(Some(Ok(Message::Text(text)))) = first else {
        return None;
    };
    let Ok(ClientMessage::Auth { token, connection_kind }) =
        serde_json::from_str::<ClientMessage>(&text)
    else {
        return None;
    };

    let Some(account_id) = context.authenticator.authenticate(&token).await else {
        let _ = writer.send(Message::Close(None)).await;
        return None;
    };

    let connection_id = ConnectionId::new();
    let initial_scope = connection_kind.initial_scope(account_id);

    let ack = ServerMessage::AuthOk { connection_id, account_id, server_time: Timestamp::now() };
    if let Ok(json) = serde_json::to_string(&ack) {
        let _ = writer.send(Message::Text(json.into())).await;
    }

    Some((connection_id, account_id, initial_scope))
}

async fn dispatch<S>(
    context: &Arc<RelayContext<S>>,
    connection_id: ConnectionId,
    account_id: happy_core::types::AccountId,
    message: ClientMessage,
) where
    S: KvStore + Send + Sync + 'static,
{
    match message {
        ClientMessage::Auth { .. } => {
            warn!(%connection_id, "duplicate auth on an already-authenticated connection");
        }
        ClientMessage::Subscribe { scope, since_seq } => {
            handle_subscribe(context, connection_id, account_id, scope, since_seq).await;
        }
        ClientMessage::Update(envelope) => {
            handle_publish(context, connection_id, account_id, envelope).await;
        }
        ClientMessage::Ephemeral { scope, kind, ts, payload } => {
            if !crate::router::Router::owns(account_id, &scope) {
                return;
            }
            let message = ServerMessage::Ephemeral { scope: scope.clone(), kind, ts, payload };
            let outcomes = context.router.fan_out(&scope, &message, Some(connection_id)).await;
            evict_overflowing(context, outcomes).await;
        }
        ClientMessage::RpcCall { call_id, target_scope, method, timeout_ms, request } => {
            handle_rpc_call(context, connection_id, target_scope, method, timeout_ms, request, call_id)
                .await;
        }
        ClientMessage::RpcResponse { call_id, ok, response, error_body } => {
            let outcome = if ok {
                RpcOutcome::Success { response: response.unwrap_or_else(|| happy_core::protocol::Ciphertext::new(Vec::new())) }
            } else {
                RpcOutcome::Failure { error_body: error_body.unwrap_or_else(|| happy_core::protocol::Ciphertext::new(Vec::new())) }
            };
            context.rpc.resolve_call(call_id, outcome).await;
        }
        ClientMessage::RpcHandle { method } => {
            // A connection may only serve methods on scopes it has actually
            // subscribed to; callers register per subscribed scope, so we
            // fan the registration across every scope this account owns
            // that the connection is currently subscribed to.
            for scope in context.router.scopes_of(connection_id).await {
                context.rpc.register(scope, method.clone(), connection_id).await;
            }
        }
        ClientMessage::Heartbeat { .. } => {
            context.router.send_to(connection_id, ServerMessage::Heartbeat { ts: Timestamp::now() }).await;
        }
    }
}

/// Disconnects every subscriber [`Router::fan_out`] reported as backed up
/// (spec §5 "Backpressure": a slow subscriber is dropped rather than
/// allowed to stall the publisher).
async fn evict_overflowing<S>(
    context: &Arc<RelayContext<S>>,
    outcomes: Vec<(ConnectionId, crate::router::SendOutcome)>,
) where
    S: KvStore + Send + Sync + 'static,
{
    for (connection_id, outcome) in outcomes {
        if outcome == crate::router::SendOutcome::QueueFull {
            warn!(%connection_id, "evicting subscriber after outbound queue overflow");
            context.router.remove(connection_id).await;
            context.rpc.deregister_connection(connection_id).await;
        }
    }
}

async fn handle_subscribe<S>(
    context: &Arc<RelayContext<S>>,
    connection_id: ConnectionId,
    account_id: happy_core::types::AccountId,
    scope: Scope,
    since_seq: Option<u64>,
) where
    S: KvStore + Send + Sync + 'static,
{
    if !crate::router::Router::owns(account_id, &scope) {
        warn!(%connection_id, %scope, "subscribe refused: not owned by account");
        return;
    }
    context.router.subscribe(connection_id, scope.clone()).await;

    match context.store.replay_since(account_id, &scope, since_seq.unwrap_or(0)).await {
        Ok(updates) => {
            for stored in updates {
                let envelope = UpdateEnvelope {
                    entity: stored.entity,
                    expected_version: None,
                    version: stored.version,
                    seq: Some(stored.seq),
                    producer: stored.producer,
                    local_id: stored.local_id,
                    body: stored.body,
                };
                context.router.send_to(connection_id, ServerMessage::Update(envelope)).await;
            }
        }
        Err(crate::error::SubscribeError::ResyncRequired { min_seq }) => {
            context
                .router
                .send_to(connection_id, ServerMessage::ResyncRequired { scope, min_seq })
                .await;
        }
        Err(e) => warn!(%connection_id, error = %e, "replay failed"),
    }
}

async fn handle_publish<S>(
    context: &Arc<RelayContext<S>>,
    connection_id: ConnectionId,
    account_id: happy_core::types::AccountId,
    envelope: UpdateEnvelope,
) where
    S: KvStore + Send + Sync + 'static,
{
    let local_id = envelope.local_id;
    let expected_version = envelope.expected_version.unwrap_or(0);

    match context
        .store
        .publish(account_id, envelope.entity.clone(), expected_version, envelope.body, local_id, Some(connection_id))
        .await
    {
        Ok((outcome, stored)) => {
            context
                .router
                .send_to(
                    connection_id,
                    ServerMessage::UpdateAck { local_id, seq: outcome.seq, new_version: outcome.new_version },
                )
                .await;

            let scope = stored.entity.scope(account_id);
            let fanout = UpdateEnvelope {
                entity: stored.entity,
                expected_version: None,
                version: stored.version,
                seq: Some(stored.seq),
                producer: stored.producer,
                local_id: stored.local_id,
                body: stored.body,
            };
            let outcomes =
                context.router.fan_out(&scope, &ServerMessage::Update(fanout), Some(connection_id)).await;
            evict_overflowing(context, outcomes).await;
        }
        Err(e) => {
            let reason = e.reject_reason();
            let (current_version, current_body) = match &e {
                crate::error::PublishError::VersionMismatch { current, current_body, .. } => {
                    (Some(*current), Some(happy_core::protocol::Ciphertext::new(current_body.clone())))
                }
                _ => (None, None),
            };
            context
                .router
                .send_to(connection_id, ServerMessage::UpdateReject { local_id, reason, current_version, current_body })
                .await;
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_rpc_call<S>(
    context: &Arc<RelayContext<S>>,
    caller: ConnectionId,
    target_scope: Scope,
    method: String,
    timeout_ms: u64,
    request: happy_core::protocol::Ciphertext,
    call_id: uuid::Uuid,
) where
    S: KvStore + Send + Sync + 'static,
{
    let handler = match context.rpc.resolve_handler(&target_scope, &method).await {
        Ok(handler) => handler,
        Err(e) => {
            context
                .router
                .send_to(caller, ServerMessage::RpcError { call_id, reason: RpcErrorReason::from(&e) })
                .await;
            return;
        }
    };

    let rx = context.rpc.begin_call(call_id).await;
    let delivered = context
        .router
        .send_to(handler, ServerMessage::RpcCall { call_id, target_scope, method, request })
        .await;
    if delivered != crate::router::SendOutcome::Delivered {
        context.rpc.fail_call(call_id).await;
        context
            .router
            .send_to(caller, ServerMessage::RpcError { call_id, reason: RpcErrorReason::Transport })
            .await;
        return;
    }

    let timeout = Duration::from_millis(timeout_ms);
    match crate::rpc::RpcBroker::await_response(rx, timeout).await {
        Ok(RpcOutcome::Success { response }) => {
            context
                .router
                .send_to(caller, ServerMessage::RpcResponse { call_id, ok: true, response: Some(response), error_body: None })
                .await;
        }
        Ok(RpcOutcome::Failure { error_body }) => {
            context
                .router
                .send_to(caller, ServerMessage::RpcResponse { call_id, ok: false, response: None, error_body: Some(error_body) })
                .await;
        }
        Err(e) => {
            context
                .router
                .send_to(caller, ServerMessage::RpcError { call_id, reason: RpcErrorReason::from(&e) })
                .await;
        }
    }
}
