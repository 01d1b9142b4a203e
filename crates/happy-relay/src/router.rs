//! The account-keyed routing table: which connections are subscribed to
//! which scopes, and the fan-out primitive that delivers a [`ServerMessage`]
//! to every subscriber of a scope except the publisher itself (self-echo
//! suppression, spec §8 invariant 4).
//!
//! Held behind a `tokio::sync::RwLock` per spec's ambient-stack note: the
//! lock is only ever held across map lookups, never across a send — sends
//! go out over each connection's own bounded `mpsc` channel after the lock
//! is released.

use std::collections::{HashMap, HashSet};

use happy_core::protocol::{Scope, ServerMessage};
use happy_core::types::{AccountId, ConnectionId};
use tokio::sync::{RwLock, mpsc};
use tracing::warn;

/// Bound on a connection's outbound queue. A subscriber that falls this far
/// behind is disconnected rather than allowed to apply unbounded
/// backpressure to the publisher (spec §5 "Backpressure").
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// A handle the router holds for one admitted connection: where to send
/// outbound messages, and which account it authenticated as.
struct ConnectionEntry {
    account_id: AccountId,
    sender: mpsc::Sender<ServerMessage>,
}

/// The live connection and subscription state for every account the Relay
/// Core is currently serving.
#[derive(Default)]
pub struct Router {
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
    /// scope -> set of subscribed connections.
    subscriptions: RwLock<HashMap<Scope, HashSet<ConnectionId>>>,
}

/// Why a send to a subscriber failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message was enqueued.
    Delivered,
    /// The connection's outbound queue is full; it should be disconnected.
    QueueFull,
    /// The connection is no longer registered.
    Gone,
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a connection, returning the bounded receiver the transport
    /// layer should pump outbound messages from.
    pub async fn admit(
        &self,
        connection_id: ConnectionId,
        account_id: AccountId,
    ) -> mpsc::Receiver<ServerMessage> {
        let (sender, receiver) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        self.connections.write().await.insert(connection_id, ConnectionEntry { account_id, sender });
        receiver
    }

    /// Removes a connection and every subscription it held.
    pub async fn remove(&self, connection_id: ConnectionId) {
        self.connections.write().await.remove(&connection_id);
        let mut subs = self.subscriptions.write().await;
        subs.retain(|_, members| {
            members.remove(&connection_id);
            !members.is_empty()
        });
    }

    /// Subscribes a connection to `scope`, returning `false` if the
    /// connection isn't currently registered (a caller bug, not a client
    /// error — admission always precedes subscription).
    pub async fn subscribe(&self, connection_id: ConnectionId, scope: Scope) -> bool {
        if !self.connections.read().await.contains_key(&connection_id) {
            return false;
        }
        self.subscriptions.write().await.entry(scope).or_default().insert(connection_id);
        true
    }

    /// Returns the account a connection authenticated as, if it's still
    /// registered.
    pub async fn account_of(&self, connection_id: ConnectionId) -> Option<AccountId> {
        self.connections.read().await.get(&connection_id).map(|entry| entry.account_id)
    }

    /// Returns `true` if `account_id` is allowed to subscribe to `scope`.
    ///
    /// The account scope must match exactly. A session or machine scope is
    /// always allowed: this crate's [`crate::store::UpdateStore`] already
    /// partitions every log entry by the publishing account, so a
    /// connection can never read or fan into another account's session or
    /// machine data regardless of which literal id it names here — it would
    /// just find nothing published under its own account log. Authoritative
    /// session/machine-to-account assignment (did this account actually
    /// create this session?) lives in the system that issues `SessionId`s
    /// and `MachineId`s, not in the relay.
    #[must_use]
    pub fn owns(account_id: AccountId, scope: &Scope) -> bool {
        match scope {
            Scope::Account { id } => *id == account_id,
            Scope::Machine { .. } | Scope::Session { .. } => true,
        }
    }

    /// Delivers `message` to every connection subscribed to `scope`, except
    /// `exclude` (the publisher, for self-echo suppression). Connections
    /// whose queue is full are reported back to the caller so they can be
    /// disconnected; this function does not remove them itself to avoid
    /// mutating the subscription map while iterating it under a read lock.
    pub async fn fan_out(
        &self,
        scope: &Scope,
        message: &ServerMessage,
        exclude: Option<ConnectionId>,
    ) -> Vec<(ConnectionId, SendOutcome)> {
        let members = {
            let subs = self.subscriptions.read().await;
            subs.get(scope).cloned().unwrap_or_default()
        };
        let connections = self.connections.read().await;

        let mut outcomes = Vec::new();
        for connection_id in members {
            if Some(connection_id) == exclude {
                continue;
            }
            let Some(entry) = connections.get(&connection_id) else {
                outcomes.push((connection_id, SendOutcome::Gone));
                continue;
            };
            match entry.sender.try_send(message.clone()) {
                Ok(()) => outcomes.push((connection_id, SendOutcome::Delivered)),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%connection_id, "outbound queue full, flagging subscriber for eviction");
                    outcomes.push((connection_id, SendOutcome::QueueFull));
                }
                Err(mpsc::error::TrySendError::Closed(_)) => outcomes.push((connection_id, SendOutcome::Gone)),
            }
        }
        outcomes
    }

    /// Sends `message` directly to one connection (used for acks, rejects,
    /// and RPC responses, which never fan out).
    pub async fn send_to(&self, connection_id: ConnectionId, message: ServerMessage) -> SendOutcome {
        let connections = self.connections.read().await;
        let Some(entry) = connections.get(&connection_id) else {
            return SendOutcome::Gone;
        };
        match entry.sender.try_send(message) {
            Ok(()) => SendOutcome::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => SendOutcome::QueueFull,
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::Gone,
        }
    }

    /// How many connections are subscribed to `scope` right now.
    pub async fn subscriber_count(&self, scope: &Scope) -> usize {
        self.subscriptions.read().await.get(scope).map_or(0, HashSet::len)
    }

    /// Every scope `connection_id` currently holds a subscription to, used
    /// to fan an `rpcHandle` registration across all of them (a connection
    /// may serve a method on any scope it's subscribed to, not just the one
    /// it authenticated under).
    pub async fn scopes_of(&self, connection_id: ConnectionId) -> Vec<Scope> {
        self.subscriptions
            .read()
            .await
            .iter()
            .filter(|(_, members)| members.contains(&connection_id))
            .map(|(scope, _)| scope.clone())
            .collect()
    }
}
