//! The subscription registry: which scopes this client cares about, their
//! resume cursors, and the observers notified when something in-scope
//! changes (spec §4.2 "Subscription registry mapping scope -> set of
//! interested observers").

use std::collections::HashMap;

use happy_core::protocol::{Ciphertext, EntityRef, Scope};
use happy_core::types::Timestamp;
use tokio::sync::broadcast;

/// Default capacity of each scope's observer broadcast channel. Generous
/// enough that a momentarily-slow observer doesn't miss events under
/// ordinary load; an observer that lags past this sees
/// [`broadcast::error::RecvError::Lagged`] and should resubscribe.
pub const OBSERVER_CHANNEL_CAPACITY: usize = 256;

/// An event delivered to scope observers. Persistent updates and ephemeral
/// events share one channel per scope so an observer sees both in the
/// order the applier processed them.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// An entity in this scope was durably updated (inbound from the relay,
    /// or the local commit of an optimistic write this client made).
    EntityUpdated {
        /// The entity that changed.
        entity: EntityRef,
        /// Its version after the change.
        version: u64,
    },
    /// A best-effort, unpersisted signal was fanned out on this scope.
    Ephemeral {
        /// Event discriminator.
        kind: String,
        /// When it was sent.
        ts: Timestamp,
        /// Opaque decrypted payload, if any.
        payload: Option<Vec<u8>>,
    },
    /// This scope's log has a gap the retention horizon can't fill; the
    /// owner must refetch a full snapshot.
    ResyncRequired {
        /// The lowest `seq` still replayable.
        min_seq: u64,
    },
    /// The transport reconnected and this scope's subscription was
    /// resumed (or, if a [`SyncEvent::ResyncRequired`] preceded it,
    /// refreshed from a fresh snapshot).
    Resumed,
}

/// Per-scope subscription state: the resume cursor and the observer
/// broadcast channel.
struct ScopeSubscription {
    last_seq: u64,
    sender: broadcast::Sender<SyncEvent>,
}

/// Tracks every scope this client is subscribed to.
#[derive(Default)]
pub struct SubscriptionRegistry {
    scopes: HashMap<Scope, ScopeSubscription>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `scope`, returning an observer receiver. Calling this
    /// again for an already-registered scope returns a fresh receiver on
    /// the same underlying channel without resetting its cursor.
    pub fn subscribe(&mut self, scope: Scope) -> broadcast::Receiver<SyncEvent> {
        self.scopes
            .entry(scope)
            .or_insert_with(|| ScopeSubscription { last_seq: 0, sender: broadcast::channel(OBSERVER_CHANNEL_CAPACITY).0 })
            .sender
            .subscribe()
    }

    /// Removes a scope entirely (no more resume cursor, no more
    /// observers).
    pub fn unsubscribe(&mut self, scope: &Scope) {
        self.scopes.remove(scope);
    }

    /// The resume cursor (`lastSeq`) to present when re-subscribing this
    /// scope after a reconnect, or `0` if never subscribed.
    #[must_use]
    pub fn last_seq(&self, scope: &Scope) -> u64 {
        self.scopes.get(scope).map_or(0, |s| s.last_seq)
    }

    /// Advances the resume cursor. No-ops if `seq` does not exceed the
    /// current cursor (defensive against out-of-order delivery bugs
    /// upstream; the applier is expected to enforce ordering before this
    /// is called).
    pub fn advance(&mut self, scope: &Scope, seq: u64) {
        if let Some(subscription) = self.scopes.get_mut(scope)
            && seq > subscription.last_seq
        {
            subscription.last_seq = seq;
        }
    }

    /// Resets the resume cursor to `floor`, used after a full resync
    /// snapshot replaces the local state for this scope.
    pub fn reset_cursor(&mut self, scope: &Scope, floor: u64) {
        if let Some(subscription) = self.scopes.get_mut(scope) {
            subscription.last_seq = floor;
        }
    }

    /// Every scope currently subscribed, for reconnect re-subscription.
    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.keys()
    }

    /// Publishes `event` to every observer of `scope`. No-op (not an
    /// error) if nobody is currently observing — ephemeral events in
    /// particular are allowed to have zero listeners.
    pub fn notify(&self, scope: &Scope, event: SyncEvent) {
        if let Some(subscription) = self.scopes.get(scope) {
            let _ = subscription.sender.send(event);
        }
    }
}

/// Decrypts an inbound [`Ciphertext`] body against the account envelope
/// key, mapping a decryption failure to `None` rather than propagating —
/// used by observers that only care about the cleartext envelope fields
/// and treat body decryption failure as "not for me" (wrong key epoch)
/// rather than a fatal error.
#[must_use]
pub fn try_open(key: &happy_crypto::EnvelopeKey, body: &Ciphertext) -> Option<Vec<u8>> {
    key.open(body.as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use happy_core::types::AccountId;

    use super::*;

    fn scope() -> Scope {
        Scope::Account { id: AccountId::new() }
    }

    #[test]
    fn advance_only_moves_forward() {
        let mut registry = SubscriptionRegistry::new();
        let scope = scope();
        let _rx = registry.subscribe(scope.clone());
        registry.advance(&scope, 5);
        registry.advance(&scope, 3);
        assert_eq!(registry.last_seq(&scope), 5);
    }

    #[tokio::test]
    async fn notify_delivers_to_a_subscribed_observer() {
        let mut registry = SubscriptionRegistry::new();
        let scope = scope();
        let mut rx = registry.subscribe(scope.clone());
        registry.notify(&scope, SyncEvent::Resumed);
        assert!(matches!(rx.recv().await.unwrap(), SyncEvent::Resumed));
    }

    #[test]
    fn unsubscribe_drops_the_cursor() {
        let mut registry = SubscriptionRegistry::new();
        let scope = scope();
        let _rx = registry.subscribe(scope.clone());
        registry.advance(&scope, 10);
        registry.unsubscribe(&scope);
        assert_eq!(registry.last_seq(&scope), 0);
    }
}
