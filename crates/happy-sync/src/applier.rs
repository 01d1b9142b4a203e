//! Applies inbound [`ServerMessage::Update`] and `Ephemeral` frames to the
//! local cache and subscription registry (spec §4.2's update-processing
//! pipeline: "validate monotonicity, decrypt, patch the cache, advance
//! `lastSeq`, notify observers").
//!
//! Self-echo suppression (§6): an update whose `producer` is this
//! connection's own id is still committed to the cache and its cursor still
//! advances, but it is not re-delivered to local observers — the caller
//! already applied it optimistically when it made the mutation and has
//! nothing new to learn from seeing it come back.

use happy_core::protocol::{EntityRef, Scope, UpdateEnvelope};
use happy_core::types::{AccountId, ConnectionId};
use happy_crypto::EnvelopeKey;

use crate::cache::EntityCache;
use crate::subscription::{SubscriptionRegistry, SyncEvent};

/// Outcome of applying one inbound update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Committed to the cache and delivered to observers.
    Applied,
    /// Committed to the cache but not redelivered; this connection
    /// authored the update.
    SelfEcho,
    /// `seq` did not immediately follow the subscription's cursor. The
    /// update was NOT committed; the caller must request a resubscribe (or
    /// treat a [`crate::error::SyncError`]-worthy gap as fatal) before any
    /// further updates on this scope can be trusted.
    Gap {
        /// The `seq` the applier expected next.
        expected: u64,
        /// The `seq` actually received.
        got: u64,
    },
    /// The entity's account did not match the scope passed in (defensive;
    /// should never happen given the relay's own routing).
    ScopeMismatch,
    /// The envelope failed to decrypt under this connection's key (stale
    /// key epoch, corrupt payload, or a relay bug). The update was NOT
    /// committed and the cursor did NOT advance; the caller must treat
    /// this scope as needing a fresh resync before trusting anything
    /// further on it.
    DecryptFailed,
}

/// Stateless logic wiring one connection's envelope key and identity into
/// the shared cache and subscription registry.
pub struct Applier<'a> {
    key: &'a EnvelopeKey,
    connection_id: ConnectionId,
}

impl<'a> Applier<'a> {
    /// Creates an applier bound to this connection's envelope key and id.
    #[must_use]
    pub fn new(key: &'a EnvelopeKey, connection_id: ConnectionId) -> Self {
        Self { key, connection_id }
    }

    /// Applies one inbound [`UpdateEnvelope`] against `scope`.
    ///
    /// `scope` is the subscription this update arrived under (the relay
    /// only ever delivers an update to connections subscribed to its
    /// entity's scope, so the caller already knows which subscription's
    /// cursor to check).
    pub fn apply_update(
        &self,
        cache: &EntityCache,
        subscriptions: &mut SubscriptionRegistry,
        account_id: AccountId,
        scope: &Scope,
        envelope: UpdateEnvelope,
    ) -> UpdateOutcome {
        if &envelope.entity.scope(account_id) != scope {
            return UpdateOutcome::ScopeMismatch;
        }

        let seq = envelope.seq.unwrap_or(envelope.version);
        let expected = subscriptions.last_seq(scope).saturating_add(1);
        if subscriptions.last_seq(scope) != 0 && seq != expected {
            return UpdateOutcome::Gap { expected, got: seq };
        }

        let is_self_echo = envelope.producer == Some(self.connection_id);
        let Ok(body) = self.key.open(envelope.body.as_bytes()) else {
            return UpdateOutcome::DecryptFailed;
        };
        cache.commit(&envelope.entity, envelope.version, body);
        subscriptions.advance(scope, seq);

        if is_self_echo {
            return UpdateOutcome::SelfEcho;
        }

        subscriptions.notify(
            scope,
            SyncEvent::EntityUpdated { entity: envelope.entity, version: envelope.version },
        );
        UpdateOutcome::Applied
    }

    /// Applies an inbound best-effort ephemeral event: attempts to open the
    /// payload (a decryption failure just yields `None`, since a stale key
    /// epoch is not a protocol error) and fans it out to observers.
    pub fn apply_ephemeral(
        &self,
        subscriptions: &SubscriptionRegistry,
        scope: Scope,
        kind: String,
        ts: happy_core::types::Timestamp,
        payload: Option<happy_core::protocol::Ciphertext>,
    ) {
        let opened = payload.and_then(|ct| self.key.open(ct.as_bytes()).ok());
        subscriptions.notify(&scope, SyncEvent::Ephemeral { kind, ts, payload: opened });
    }

    /// Applies a `resync-required` notice: evicts every cached entity whose
    /// scope matches (the caller is expected to refetch a fresh snapshot and
    /// re-seed the cache), resets the cursor to `min_seq`, and notifies
    /// observers so the UI can show a resync-in-progress state.
    pub fn apply_resync_required(
        &self,
        cache: &EntityCache,
        subscriptions: &mut SubscriptionRegistry,
        scope: Scope,
        min_seq: u64,
        entities: impl IntoIterator<Item = EntityRef>,
    ) {
        for entity in entities {
            cache.evict(&entity);
        }
        subscriptions.reset_cursor(&scope, min_seq);
        subscriptions.notify(&scope, SyncEvent::ResyncRequired { min_seq });
    }
}

#[cfg(test)]
mod tests {
    use happy_core::protocol::Ciphertext;
    use happy_core::types::AccountId;

    use super::*;

    fn key() -> EnvelopeKey {
        EnvelopeKey::from_bytes([7u8; 32])
    }

    fn scope(account_id: AccountId) -> Scope {
        Scope::Account { id: account_id }
    }

    fn envelope(account_id: AccountId, key: &EnvelopeKey, version: u64, seq: u64, producer: Option<ConnectionId>) -> UpdateEnvelope {
        let sealed = key.seal(b"patch").expect("seal");
        UpdateEnvelope {
            entity: EntityRef::Account { id: account_id },
            expected_version: None,
            version,
            seq: Some(seq),
            producer,
            local_id: happy_core::protocol::LocalId::generate(),
            body: Ciphertext::new(sealed),
        }
    }

    #[test]
    fn first_update_on_a_scope_applies_regardless_of_seq() {
        let cache = EntityCache::new();
        let mut subscriptions = SubscriptionRegistry::new();
        let account_id = AccountId::new();
        let scope = scope(account_id);
        let _rx = subscriptions.subscribe(scope.clone());
        let key = key();
        let applier = Applier::new(&key, ConnectionId::new());

        let outcome = applier.apply_update(&cache, &mut subscriptions, account_id, &scope, envelope(account_id, &key, 1, 5, None));
        assert_eq!(outcome, UpdateOutcome::Applied);
        assert_eq!(subscriptions.last_seq(&scope), 5);
    }

    #[test]
    fn a_seq_gap_is_detected_and_not_committed() {
        let cache = EntityCache::new();
        let mut subscriptions = SubscriptionRegistry::new();
        let account_id = AccountId::new();
        let scope = scope(account_id);
        let _rx = subscriptions.subscribe(scope.clone());
        let key = key();
        let applier = Applier::new(&key, ConnectionId::new());

        applier.apply_update(&cache, &mut subscriptions, account_id, &scope, envelope(account_id, &key, 1, 1, None));
        let outcome = applier.apply_update(&cache, &mut subscriptions, account_id, &scope, envelope(account_id, &key, 2, 9, None));
        assert_eq!(outcome, UpdateOutcome::Gap { expected: 2, got: 9 });
        assert_eq!(subscriptions.last_seq(&scope), 1);
    }

    #[test]
    fn an_envelope_that_fails_to_decrypt_is_surfaced_and_not_committed() {
        let cache = EntityCache::new();
        let mut subscriptions = SubscriptionRegistry::new();
        let account_id = AccountId::new();
        let scope = scope(account_id);
        let _rx = subscriptions.subscribe(scope.clone());
        let key = key();
        let wrong_key = EnvelopeKey::from_bytes([9u8; 32]);
        let applier = Applier::new(&wrong_key, ConnectionId::new());

        let outcome = applier.apply_update(&cache, &mut subscriptions, account_id, &scope, envelope(account_id, &key, 1, 1, None));
        assert_eq!(outcome, UpdateOutcome::DecryptFailed);
        assert_eq!(subscriptions.last_seq(&scope), 0);
        assert!(cache.get(&EntityRef::Account { id: account_id }).is_none());
    }

    #[test]
    fn an_update_this_connection_produced_is_suppressed_but_still_committed() {
        let cache = EntityCache::new();
        let mut subscriptions = SubscriptionRegistry::new();
        let account_id = AccountId::new();
        let scope = scope(account_id);
        let mut rx = subscriptions.subscribe(scope.clone());
        let key = key();
        let own_id = ConnectionId::new();
        let applier = Applier::new(&key, own_id);

        let outcome = applier.apply_update(&cache, &mut subscriptions, account_id, &scope, envelope(account_id, &key, 1, 1, Some(own_id)));
        assert_eq!(outcome, UpdateOutcome::SelfEcho);
        assert_eq!(subscriptions.last_seq(&scope), 1);
        assert!(rx.try_recv().is_err());
    }
}
