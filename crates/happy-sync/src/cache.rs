//! The entity cache: a local view of every entity's `{version, body}` that
//! converges to the Relay Core's view (spec §4.2 "Local data structures").
//!
//! Writes come from exactly one place — the applier task for inbound
//! updates, and [`crate::client::SyncClient::mutate`] for optimistic local
//! writes — so the cache is a plain `DashMap`, not a reader/writer-locked
//! structure; concurrent reads never contend with the single writer path in
//! a way that needs anything heavier.

use dashmap::DashMap;
use happy_core::protocol::EntityRef;

/// One entity's locally known state.
#[derive(Debug, Clone)]
pub struct CachedEntity {
    /// The entity's version, per the last update this client applied or
    /// optimistically proposed.
    pub version: u64,
    /// The entity's plaintext body (already opened from the wire
    /// ciphertext), or the optimistic overlay body if a local mutation is
    /// still in flight.
    pub body: Vec<u8>,
    /// `true` if `body`/`version` reflect an optimistic local write not yet
    /// acknowledged by the relay.
    pub pending: bool,
}

/// A process-local cache of every entity this [`crate::SyncClient`] has
/// observed or mutated.
#[derive(Default)]
pub struct EntityCache {
    entries: DashMap<String, CachedEntity>,
}

impl EntityCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached state for `entity`, if any has been observed.
    #[must_use]
    pub fn get(&self, entity: &EntityRef) -> Option<CachedEntity> {
        self.entries.get(&entity.to_string()).map(|entry| entry.clone())
    }

    /// Commits a durably-accepted state (from an applied inbound update or
    /// a successful publish ack), clearing any optimistic overlay. `body`
    /// is the already-decrypted plaintext — callers open the wire
    /// ciphertext before committing, so every cached entry (optimistic or
    /// durable) is plaintext.
    pub fn commit(&self, entity: &EntityRef, version: u64, body: Vec<u8>) {
        self.entries.insert(entity.to_string(), CachedEntity { version, body, pending: false });
    }

    /// Applies an optimistic local overlay ahead of relay acknowledgment.
    pub fn apply_optimistic(&self, entity: &EntityRef, version: u64, body: Vec<u8>) {
        self.entries.insert(entity.to_string(), CachedEntity { version, body, pending: true });
    }

    /// Removes an entity from the cache entirely (used when a full resync
    /// snapshot supersedes whatever was cached before).
    pub fn evict(&self, entity: &EntityRef) {
        self.entries.remove(&entity.to_string());
    }

    /// How many entities are currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use happy_core::types::AccountId;

    use super::*;

    fn entity() -> EntityRef {
        EntityRef::Account { id: AccountId::new() }
    }

    #[test]
    fn commit_replaces_any_optimistic_overlay() {
        let cache = EntityCache::new();
        let entity = entity();
        cache.apply_optimistic(&entity, 1, b"optimistic".to_vec());
        assert!(cache.get(&entity).unwrap().pending);

        cache.commit(&entity, 1, b"durable".to_vec());
        let cached = cache.get(&entity).unwrap();
        assert!(!cached.pending);
        assert_eq!(cached.body, b"durable");
    }

    #[test]
    fn evict_clears_the_entry() {
        let cache = EntityCache::new();
        let entity = entity();
        cache.commit(&entity, 1, vec![1]);
        assert_eq!(cache.len(), 1);
        cache.evict(&entity);
        assert!(cache.is_empty());
    }
}
