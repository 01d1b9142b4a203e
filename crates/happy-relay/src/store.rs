//! The durable side of the Relay Core: the per-account `seq` counter, the
//! per-entity `version` field, and the update log they're both assigned
//! from. Built on `happy_storage::KvStore` rather than a bespoke table
//! engine, per the ambient-stack decision in `DESIGN.md`.
//!
//! The whole publish path for one account is serialized behind a single
//! in-process lock (`locks`), matching spec §5's "the per-account version
//! counter is serialized by a lock... in the Relay Core" — the durable
//! writes underneath it don't need their own cross-key transaction because
//! nothing else can be mid-publish for the same account while the lock is
//! held.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use happy_core::protocol::{Ciphertext, EntityRef, LocalId, Scope};
use happy_core::types::{AccountId, ConnectionId, Timestamp};
use happy_storage::{KvStore, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{PublishError, SubscribeError};

/// Default number of update-log entries retained per account before older
/// entries are eligible for eviction. Configurable per [`UpdateStore`]
/// instance; spec §6 calls this "the retention horizon" and leaves it a
/// deployment knob.
pub const DEFAULT_RETENTION: u64 = 10_000;

/// A durably persisted log entry: the cleartext envelope fields plus the
/// opaque body, exactly as spec §3 describes an `Update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUpdate {
    /// Account-wide monotonic ordinal.
    pub seq: u64,
    /// What entity changed.
    pub entity: EntityRef,
    /// The entity's version after this change.
    pub version: u64,
    /// The connection that published it, for self-echo suppression.
    pub producer: Option<ConnectionId>,
    /// Dedup token.
    pub local_id: LocalId,
    /// Opaque encrypted body.
    pub body: Ciphertext,
    /// When the Relay Core assigned this `seq`.
    pub created_at: Timestamp,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntityState {
    version: u64,
    body: Ciphertext,
}

#[derive(Debug, Serialize, Deserialize)]
struct LocalIdMarker {
    seq: u64,
    version: u64,
}

/// The outcome of a successful [`UpdateStore::publish`].
#[derive(Debug, Clone, Copy)]
pub struct PublishOutcome {
    /// The assigned account-wide sequence number.
    pub seq: u64,
    /// The entity's version after the update.
    pub new_version: u64,
}

/// The durable update log and entity-version table for every account the
/// Relay Core serves.
pub struct UpdateStore<S> {
    kv: S,
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
    retention: u64,
}

impl<S: KvStore> UpdateStore<S> {
    /// Opens a store over `kv`, retaining `retention` log entries per
    /// account before older ones become eligible for eviction.
    #[must_use]
    pub fn new(kv: S, retention: u64) -> Self {
        Self { kv, locks: DashMap::new(), retention }
    }

    /// Opens a store with [`DEFAULT_RETENTION`].
    #[must_use]
    pub fn with_defaults(kv: S) -> Self {
        Self::new(kv, DEFAULT_RETENTION)
    }

    fn account_lock(&self, account_id: AccountId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(account_id).or_insert_with(|| Arc::new(Mutex::new(()))))
    }

    fn version_key(entity: &EntityRef) -> Vec<u8> {
        format!("ver:{entity}").into_bytes()
    }

    fn log_key(account_id: AccountId, seq: u64) -> Vec<u8> {
        format!("log:{account_id}:{seq:020}").into_bytes()
    }

    fn log_prefix(account_id: AccountId) -> Vec<u8> {
        format!("log:{account_id}:").into_bytes()
    }

    fn seq_key(account_id: AccountId) -> Vec<u8> {
        format!("seq:{account_id}").into_bytes()
    }

    fn floor_key(account_id: AccountId) -> Vec<u8> {
        format!("floor:{account_id}").into_bytes()
    }

    fn local_id_key(entity: &EntityRef, local_id: LocalId) -> Vec<u8> {
        format!("localid:{entity}:{local_id}").into_bytes()
    }

    async fn read_u64(&self, key: &[u8]) -> StorageResult<u64> {
        Ok(match self.kv.get(key).await? {
            Some(bytes) => {
                let array: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| StorageError::Serialization("malformed u64 counter".into()))?;
                u64::from_be_bytes(array)
            }
            None => 0,
        })
    }

    async fn entity_version(&self, entity: &EntityRef) -> StorageResult<u64> {
        match self.kv.get(&Self::version_key(entity)).await? {
            Some(bytes) => {
                let state: EntityState = serde_json::from_slice(&bytes)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(state.version)
            }
            None => Ok(0),
        }
    }

    /// The entity's current `{version, body}`, if it has ever been
    /// published. Used to answer `version-mismatch` rejections and
    /// full-resync refetches.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the underlying store read fails.
    pub async fn current_state(&self, entity: &EntityRef) -> StorageResult<Option<(u64, Ciphertext)>> {
        match self.kv.get(&Self::version_key(entity)).await? {
            Some(bytes) => {
                let state: EntityState = serde_json::from_slice(&bytes)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some((state.version, state.body)))
            }
            None => Ok(None),
        }
    }

    /// Publishes a mutation, assigning the next `seq` for `account_id` and
    /// advancing the entity's version, atomically with respect to every
    /// other publish on this account.
    ///
    /// Idempotent on `(entity, local_id)`: a retried publish with the same
    /// pair returns the outcome of the first attempt without mutating
    /// anything a second time (spec §8 invariant 3).
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::VersionMismatch`] if `expected_version`
    /// doesn't match the entity's current version, or
    /// [`PublishError::Storage`] if the underlying store fails.
    pub async fn publish(
        &self,
        account_id: AccountId,
        entity: EntityRef,
        expected_version: u64,
        body: Ciphertext,
        local_id: LocalId,
        producer: Option<ConnectionId>,
    ) -> Result<(PublishOutcome, StoredUpdate), PublishError> {
        let lock = self.account_lock(account_id);
        let _guard = lock.lock().await;

        let local_id_key = Self::local_id_key(&entity, local_id);
        if let Some(bytes) = self.kv.get(&local_id_key).await? {
            let marker: LocalIdMarker =
                serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))?;
            let log_key = Self::log_key(account_id, marker.seq);
            let stored = self
                .kv
                .get(&log_key)
                .await?
                .ok_or_else(|| StorageError::Internal("local-id marker outlived its log entry".into()))?;
            let update: StoredUpdate =
                serde_json::from_slice(&stored).map_err(|e| StorageError::Serialization(e.to_string()))?;
            return Ok((PublishOutcome { seq: marker.seq, new_version: marker.version }, update));
        }

        let current_version = self.entity_version(&entity).await?;
        if current_version != expected_version {
            let current_body = match self.current_state(&entity).await? {
                Some((_, body)) => body.as_bytes().to_vec(),
                None => Vec::new(),
            };
            return Err(PublishError::VersionMismatch {
                expected: expected_version,
                current: current_version,
                current_body,
            });
        }

        let new_version = expected_version.saturating_add(1);
        let seq = self.read_u64(&Self::seq_key(account_id)).await?.saturating_add(1);

        let stored = StoredUpdate {
            seq,
            entity: entity.clone(),
            version: new_version,
            producer,
            local_id,
            body: body.clone(),
            created_at: Timestamp::now(),
        };
        let stored_bytes =
            serde_json::to_vec(&stored).map_err(|e| StorageError::Serialization(e.to_string()))?;

        self.kv.set(&Self::seq_key(account_id), &seq.to_be_bytes()).await?;
        let entity_state = EntityState { version: new_version, body };
        let entity_bytes =
            serde_json::to_vec(&entity_state).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.set(&Self::version_key(&entity), &entity_bytes).await?;
        self.kv.set(&Self::log_key(account_id, seq), &stored_bytes).await?;
        let marker = LocalIdMarker { seq, version: new_version };
        let marker_bytes =
            serde_json::to_vec(&marker).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.set(&local_id_key, &marker_bytes).await?;

        self.trim_if_needed(account_id).await?;

        Ok((PublishOutcome { seq, new_version }, stored))
    }

    async fn trim_if_needed(&self, account_id: AccountId) -> StorageResult<()> {
        let entries = self.kv.scan_prefix(&Self::log_prefix(account_id)).await?;
        if (entries.len() as u64) <= self.retention {
            return Ok(());
        }
        let overflow = entries.len() as u64 - self.retention;
        for entry in entries.into_iter().take(overflow as usize) {
            self.kv.delete(&entry.key).await?;
        }
        let floor = self.read_u64(&Self::seq_key(account_id)).await?.saturating_sub(self.retention);
        self.kv.set(&Self::floor_key(account_id), &floor.to_be_bytes()).await?;
        Ok(())
    }

    /// Replays every update on `account_id` with `seq > since_seq` that
    /// belongs to `scope`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`SubscribeError::ResyncRequired`] if `since_seq` is below
    /// the account's retention floor.
    pub async fn replay_since(
        &self,
        account_id: AccountId,
        scope: &Scope,
        since_seq: u64,
    ) -> Result<Vec<StoredUpdate>, SubscribeError> {
        let floor = self.read_u64(&Self::floor_key(account_id)).await?;
        if since_seq < floor {
            return Err(SubscribeError::ResyncRequired { min_seq: floor });
        }

        let entries = self.kv.scan_prefix(&Self::log_prefix(account_id)).await?;
        let mut updates: Vec<StoredUpdate> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_slice::<StoredUpdate>(&entry.value).ok())
            .filter(|update| update.seq > since_seq)
            .filter(|update| &update.entity.scope(account_id) == scope)
            .collect();
        updates.sort_by_key(|update| update.seq);
        Ok(updates)
    }

    /// The account's current retention floor: the lowest `seq` still
    /// guaranteed to be replayable.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the underlying store read fails.
    pub async fn retention_floor(&self, account_id: AccountId) -> StorageResult<u64> {
        self.read_u64(&Self::floor_key(account_id)).await
    }
}

/// A process-local snapshot of every entity's current version for a single
/// account, used by tests and by the offline-fallback seeding path to avoid
/// a full store round trip per entity.
#[derive(Default)]
pub struct EntitySnapshot {
    versions: HashMap<String, u64>,
}

impl EntitySnapshot {
    /// Records the observed version for `entity`.
    pub fn record(&mut self, entity: &EntityRef, version: u64) {
        self.versions.insert(entity.to_string(), version);
    }

    /// The last recorded version for `entity`, if any.
    #[must_use]
    pub fn get(&self, entity: &EntityRef) -> Option<u64> {
        self.versions.get(&entity.to_string()).copied()
    }
}

#[cfg(test)]
mod tests {
    use happy_storage::MemoryKvStore;

    use super::*;

    fn account() -> AccountId {
        AccountId::new()
    }

    fn entity() -> EntityRef {
        EntityRef::Account { id: account() }
    }

    #[tokio::test]
    async fn first_publish_assigns_seq_one_and_version_one() {
        let store = UpdateStore::with_defaults(MemoryKvStore::new());
        let account_id = account();
        let entity = EntityRef::Account { id: account_id };
        let (outcome, stored) = store
            .publish(account_id, entity, 0, Ciphertext::new(vec![1]), LocalId::generate(), None)
            .await
            .unwrap();
        assert_eq!(outcome.seq, 1);
        assert_eq!(outcome.new_version, 1);
        assert_eq!(stored.seq, 1);
    }

    #[tokio::test]
    async fn mismatched_expected_version_is_rejected_with_current_state() {
        let store = UpdateStore::with_defaults(MemoryKvStore::new());
        let account_id = account();
        let entity = EntityRef::Account { id: account_id };
        store
            .publish(account_id, entity.clone(), 0, Ciphertext::new(vec![1]), LocalId::generate(), None)
            .await
            .unwrap();

        let err = store
            .publish(account_id, entity, 0, Ciphertext::new(vec![2]), LocalId::generate(), None)
            .await
            .unwrap_err();
        match err {
            PublishError::VersionMismatch { expected, current, current_body } => {
                assert_eq!(expected, 0);
                assert_eq!(current, 1);
                assert_eq!(current_body, vec![1]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn retried_publish_with_same_local_id_is_idempotent() {
        let store = UpdateStore::with_defaults(MemoryKvStore::new());
        let account_id = account();
        let entity = EntityRef::Account { id: account_id };
        let local_id = LocalId::generate();

        let (first, _) = store
            .publish(account_id, entity.clone(), 0, Ciphertext::new(vec![9]), local_id, None)
            .await
            .unwrap();
        let (second, _) = store
            .publish(account_id, entity, 0, Ciphertext::new(vec![9]), local_id, None)
            .await
            .unwrap();
        assert_eq!(first.seq, second.seq);
        assert_eq!(first.new_version, second.new_version);

        let floor = store.retention_floor(account_id).await.unwrap();
        assert_eq!(floor, 0, "a single publish must not trigger retention trimming");
    }

    #[tokio::test]
    async fn replay_since_returns_updates_in_seq_order() {
        let store = UpdateStore::with_defaults(MemoryKvStore::new());
        let account_id = account();
        let entity = EntityRef::Account { id: account_id };
        let scope = entity.scope(account_id);

        for i in 0..5u64 {
            store
                .publish(account_id, entity.clone(), i, Ciphertext::new(vec![i as u8]), LocalId::generate(), None)
                .await
                .unwrap();
        }

        let replayed = store.replay_since(account_id, &scope, 2).await.unwrap();
        assert_eq!(replayed.iter().map(|u| u.seq).collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn replay_below_retention_floor_requires_resync() {
        let store = UpdateStore::new(MemoryKvStore::new(), 3);
        let account_id = account();
        let entity = EntityRef::Account { id: account_id };
        let scope = entity.scope(account_id);

        for i in 0..10u64 {
            store
                .publish(account_id, entity.clone(), i, Ciphertext::new(vec![i as u8]), LocalId::generate(), None)
                .await
                .unwrap();
        }

        let err = store.replay_since(account_id, &scope, 0).await.unwrap_err();
        match err {
            SubscribeError::ResyncRequired { min_seq } => assert!(min_seq > 0),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn entity_snapshot_tracks_last_recorded_version() {
        let mut snapshot = EntitySnapshot::default();
        let entity = entity();
        assert_eq!(snapshot.get(&entity), None);
        snapshot.record(&entity, 3);
        assert_eq!(snapshot.get(&entity), Some(3));
    }
}
