//! Local on-disk persistence for the offline fallback (spec §4.3,
//! "Offline fallback (CLI-only)").
//!
//! When the relay is unreachable at session start, the session runs in a
//! local-only mode: the assistant child still runs and a background
//! reconnection loop polls. On reconnect, a fresh session is created and
//! seeded from the assistant's own on-disk session file so the in-progress
//! conversation isn't lost.

use std::path::{Path, PathBuf};

use happy_core::types::SessionId;
use happy_storage::{DynScopedKvStore, KvStore, ScopedKvStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{RuntimeError, RuntimeResult};

const KEY_PREFIX: &[u8] = b"local-session/";

/// Snapshot of a session's local (not-yet-synced) state, persisted while
/// the daemon cannot reach the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSessionSeed {
    /// The session ID this seed was recorded under.
    pub session_id: SessionId,
    /// Absolute path to the assistant's own on-disk session/transcript
    /// file, used to seed a fresh relay-backed session on reconnect.
    pub assistant_session_file: PathBuf,
    /// Plain-text messages accumulated locally, in order, while offline.
    /// Not E2E-encrypted at rest: this is the same machine the plaintext
    /// already lives on via the assistant's own session file.
    pub pending_messages: Vec<String>,
    /// Whether this seed has already been consumed by a reconnect.
    pub consumed: bool,
}

impl LocalSessionSeed {
    /// Starts a new seed for a session entering offline mode.
    #[must_use]
    pub fn new(session_id: SessionId, assistant_session_file: PathBuf) -> Self {
        Self { session_id, assistant_session_file, pending_messages: Vec::new(), consumed: false }
    }
}

/// Persists and retrieves [`LocalSessionSeed`]s across daemon restarts.
///
/// Backed by any [`KvStore`] (a [`happy_storage::MemoryKvStore`] in tests,
/// `SurrealKvStore` in production), namespaced under its own key prefix so
/// it can share a physical store with other subsystems (spec §4.3 groups
/// this with the daemon's other local state-file writes, all required to
/// be atomic — `KvStore::compare_and_swap`/`set` already guarantee that at
/// the storage layer).
#[derive(Clone)]
pub struct LocalSessionStore {
    kv: DynScopedKvStore,
}

impl LocalSessionStore {
    /// Wraps a backing store with this module's key namespace.
    #[must_use]
    pub fn new(backing: Arc<dyn KvStore>) -> Self {
        Self { kv: ScopedKvStore::new(backing, KEY_PREFIX) }
    }

    fn key(session_id: &SessionId) -> Vec<u8> {
        session_id.as_str().as_bytes().to_vec()
    }

    /// Records or overwrites the seed for a session.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::StorageError`] if the underlying store
    /// write fails.
    pub async fn save(&self, seed: &LocalSessionSeed) -> RuntimeResult<()> {
        let encoded = serde_json::to_vec(seed).map_err(|e| RuntimeError::StorageError(e.to_string()))?;
        self.kv
            .set(&Self::key(&seed.session_id), &encoded)
            .await
            .map_err(|e| RuntimeError::StorageError(e.to_string()))
    }

    /// Appends one message to a session's pending queue, creating the seed
    /// if it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::StorageError`] on a read or write failure.
    pub async fn append_pending(
        &self,
        session_id: &SessionId,
        assistant_session_file: &Path,
        message: impl Into<String>,
    ) -> RuntimeResult<()> {
        let mut seed = self
            .load(session_id)
            .await?
            .unwrap_or_else(|| LocalSessionSeed::new(session_id.clone(), assistant_session_file.to_path_buf()));
        seed.pending_messages.push(message.into());
        self.save(&seed).await
    }

    /// Loads a session's seed, if one was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::StorageError`] if the underlying store read
    /// fails or the stored value can't be deserialized.
    pub async fn load(&self, session_id: &SessionId) -> RuntimeResult<Option<LocalSessionSeed>> {
        let Some(bytes) = self.kv.get(&Self::key(session_id)).await.map_err(|e| RuntimeError::StorageError(e.to_string()))?
        else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|e| RuntimeError::StorageError(e.to_string()))
    }

    /// Marks a seed consumed after it has been used to create a fresh
    /// relay-backed session on reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::StorageError`] on a read or write failure.
    pub async fn mark_consumed(&self, session_id: &SessionId) -> RuntimeResult<()> {
        if let Some(mut seed) = self.load(session_id).await? {
            seed.consumed = true;
            self.save(&seed).await?;
        }
        Ok(())
    }

    /// Removes a seed entirely (e.g. once its session has ended cleanly).
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::StorageError`] if the underlying delete
    /// fails.
    pub async fn remove(&self, session_id: &SessionId) -> RuntimeResult<()> {
        self.kv.delete(&Self::key(session_id)).await.map_err(|e| RuntimeError::StorageError(e.to_string()))
    }
}

/// Constructs an in-memory-backed store, for tests and for daemons started
/// without a configured persistence directory.
#[must_use]
pub fn in_memory_store() -> LocalSessionStore {
    LocalSessionStore::new(Arc::new(happy_storage::MemoryKvStore::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid() -> SessionId {
        SessionId::generate()
    }

    #[tokio::test]
    async fn round_trips_a_seed() {
        let store = in_memory_store();
        let id = sid();
        let seed = LocalSessionSeed::new(id.clone(), PathBuf::from("/tmp/session.jsonl"));
        store.save(&seed).await.unwrap();
        let loaded = store.load(&id).await.unwrap().expect("present");
        assert_eq!(loaded.session_id, id);
        assert!(!loaded.consumed);
    }

    #[tokio::test]
    async fn append_pending_creates_then_accumulates() {
        let store = in_memory_store();
        let id = sid();
        let path = PathBuf::from("/tmp/session.jsonl");
        store.append_pending(&id, &path, "first").await.unwrap();
        store.append_pending(&id, &path, "second").await.unwrap();
        let loaded = store.load(&id).await.unwrap().expect("present");
        assert_eq!(loaded.pending_messages, vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn mark_consumed_then_remove() {
        let store = in_memory_store();
        let id = sid();
        store.save(&LocalSessionSeed::new(id.clone(), PathBuf::from("/tmp/x"))).await.unwrap();
        store.mark_consumed(&id).await.unwrap();
        assert!(store.load(&id).await.unwrap().unwrap().consumed);
        store.remove(&id).await.unwrap();
        assert!(store.load(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_seed_loads_as_none() {
        let store = in_memory_store();
        assert!(store.load(&sid()).await.unwrap().is_none());
    }
}
