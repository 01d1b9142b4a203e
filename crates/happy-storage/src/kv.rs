//! Raw byte-level key-value storage.
//!
//! [`KvStore`] is the narrow trait every durable backend implements:
//! `get`/`set`/`delete`/`scan_prefix`, plus a single atomic
//! read-modify-write primitive ([`KvStore::compare_and_swap`]) that the
//! Relay Core's per-account `seq` counter and per-entity `version` field are
//! built on. [`MemoryKvStore`] backs tests; [`SurrealKvStore`] (behind the
//! `kv` feature) persists to an embedded SurrealKV tree on disk.
//! [`ScopedKvStore`] namespaces an inner store under a prefix so unrelated
//! subsystems (capability tokens, audit entries, the relay's own tables)
//! can share one physical store without key collisions.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{StorageError, StorageResult};

/// One entry returned by [`KvStore::scan_prefix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    /// The full key (including any scope prefix stripped by
    /// [`ScopedKvStore`]).
    pub key: Vec<u8>,
    /// The stored value.
    pub value: Vec<u8>,
}

/// A raw byte-level key-value store.
///
/// Keys and values are opaque bytes; callers own their own encoding
/// (typically `serde_json`). Implementations MUST make `compare_and_swap`
/// atomic with respect to concurrent callers — it is the serialization
/// point the Relay Core's version/`seq` assignment depends on.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads a value. Returns `Ok(None)` if the key is absent.
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Writes a value unconditionally, overwriting any prior value.
    async fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Deletes a key. Not an error if the key was already absent.
    async fn delete(&self, key: &[u8]) -> StorageResult<()>;

    /// Lists every entry whose key starts with `prefix`, in key order.
    async fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<Vec<KvEntry>>;

    /// Atomically replaces the value at `key`, but only if its current
    /// value matches `expected` (`None` means "key must currently be
    /// absent"). On success, writes `new_value` and returns `Ok(())`. On
    /// mismatch, returns [`StorageError::Conflict`] carrying the actual
    /// current value, so callers can rebase and retry without a second
    /// round trip.
    async fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new_value: &[u8],
    ) -> StorageResult<()>;
}

/// An in-memory [`KvStore`] backed by a `BTreeMap` under a single mutex.
///
/// Used by tests and by the offline/no-persistence code paths. The mutex
/// covers the whole map rather than per-key locking: contention is
/// acceptable here because every production deployment uses
/// [`SurrealKvStore`] instead.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKvStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.data.lock().await.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.data.lock().await.remove(key);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<Vec<KvEntry>> {
        let data = self.data.lock().await;
        Ok(data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| KvEntry { key: k.clone(), value: v.clone() })
            .collect())
    }

    async fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new_value: &[u8],
    ) -> StorageResult<()> {
        let mut data = self.data.lock().await;
        let current = data.get(key).map(Vec::as_slice);
        if current != expected {
            return Err(StorageError::Conflict { current: current.map(<[u8]>::to_vec) });
        }
        data.insert(key.to_vec(), new_value.to_vec());
        Ok(())
    }
}

/// A [`KvStore`] that transparently prefixes every key with a fixed scope,
/// so unrelated subsystems sharing one physical backend never collide.
///
/// Keys returned by [`scan_prefix`](KvStore::scan_prefix) have the scope
/// prefix stripped again, so callers never see it.
#[derive(Clone)]
pub struct ScopedKvStore<S: ?Sized> {
    inner: Arc<S>,
    scope: Vec<u8>,
}

impl<S: KvStore + ?Sized> ScopedKvStore<S> {
    /// Namespaces `inner` under `scope` (e.g. `b"capabilities:"`).
    pub fn new(inner: Arc<S>, scope: impl Into<Vec<u8>>) -> Self {
        Self { inner, scope: scope.into() }
    }

    fn scoped_key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = self.scope.clone();
        full.extend_from_slice(key);
        full
    }
}

#[async_trait]
impl<S: KvStore + ?Sized> KvStore for ScopedKvStore<S> {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(&self.scoped_key(key)).await
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.inner.set(&self.scoped_key(key), value).await
    }

    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.inner.delete(&self.scoped_key(key)).await
    }

    async fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<Vec<KvEntry>> {
        let scoped_prefix = self.scoped_key(prefix);
        let entries = self.inner.scan_prefix(&scoped_prefix).await?;
        Ok(entries
            .into_iter()
            .map(|entry| KvEntry { key: entry.key[self.scope.len()..].to_vec(), value: entry.value })
            .collect())
    }

    async fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new_value: &[u8],
    ) -> StorageResult<()> {
        self.inner.compare_and_swap(&self.scoped_key(key), expected, new_value).await
    }
}

/// A [`ScopedKvStore`] over a type-erased backend, for callers that choose
/// their storage backend at runtime (e.g. the daemon picking between
/// `MemoryKvStore` and `SurrealKvStore` based on config) rather than at
/// compile time.
pub type DynScopedKvStore = ScopedKvStore<dyn KvStore>;

/// An embedded, durable [`KvStore`] backed by SurrealKV.
#[cfg(feature = "kv")]
pub struct SurrealKvStore {
    inner: tokio::sync::Mutex<surrealkv::Tree>,
}

#[cfg(feature = "kv")]
impl SurrealKvStore {
    /// Opens (creating if absent) a SurrealKV tree at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the tree cannot be opened.
    pub fn open(path: &std::path::Path) -> StorageResult<Self> {
        let mut opts = surrealkv::Options::new();
        opts.dir = path.to_path_buf();
        let tree = surrealkv::Tree::new(opts)
            .map_err(|e| StorageError::Connection(format!("surrealkv open failed: {e}")))?;
        Ok(Self { inner: tokio::sync::Mutex::new(tree) })
    }
}

#[cfg(feature = "kv")]
#[async_trait]
impl KvStore for SurrealKvStore {
    async fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let tree = self.inner.lock().await;
        let txn = tree
            .begin()
            .map_err(|e| StorageError::Internal(format!("surrealkv txn failed: {e}")))?;
        txn.get(key)
            .map_err(|e| StorageError::Internal(format!("surrealkv get failed: {e}")))
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let tree = self.inner.lock().await;
        let mut txn = tree
            .begin()
            .map_err(|e| StorageError::Internal(format!("surrealkv txn failed: {e}")))?;
        txn.set(key, value)
            .map_err(|e| StorageError::Internal(format!("surrealkv set failed: {e}")))?;
        txn.commit()
            .await
            .map_err(|e| StorageError::Internal(format!("surrealkv commit failed: {e}")))
    }

    async fn delete(&self, key: &[u8]) -> StorageResult<()> {
        let tree = self.inner.lock().await;
        let mut txn = tree
            .begin()
            .map_err(|e| StorageError::Internal(format!("surrealkv txn failed: {e}")))?;
        txn.delete(key)
            .map_err(|e| StorageError::Internal(format!("surrealkv delete failed: {e}")))?;
        txn.commit()
            .await
            .map_err(|e| StorageError::Internal(format!("surrealkv commit failed: {e}")))
    }

    async fn scan_prefix(&self, prefix: &[u8]) -> StorageResult<Vec<KvEntry>> {
        let tree = self.inner.lock().await;
        let txn = tree
            .begin()
            .map_err(|e| StorageError::Internal(format!("surrealkv txn failed: {e}")))?;
        let mut end = prefix.to_vec();
        match end.last_mut() {
            Some(last) if *last < u8::MAX => *last += 1,
            _ => end.push(0xFF),
        }
        let range = txn
            .scan(prefix.to_vec()..end, None)
            .map_err(|e| StorageError::Internal(format!("surrealkv scan failed: {e}")))?;
        Ok(range
            .into_iter()
            .map(|(k, v, _)| KvEntry { key: k, value: v })
            .collect())
    }

    async fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new_value: &[u8],
    ) -> StorageResult<()> {
        let tree = self.inner.lock().await;
        let mut txn = tree
            .begin()
            .map_err(|e| StorageError::Internal(format!("surrealkv txn failed: {e}")))?;
        let current = txn
            .get(key)
            .map_err(|e| StorageError::Internal(format!("surrealkv get failed: {e}")))?;
        if current.as_deref() != expected {
            return Err(StorageError::Conflict { current });
        }
        txn.set(key, new_value)
            .map_err(|e| StorageError::Internal(format!("surrealkv set failed: {e}")))?;
        txn.commit()
            .await
            .map_err(|e| StorageError::Internal(format!("surrealkv commit failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_none_for_absent_key() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get(b"missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = MemoryKvStore::new();
        store.set(b"k", b"v").await.unwrap();
        assert_eq!(store.get(b"k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn delete_removes_the_key() {
        let store = MemoryKvStore::new();
        store.set(b"k", b"v").await.unwrap();
        store.delete(b"k").await.unwrap();
        assert_eq!(store.get(b"k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn scan_prefix_only_matches_prefixed_keys() {
        let store = MemoryKvStore::new();
        store.set(b"session:1", b"a").await.unwrap();
        store.set(b"session:2", b"b").await.unwrap();
        store.set(b"machine:1", b"c").await.unwrap();
        let entries = store.scan_prefix(b"session:").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.key.starts_with(b"session:")));
    }

    #[tokio::test]
    async fn compare_and_swap_succeeds_on_match() {
        let store = MemoryKvStore::new();
        store.set(b"k", b"1").await.unwrap();
        store.compare_and_swap(b"k", Some(b"1"), b"2").await.unwrap();
        assert_eq!(store.get(b"k").await.unwrap(), Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn compare_and_swap_rejects_on_mismatch_and_reports_current() {
        let store = MemoryKvStore::new();
        store.set(b"k", b"1").await.unwrap();
        let err = store.compare_and_swap(b"k", Some(b"wrong"), b"2").await.unwrap_err();
        match err {
            StorageError::Conflict { current } => assert_eq!(current, Some(b"1".to_vec())),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.get(b"k").await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn compare_and_swap_creates_when_absent_is_expected() {
        let store = MemoryKvStore::new();
        store.compare_and_swap(b"k", None, b"1").await.unwrap();
        assert_eq!(store.get(b"k").await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn scoped_store_isolates_keys_from_other_scopes() {
        let inner = Arc::new(MemoryKvStore::new());
        let a = ScopedKvStore::new(Arc::clone(&inner), "a:");
        let b = ScopedKvStore::new(Arc::clone(&inner), "b:");
        a.set(b"k", b"1").await.unwrap();
        b.set(b"k", b"2").await.unwrap();
        assert_eq!(a.get(b"k").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(b.get(b"k").await.unwrap(), Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn scoped_store_strips_prefix_from_scan_results() {
        let inner = Arc::new(MemoryKvStore::new());
        let scoped = ScopedKvStore::new(Arc::clone(&inner), "sessions:");
        scoped.set(b"abc", b"1").await.unwrap();
        let entries = scoped.scan_prefix(b"").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, b"abc");
    }
}
