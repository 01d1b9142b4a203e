//! Durable caching of each subscription's resume cursor across daemon
//! restarts (spec §4.2: "`lastSeq` cursor per subscription, durably cached
//! across process restarts").
//!
//! Written atomically (write-temp + rename), matching spec §5's "local
//! daemon state file is written atomically... to survive crashes
//! mid-update" — the same discipline this codebase's daemon state file
//! already follows, applied here to the smaller cursor file.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use happy_core::protocol::Scope;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CursorFile {
    cursors: HashMap<String, u64>,
}

/// A file-backed store of `scope -> lastSeq`, read once at startup and
/// rewritten wholesale on every [`CursorStore::save`].
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    /// Opens a cursor store rooted at `path` (typically
    /// `<state-dir>/sync-cursors.json`). Does not touch the filesystem
    /// until [`load`](Self::load) or [`save`](Self::save) is called.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the persisted cursors, or an empty map if the file doesn't
    /// exist yet (first run).
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file exists but cannot be read, or
    /// contains invalid JSON.
    pub fn load(&self) -> io::Result<HashMap<Scope, u64>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e),
        };
        let file: CursorFile = serde_json::from_slice(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(file
            .cursors
            .into_iter()
            .filter_map(|(key, seq)| serde_json::from_str::<Scope>(&key).ok().map(|scope| (scope, seq)))
            .collect())
    }

    /// Persists `cursors` atomically: write to a sibling temp file, then
    /// rename over the target. A crash mid-write leaves either the old
    /// file or the new one intact, never a truncated one.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the temp file can't be written or the
    /// rename fails.
    pub fn save(&self, cursors: &HashMap<Scope, u64>) -> io::Result<()> {
        let file = CursorFile {
            cursors: cursors
                .iter()
                .map(|(scope, seq)| (serde_json::to_string(scope).unwrap_or_default(), *seq))
                .collect(),
        };
        let bytes = serde_json::to_vec_pretty(&file).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = tmp_path_for(&self.path);
        std::fs::write(&tmp_path, &bytes)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use happy_core::types::AccountId;

    use super::*;

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile_dir();
        let store = CursorStore::new(dir.join("cursors.json"));
        let scope = Scope::Account { id: AccountId::new() };
        let mut cursors = HashMap::new();
        cursors.insert(scope.clone(), 42);
        store.save(&cursors).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.get(&scope), Some(&42));
    }

    #[test]
    fn load_on_a_missing_file_returns_empty() {
        let dir = tempfile_dir();
        let store = CursorStore::new(dir.join("nonexistent.json"));
        assert!(store.load().unwrap().is_empty());
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("happy-sync-cursor-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
