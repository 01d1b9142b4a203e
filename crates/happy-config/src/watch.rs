//! Filesystem watcher for `gateway.hot_reload`: notifies a caller when any
//! of the files a prior [`crate::loader::load`] actually read changes on
//! disk, so the caller can re-resolve and decide what to do (typically:
//! validate the new tree and tell the operator to restart).

use std::path::PathBuf;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};

/// Owns the OS watch handles. Reload notifications stop arriving once this
/// is dropped, so callers must hold it for as long as they want to watch.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
}

/// Watches `paths` for modify/create/remove events and reports the changed
/// path on the returned channel, one notification per underlying OS event.
///
/// Paths that don't exist at call time are skipped (an optional layer like
/// the workspace override may never have existed), matching
/// [`crate::loader`]'s own treat-missing-as-absent semantics.
///
/// # Errors
///
/// Returns [`ConfigError::WatchError`] if the underlying OS watch can't be
/// established for an existing path.
pub fn watch(paths: &[PathBuf]) -> ConfigResult<(ConfigWatcher, mpsc::UnboundedReceiver<PathBuf>)> {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)) => {
                for path in event.paths {
                    let _ = tx.send(path);
                }
            },
            Ok(_) => {},
            Err(error) => warn!(%error, "config watcher error"),
        },
        notify::Config::default(),
    )
    .map_err(|e| ConfigError::WatchError(e.to_string()))?;

    for path in paths.iter().filter(|p| p.exists()) {
        watcher.watch(path, RecursiveMode::NonRecursive).map_err(|e| ConfigError::WatchError(e.to_string()))?;
        debug!(path = %path.display(), "watching config file for changes");
    }

    Ok((ConfigWatcher { _watcher: watcher }, rx))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn a_write_to_a_watched_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = {}").unwrap();

        let (_watcher, mut rx) = watch(&[path.clone()]).unwrap();
        std::fs::write(&path, "model = { provider = \"claude\" }").unwrap();

        let changed = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(changed.is_ok(), "expected a change notification within the timeout");
    }

    #[tokio::test]
    async fn a_missing_path_is_silently_skipped() {
        let (_watcher, _rx) = watch(&[PathBuf::from("/nonexistent/does-not-exist.toml")]).unwrap();
    }
}
