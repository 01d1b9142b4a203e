//! Tracks every session this daemon currently runs, keyed by [`SessionId`]
//! (spec §4.3, "per-session message queue", "child-process lifecycle").
//!
//! Grounded on the teacher's `AgentManager`/`AgentHandle` split: a
//! `RwLock<HashMap<...>>` held only for brief insert/remove/lookup, with
//! the mutable per-entry state living behind its own lock so a long-running
//! session operation never blocks a concurrent `listSessions`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use happy_core::types::SessionId;
use happy_runtime::{AssistantFlavor, SessionRuntime};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::{GatewayError, GatewayResult};

/// A tracked session: its runtime plus bookkeeping the daemon's RPC layer
/// reports back (`listSessions`, `daemonStatus`).
pub struct SessionHandle {
    /// The running session.
    pub runtime: Arc<SessionRuntime>,
    /// Which assistant flavor this session spawned.
    pub flavor: AssistantFlavor,
    /// Working directory the assistant was launched in.
    pub workspace: PathBuf,
    /// When the session was spawned.
    pub created_at: DateTime<Utc>,
    /// The task driving `SessionRuntime::run_event_loop`, so shutdown can
    /// wait for it to unwind instead of just cancelling and moving on.
    pub event_loop: JoinHandle<()>,
}

/// Owns every session this daemon process has spawned.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly-started session.
    pub async fn insert(&self, id: SessionId, handle: SessionHandle) {
        self.sessions.write().await.insert(id, handle);
    }

    /// Looks up a session's runtime handle.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`] if no session with that id
    /// is tracked.
    pub async fn get(&self, id: &SessionId) -> GatewayResult<Arc<SessionRuntime>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .map(|h| Arc::clone(&h.runtime))
            .ok_or_else(|| GatewayError::SessionNotFound(id.clone()))
    }

    /// Lists every tracked session, most-recently-created first.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<_> = sessions
            .iter()
            .map(|(id, h)| SessionSummary {
                id: id.clone(),
                flavor: h.flavor,
                workspace: h.workspace.clone(),
                created_at: h.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Number of live sessions (spec §4.3 `daemonStatus`).
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Stops and removes a session: requests graceful shutdown, then waits
    /// for its event loop task to finish unwinding.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`] if no session with that id
    /// is tracked.
    pub async fn stop(&self, id: &SessionId) -> GatewayResult<()> {
        let handle = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(id).ok_or_else(|| GatewayError::SessionNotFound(id.clone()))?
        };
        handle.runtime.shutdown();
        let _ = handle.event_loop.await;
        info!(session_id = %id, "session stopped");
        Ok(())
    }

    /// Stops every tracked session (spec §4.3 `daemonShutdown`).
    pub async fn stop_all(&self) {
        let drained: Vec<_> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().collect()
        };
        for (id, handle) in drained {
            handle.runtime.shutdown();
            let _ = handle.event_loop.await;
            info!(session_id = %id, "session stopped during daemon shutdown");
        }
    }
}

/// A session summary for `listSessions`/`daemonStatus`.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// Session id.
    pub id: SessionId,
    /// Assistant flavor.
    pub flavor: AssistantFlavor,
    /// Workspace the assistant was launched in.
    pub workspace: PathBuf,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_missing_session_fails() {
        let manager = SessionManager::new();
        let result = manager.get(&SessionId::generate()).await;
        assert!(matches!(result, Err(GatewayError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn stop_missing_session_fails() {
        let manager = SessionManager::new();
        let result = manager.stop(&SessionId::generate()).await;
        assert!(matches!(result, Err(GatewayError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn empty_manager_reports_zero_sessions() {
        let manager = SessionManager::new();
        assert_eq!(manager.count().await, 0);
        assert!(manager.list().await.is_empty());
    }
}
