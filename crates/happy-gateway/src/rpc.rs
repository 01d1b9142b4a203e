//! The daemon's local control surface (spec §4.3, "Daemon surface"): a
//! jsonrpsee server bound to loopback that the CLI's own foreground process
//! talks to, distinct from the relay-facing Sync Client protocol a session
//! uses to talk to the outside world.
//!
//! Grounded on the teacher's own `happy` jsonrpsee namespace shape (server
//! trait + client-auto-derive + typed wire structs), trimmed to exactly the
//! five operations spec §4.3 names instead of the teacher's LLM-turn surface.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use happy_core::types::SessionId;
use happy_runtime::AssistantFlavor;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};

use crate::manager::SessionSummary;

/// One tracked session, as reported to a local control client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session id.
    pub id: SessionId,
    /// Assistant flavor this session spawned.
    pub flavor: String,
    /// Working directory the assistant was launched in.
    pub workspace: PathBuf,
    /// When the session was spawned.
    pub created_at: DateTime<Utc>,
}

impl From<SessionSummary> for SessionInfo {
    fn from(summary: SessionSummary) -> Self {
        Self {
            id: summary.id,
            flavor: summary.flavor.binary_name().to_string(),
            workspace: summary.workspace,
            created_at: summary.created_at,
        }
    }
}

/// A snapshot of daemon-wide state (spec §4.3 `daemonStatus`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Process id of the running daemon.
    pub pid: u32,
    /// Daemon binary version.
    pub version: String,
    /// Seconds since the daemon started.
    pub uptime_secs: u64,
    /// Number of sessions currently tracked.
    pub session_count: usize,
    /// This machine's identity key, as registered with the relay.
    pub hostname: String,
}

/// The daemon's local control RPC surface.
#[rpc(server, client, namespace = "happy")]
pub trait HappyRpc {
    /// Spawns a new session: launches an assistant child in `working_dir`
    /// and registers it with the relay (spec §4.3, session-start sequence).
    #[method(name = "spawnSession")]
    async fn spawn_session(&self, working_dir: PathBuf, flavor: String, args: Vec<String>) -> Result<SessionInfo, ErrorObjectOwned>;

    /// Lists every session this daemon currently tracks.
    #[method(name = "listSessions")]
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ErrorObjectOwned>;

    /// Gracefully stops one session: signals shutdown, kills the child with
    /// its configured grace period, and stops tracking it.
    #[method(name = "stopSession")]
    async fn stop_session(&self, session_id: SessionId) -> Result<(), ErrorObjectOwned>;

    /// Reports daemon-wide health and bookkeeping.
    #[method(name = "daemonStatus")]
    async fn daemon_status(&self) -> Result<DaemonStatus, ErrorObjectOwned>;

    /// Stops every tracked session and shuts the daemon process down.
    #[method(name = "daemonShutdown")]
    async fn daemon_shutdown(&self) -> Result<(), ErrorObjectOwned>;
}

/// Parses the wire `flavor` string into an [`AssistantFlavor`].
///
/// # Errors
///
/// Returns an error if `flavor` doesn't name one of the supported
/// assistants.
pub fn parse_flavor(flavor: &str) -> Result<AssistantFlavor, String> {
    AssistantFlavor::parse(flavor).ok_or_else(|| format!("unknown assistant flavor: {flavor}"))
}
