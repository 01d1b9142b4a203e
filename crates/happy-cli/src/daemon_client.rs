//! Daemon client — connects the CLI to the running daemon over the
//! loopback `jsonrpsee` surface (spec §4.3, "Daemon surface").
//!
//! The CLI is a thin client: session state, the assistant child process,
//! and the relay connection all live in the daemon. This module only
//! knows how to find (or auto-start) that daemon and call its five RPCs.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use happy_core::types::SessionId;
use happy_gateway::rpc::{DaemonStatus, HappyRpcClient, SessionInfo};
use happy_gateway::DaemonPaths;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};

/// A client that connects to the Happy daemon.
pub struct DaemonClient {
    client: WsClient,
}

impl DaemonClient {
    /// Connect to the daemon, auto-starting it if necessary.
    ///
    /// Reads the port from `~/.happy/daemon.port`. If the daemon isn't
    /// running, starts it as a background process and waits for it to
    /// become available.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be started or connected to.
    pub async fn connect() -> anyhow::Result<Self> {
        let paths = DaemonPaths::default_dir()?;

        if !is_running(&paths) {
            Self::start_daemon(&paths).await?;
        }

        let port = read_port(&paths).ok_or_else(|| anyhow::anyhow!("daemon port file not found"))?;
        let url = format!("ws://127.0.0.1:{port}");

        let client = WsClientBuilder::default()
            .connection_timeout(Duration::from_secs(5))
            .build(&url)
            .await
            .map_err(|e| anyhow::anyhow!("failed to connect to daemon at {url}: {e}"))?;

        Ok(Self { client })
    }

    /// Starts the daemon as a background process.
    ///
    /// Stderr is redirected to `~/.happy/logs/daemon.log` so startup errors
    /// can be surfaced to the user if the daemon fails to come up.
    async fn start_daemon(paths: &DaemonPaths) -> anyhow::Result<()> {
        let exe = std::env::current_exe().map_err(|e| anyhow::anyhow!("failed to find current executable: {e}"))?;

        let log_file_path = paths.log_file();
        if let Some(parent) = log_file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| anyhow::anyhow!("failed to create logs directory: {e}"))?;
        }
        let log_file =
            std::fs::File::create(&log_file_path).map_err(|e| anyhow::anyhow!("failed to create daemon log file: {e}"))?;

        std::process::Command::new(&exe)
            .args(["daemon", "run"])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::from(log_file))
            .stdin(std::process::Stdio::null())
            .spawn()
            .map_err(|e| anyhow::anyhow!("failed to start daemon: {e}"))?;

        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if is_running(paths) && read_port(paths).is_some() {
                return Ok(());
            }
        }

        let hint = std::fs::read_to_string(&log_file_path).ok().and_then(|log| extract_startup_error(&log)).unwrap_or_default();

        let mut msg = String::from("daemon did not start within 5 seconds.");
        if !hint.is_empty() {
            let _ = write!(msg, "\n  error: {hint}");
        }
        let _ = write!(msg, "\n  full log: {}", log_file_path.display());

        Err(anyhow::anyhow!("{msg}"))
    }

    /// Spawns a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC call fails.
    pub async fn spawn_session(&self, working_dir: PathBuf, flavor: &str, args: Vec<String>) -> anyhow::Result<SessionInfo> {
        Ok(self.client.spawn_session(working_dir, flavor.to_string(), args).await?)
    }

    /// Lists every session the daemon currently tracks.
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC call fails.
    pub async fn list_sessions(&self) -> anyhow::Result<Vec<SessionInfo>> {
        Ok(self.client.list_sessions().await?)
    }

    /// Stops a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC call fails.
    pub async fn stop_session(&self, session_id: SessionId) -> anyhow::Result<()> {
        self.client.stop_session(session_id).await?;
        Ok(())
    }

    /// Gets daemon status.
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC call fails.
    pub async fn daemon_status(&self) -> anyhow::Result<DaemonStatus> {
        Ok(self.client.daemon_status().await?)
    }

    /// Shuts the daemon down.
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC call fails.
    pub async fn daemon_shutdown(&self) -> anyhow::Result<()> {
        self.client.daemon_shutdown().await?;
        Ok(())
    }
}

/// Whether a daemon is already running for this state directory.
#[must_use]
pub fn is_running(paths: &DaemonPaths) -> bool {
    let Ok(pid_str) = std::fs::read_to_string(paths.pid_file()) else {
        return false;
    };
    let Ok(pid) = pid_str.trim().parse::<i32>() else {
        return false;
    };
    nix::unistd::getpgid(Some(nix::unistd::Pid::from_raw(pid))).is_ok()
}

/// Reads the daemon's bound RPC port from its state file, if present.
#[must_use]
pub fn read_port(paths: &DaemonPaths) -> Option<u16> {
    std::fs::read_to_string(paths.port_file()).ok()?.trim().parse().ok()
}

/// Scans a daemon log (from the bottom) for the most relevant error line.
fn extract_startup_error(log: &str) -> Option<String> {
    let patterns = ["Error:", "ERROR", "panicked", "FATAL", "fatal error"];

    for line in log.lines().rev() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        for pat in &patterns {
            if trimmed.contains(pat) {
                return Some(trimmed.to_string());
            }
        }
    }

    log.lines().rev().find(|l| !l.trim().is_empty()).map(|l| l.trim().to_string())
}
