//! Daemon state file paths.

use std::path::PathBuf;

/// Paths for daemon state files.
#[derive(Clone)]
pub struct DaemonPaths {
    /// Directory for daemon files (e.g. `~/.happy/`).
    pub base_dir: PathBuf,
}

impl DaemonPaths {
    /// Create paths for the default location using `HappyHome`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be resolved.
    pub fn default_dir() -> Result<Self, std::io::Error> {
        let home = happy_core::dirs::HappyHome::resolve()?;
        Ok(Self {
            base_dir: home.root().to_path_buf(),
        })
    }

    /// Create paths rooted at an explicit gateway state directory (e.g. the
    /// one resolved by `config_bridge::resolve`, which may differ from
    /// `HappyHome` when `gateway.state_dir` is configured).
    #[must_use]
    pub fn from_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// PID file path.
    #[must_use]
    pub fn pid_file(&self) -> PathBuf {
        self.base_dir.join("daemon.pid")
    }

    /// Port file path (written on startup so CLI knows where to connect).
    #[must_use]
    pub fn port_file(&self) -> PathBuf {
        self.base_dir.join("daemon.port")
    }

    /// Daemon log file path (stderr is redirected here on auto-start).
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.base_dir.join("logs").join("daemon.log")
    }

    /// Mode file path (records whether daemon is ephemeral or persistent).
    #[must_use]
    pub fn mode_file(&self) -> PathBuf {
        self.base_dir.join("daemon.mode")
    }
}
