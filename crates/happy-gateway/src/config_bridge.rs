//! Resolves the layered config (`happy-config`) plus the local credential
//! material a freshly-booted daemon needs before it can open a Sync Client
//! connection: an [`AccountId`], and the [`EnvelopeKey`] that makes the
//! relay content-blind (spec §4.1, "encryption envelope").
//!
//! The daemon has no login flow of its own in this crate — it reads (or,
//! on first boot, generates and persists) a small credentials file at
//! `gateway.secrets_file`, mirroring how `happy-config`'s own layered
//! loader treats `gateway.state_dir`: resolve a path, fall back to a
//! platform default, create what's missing.

use std::path::{Path, PathBuf};

use happy_config::loader;
use happy_config::show::ResolvedConfig;
use happy_core::types::{AccountId, MachineId};
use happy_crypto::envelope::EnvelopeKey;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{GatewayError, GatewayResult};

/// Everything resolved once at daemon startup before any session can run.
pub struct GatewayContext {
    /// The fully merged, validated configuration.
    pub config: ResolvedConfig,
    /// This daemon's account identity.
    pub account_id: AccountId,
    /// The account's envelope key for sealing/opening protocol bodies.
    pub envelope_key: EnvelopeKey,
    /// Resolved gateway state directory (PID/port/token file, caches).
    pub state_dir: PathBuf,
    /// This machine's id. Stable across restarts of the daemon on the same
    /// `(hostname, home_dir)` identity key (spec §9, Open Question (b)): the
    /// credentials file is itself keyed by the local state directory, which
    /// is derived from the home directory, so a second daemon started on
    /// this same machine reuses the id rather than minting a new one.
    pub machine_id: MachineId,
}

#[derive(Debug, Serialize, Deserialize)]
struct Credentials {
    account_id: AccountId,
    machine_id: MachineId,
    #[serde(with = "hex_bytes")]
    envelope_key: [u8; 32],
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        hex::encode(bytes).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        let v = hex::decode(s).map_err(serde::de::Error::custom)?;
        v.try_into().map_err(|_| serde::de::Error::custom("envelope key must be 32 bytes"))
    }
}

/// Loads config and resolves/creates local credentials.
///
/// `workspace_root` is forwarded to `happy_config::loader::load` for the
/// workspace config layer; `happy_home_override` lets tests point at a
/// scratch `HAPPY_HOME`.
///
/// # Errors
///
/// Returns a [`GatewayError`] if the config fails to load/validate, or if
/// the credentials file exists but cannot be parsed.
pub fn resolve(workspace_root: Option<&Path>, happy_home_override: Option<&Path>) -> GatewayResult<GatewayContext> {
    let config = loader::load(workspace_root, happy_home_override)?;

    let state_dir = config
        .config
        .gateway
        .state_dir
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| directories::ProjectDirs::from("", "", "happy").map(|d| d.state_dir().unwrap_or(d.data_dir()).to_path_buf()))
        .unwrap_or_else(|| PathBuf::from(".happy/state"));
    std::fs::create_dir_all(&state_dir).map_err(GatewayError::Io)?;

    let creds_path = config
        .config
        .gateway
        .secrets_file
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| state_dir.join("credentials.json"));

    let creds = match std::fs::read(&creds_path) {
        Ok(bytes) => serde_json::from_slice::<Credentials>(&bytes)
            .map_err(|e| GatewayError::StateFile(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let mut key_bytes = [0u8; 32];
            OsRng.fill_bytes(&mut key_bytes);
            let creds = Credentials { account_id: AccountId::new(), machine_id: MachineId::new(), envelope_key: key_bytes };
            let encoded = serde_json::to_vec_pretty(&creds)
                .map_err(|e| GatewayError::StateFile(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
            write_atomic(&creds_path, &encoded)?;
            info!(path = %creds_path.display(), "generated new daemon credentials");
            creds
        },
        Err(e) => return Err(GatewayError::StateFile(e)),
    };

    Ok(GatewayContext {
        envelope_key: EnvelopeKey::from_bytes(creds.envelope_key),
        account_id: creds.account_id,
        machine_id: creds.machine_id,
        config,
        state_dir,
    })
}

/// Write-temp-then-rename, matching spec §5's "local daemon state file is
/// written atomically ... to survive crashes mid-update".
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> GatewayResult<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes).map_err(GatewayError::Io)?;
    std::fs::rename(&tmp, path).map_err(GatewayError::Io)?;
    Ok(())
}
