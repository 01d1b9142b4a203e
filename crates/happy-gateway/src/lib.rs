//! Happy Gateway — the daemon process's local control surface and
//! session-lifecycle orchestration (spec §4.3, "Session Runtime" and
//! "Daemon surface").
//!
//! The daemon is the CLI's long-running background process: it resolves
//! this machine's identity and layered configuration once at startup, then
//! spawns and tracks one [`happy_runtime::SessionRuntime`] per active
//! session, each wired to its own relay-facing Sync Client connection.
//! A loopback jsonrpsee server exposes `spawnSession`/`listSessions`/
//! `stopSession`/`daemonStatus`/`daemonShutdown` to the CLI's foreground
//! process.
//!
//! # Architecture
//!
//! ```text
//! happy-gateway (daemon layer)
//! ├── config_bridge    — layered config + local credentials/identity
//! ├── manager          — tracks every SessionRuntime this daemon runs
//! ├── rpc / server     — loopback jsonrpsee surface
//! └── happy-runtime (per-session orchestration)
//!     ├── child-process supervision
//!     ├── message pump / permission gate
//!     └── happy-sync (relay-facing Sync Client)
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config_bridge;
pub mod error;
pub mod health;
pub mod manager;
pub mod prelude;
pub mod rpc;
pub mod server;

pub use config_bridge::GatewayContext;
pub use error::{GatewayError, GatewayResult};
pub use health::{HealthCheck, HealthState, HealthStatus};
pub use manager::{SessionHandle, SessionManager, SessionSummary};
pub use rpc::{DaemonStatus, HappyRpcServer, SessionInfo};
pub use server::paths::DaemonPaths;
pub use server::GatewayServer;
