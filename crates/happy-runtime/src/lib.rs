//! Happy Runtime — child-process supervision and message pump for Happy
//! sessions (spec §4.3, Session Runtime).
//!
//! This crate owns everything local to one running session: spawning the
//! assistant child (`child`), coalescing and routing input into it
//! (`pump`), gating its tool calls behind user approval (`permission`),
//! tying those together with the Sync Client into one session lifecycle
//! (`session`), and persisting enough state locally to survive a relay
//! outage (`store`, `config`).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod child;
pub mod config;
pub mod error;
pub mod hook_server;
pub mod permission;
pub mod pump;
pub mod session;
pub mod store;
pub mod tool_server;

pub use child::{AssistantFlavor, ChildEvent, ChildSupervisor, PermissionMode, SandboxConfig, SpawnConfig};
pub use config::SessionConfig;
pub use error::{RuntimeError, RuntimeResult};
pub use hook_server::{HookEvent, HookServerState};
pub use permission::{PermissionGate, SharedPermissionGate, ToolInvocation};
pub use pump::{MessagePump, ModeFingerprint, PumpAction, PumpInput};
pub use session::{ControlMode, SessionRuntime};
pub use store::{LocalSessionSeed, LocalSessionStore};
pub use tool_server::{ToolServer, ToolServerConfig};
