//! Unified prelude for the Happy secure agent runtime.
//!
//! This crate provides a single import to bring in all commonly used types
//! from across Happy. Use this when you need types from multiple
//! crates without managing individual imports.
//!
//! # Usage
//!
//! ```rust,ignore
//! use happy_prelude::*;
//!
//! // Now you have access to types from:
//! // - happy-core (Frontend, errors, identity)
//! // - happy-crypto (KeyPair, Signature, hashing)
//! // - happy-capabilities (tokens, stores)
//! // - happy-audit (logging, verification)
//! // - happy-mcp (client, tools, servers)
//! // - happy-runtime (session runtime, child-process supervision)
//! // - happy-events (event bus)
//! // - happy-hooks (hook system)
//! // - happy-telemetry (logging, tracing)
//! // - happy-gateway (daemon layer)
//! ```
//!
//! # Per-Crate Preludes
//!
//! If you only need types from specific crates, use their individual preludes:
//!
//! ```rust,ignore
//! use happy_core::prelude::*;
//! use happy_crypto::prelude::*;
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use happy_prelude::*;
//!
//! # async fn example() -> RuntimeResult<()> {
//! let flavor = AssistantFlavor::Claude;
//! let permission_gate = std::sync::Arc::new(PermissionGate::new(
//!     SessionId::generate(),
//!     PermissionMode::Default,
//!     std::time::Duration::from_secs(120),
//! ));
//!
//! // Config/credentials/relay registration are the daemon's job
//! // (`GatewayServer::bootstrap`); a session is started against an
//! // already-bootstrapped daemon.
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

// Re-export all crate preludes
pub use happy_audit::prelude::*;
pub use happy_capabilities::prelude::*;
pub use happy_core::prelude::*;
pub use happy_crypto::prelude::*;
pub use happy_events::prelude::*;
pub use happy_gateway::prelude::*;
pub use happy_hooks::prelude::*;
pub use happy_mcp::prelude::*;
pub use happy_runtime::prelude::*;
pub use happy_telemetry::prelude::*;
