//! Happy Core - foundation types shared across the Happy workspace.
//!
//! This crate provides:
//! - The entity and message data model (accounts, machines, sessions,
//!   messages, the durable update log, ephemeral events)
//! - The approval and MCP elicitation request/response types
//! - Common identifiers (`SessionId`, `MachineId`, `AccountId`, ...)
//! - Security error types
//! - The home-directory layout (`HappyHome`) and spawn-time env var policy
//! - Version management for state migrations
//! - Retry utilities with full-jitter exponential backoff

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod dirs;
pub mod entities;
pub mod env_policy;
pub mod error;
pub mod hook_event;
pub mod identity;
pub mod protocol;
pub mod retry;
pub mod types;
pub mod utils;
pub mod version;

pub use entities::{
    Account, AgentEvent, AgentState, ApprovalDecision, ApprovalOption, ApprovalRequest,
    EphemeralEvent, ElicitationAction, ElicitationRequest, ElicitationResponse,
    ElicitationSchema, Machine, MachineStatus, Message, MessageBody, MessageRole, SelectOption,
    Session, SessionStatus, ToolCallBody, Update, UpdateKind, timeout_decision,
};
pub use error::{SecurityError, SecurityResult};
pub use hook_event::HookEvent;
pub use identity::HappyUserId;
pub use protocol::{
    Ciphertext, ClientMessage, ConnectionKind, EntityRef, LocalId, RpcErrorReason, Scope,
    ServerMessage, UpdateEnvelope, UpdateRejectReason,
};
pub use retry::{RetryConfig, RetryOutcome, retry};
pub use types::{AccountId, AgentId, ConnectionId, MachineId, Permission, RiskLevel, SessionId, Timestamp, TokenId};
pub use utils::truncate_to_boundary;
pub use version::{Version, VersionParseError, Versioned};
