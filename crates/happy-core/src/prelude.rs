//! Prelude module - commonly used types for convenient import.
//!
//! Use `use happy_core::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use happy_core::prelude::*;
//!
//! // Now you have access to:
//! // - SecurityError, SecurityResult
//! // - The entity/message data model (Account, Machine, Session, Message, ...)
//! // - Approval and elicitation request/response types
//! // - Common identifiers like SessionId, AccountId, RiskLevel
//! ```

// Errors
pub use crate::{SecurityError, SecurityResult};

// Data model
pub use crate::{
    Account, AgentEvent, AgentState, ApprovalDecision, ApprovalOption, ApprovalRequest,
    EphemeralEvent, ElicitationAction, ElicitationRequest, ElicitationResponse,
    ElicitationSchema, Machine, MachineStatus, Message, MessageBody, MessageRole, SelectOption,
    Session, SessionStatus, ToolCallBody, Update, UpdateKind, timeout_decision,
};

// Common types
pub use crate::{AccountId, AgentId, ConnectionId, MachineId, Permission, RiskLevel, SessionId, Timestamp, TokenId};

// Hook events
pub use crate::HookEvent;

// Cross-frontend identity
pub use crate::HappyUserId;

// Wire protocol
pub use crate::{
    Ciphertext, ClientMessage, ConnectionKind, EntityRef, LocalId, RpcErrorReason, Scope,
    ServerMessage, UpdateEnvelope, UpdateRejectReason,
};

// Retry utilities
pub use crate::{RetryConfig, RetryOutcome, retry};

// Versioning
pub use crate::{Version, VersionParseError, Versioned};
