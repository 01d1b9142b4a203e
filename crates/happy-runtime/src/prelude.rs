//! Prelude module - commonly used types for convenient import.
//!
//! Use `use happy_runtime::prelude::*;` to import all essential types.

pub use crate::{
    AssistantFlavor, ChildEvent, ChildSupervisor, ControlMode, HookEvent, HookServerState,
    LocalSessionSeed, LocalSessionStore, MessagePump, ModeFingerprint, PermissionGate, PermissionMode,
    PumpAction, PumpInput, RuntimeError, RuntimeResult, SandboxConfig, SessionConfig, SessionRuntime,
    SharedPermissionGate, SpawnConfig, ToolInvocation, ToolServer, ToolServerConfig,
};
