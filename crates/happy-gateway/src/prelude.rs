//! Prelude module - commonly used types for convenient import.
//!
//! Use `use happy_gateway::prelude::*;` to import all essential types.

pub use crate::{
    DaemonPaths, DaemonStatus, GatewayContext, GatewayError, GatewayResult, GatewayServer, HealthCheck,
    HealthState, HealthStatus, SessionHandle, SessionInfo, SessionManager, SessionSummary,
};
