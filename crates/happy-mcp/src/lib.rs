//! Happy MCP - MCP client with server lifecycle management.
//!
//! This crate provides:
//! - MCP server configuration and lifecycle management
//! - MCP client for tool calling, plus a global+workspace registry over it
//!
//! # Architecture
//!
//! The MCP layer wraps the official `rmcp` SDK with:
//! - Server configuration from TOML files
//! - Process lifecycle management (start/stop/restart, with backoff)
//! - Binary hash verification before execution
//! - Client-side MCP capability negotiation (sampling/roots/elicitation)
//!
//! # Example
//!
//! ```rust,no_run
//! use happy_mcp::{McpClient, ServersConfig, ServerConfig};
//!
//! # async fn example() -> Result<(), happy_mcp::McpError> {
//! // Create configuration
//! let mut config = ServersConfig::default();
//! config.add(
//!     ServerConfig::stdio("filesystem", "npx")
//!         .with_args(["-y", "@anthropics/mcp-server-filesystem", "/tmp"])
//!         .auto_start()
//! );
//!
//! // Create client
//! let client = McpClient::with_config(config);
//!
//! // Connect to server
//! client.connect("filesystem").await?;
//!
//! // List available tools
//! let tools = client.list_tools().await?;
//! for tool in tools {
//!     println!("Tool: {}:{}", tool.server, tool.name);
//! }
//!
//! // Call a tool
//! let result = client.call_tool(
//!     "filesystem",
//!     "read_file",
//!     serde_json::json!({"path": "/tmp/test.txt"})
//! ).await?;
//!
//! println!("Result: {}", result.text_content());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod client;
mod config;
mod error;
mod registry;
mod server;
mod types;

pub mod capabilities;
pub mod tasks;

pub use client::McpClient;
pub use config::{RestartPolicy, ServerConfig, ServersConfig, Transport};
pub use error::{McpError, McpResult};
pub use registry::McpRegistry;
pub use server::{McpServerStatus, ServerManager};
pub use types::{
    PromptArgument, PromptContent, PromptDefinition, PromptMessage, ResourceContent,
    ResourceDefinition, ServerCapabilities, ServerInfo, ToolContent, ToolDefinition, ToolResult,
};

// Re-exports from new modules
pub use capabilities::{
    HappyClientHandler, BridgeChannelCapabilities, BridgeChannelDefinition, BridgeChannelInfo,
    CapabilitiesHandler, ElicitationHandler, RootsHandler, RootsRequest, RootsResponse,
    SamplingHandler, SamplingRequest, SamplingResponse, ServerNotice, UrlElicitationHandler,
};

// Re-export canonical elicitation types from happy-core for convenience.
// These are the single source of truth — no duplicates in happy-mcp.
pub use happy_core::{
    ElicitationRequest, ElicitationResponse, ElicitationSchema, UrlElicitationRequest,
    UrlElicitationResponse, UrlElicitationType,
};
pub use tasks::{Task, TaskManager, TaskState};
