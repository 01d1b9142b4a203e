//! `HappyClientHandler` and bridge channel types.
//!
//! Split into focused submodules:
//! - [`bridge`] — bridge channel types from plugin subprocess output
//! - [`notice`] — `ServerNotice` and size constants
//! - [`handler`] — `HappyClientHandler` struct, builders, and core methods
//! - [`helpers`] — pure helper fns for inbound message processing
//! - [`rmcp_impl`] — `impl rmcp::ClientHandler for HappyClientHandler`

mod bridge;
mod handler;
mod helpers;
mod notice;
mod rmcp_impl;

#[cfg(test)]
mod tests;

pub use bridge::{BridgeChannelCapabilities, BridgeChannelDefinition, BridgeChannelInfo};
pub use handler::HappyClientHandler;
pub use notice::ServerNotice;
