//! Happy Sync - the Sync Client half of the relay wire protocol.
//!
//! Embedded in both the CLI daemon and the phone/web app, this crate
//! maintains one multiplexed connection to the Relay Core: it subscribes
//! to scopes, resolves entity versions, applies incoming updates to a
//! local cache, emits outgoing mutations, and exposes an RPC surface
//! (`invoke`/`register`). Reconnect, gap-fill, and at-least-once delivery
//! with deduplication are handled internally; callers only ever see a
//! [`SyncClient`] handle and [`SyncEvent`]s on their subscribed scopes.
//!
//! # Example
//!
//! ```no_run
//! use happy_core::protocol::ConnectionKind;
//! use happy_crypto::derive_envelope_key;
//! use happy_sync::{SyncClient, SyncClientConfig};
//!
//! # async fn example() -> happy_sync::SyncResult<()> {
//! let envelope_key = derive_envelope_key(b"account-master-secret", "happy-envelope-v1")?;
//! let client = SyncClient::connect(SyncClientConfig {
//!     url: "wss://relay.example/ws".to_string(),
//!     token: "bearer-token".to_string(),
//!     connection_kind: ConnectionKind::UserScoped,
//!     envelope_key,
//!     cursor_path: None,
//! });
//! client.wait_connected().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod applier;
pub mod cache;
pub mod client;
pub mod cursor;
pub mod error;
pub mod outbox;
pub mod rpc;
pub mod subscription;

mod backoff;
mod transport;

pub use applier::{Applier, UpdateOutcome};
pub use cache::{CachedEntity, EntityCache};
pub use client::{ConnectionState, SyncClient, SyncClientConfig};
pub use cursor::CursorStore;
pub use error::{SyncError, SyncResult};
pub use outbox::{Outbox, PendingPublish};
pub use rpc::{HandlerFn, HandlerRegistry, RpcOutcome, RpcTable};
pub use subscription::{SubscriptionRegistry, SyncEvent};
