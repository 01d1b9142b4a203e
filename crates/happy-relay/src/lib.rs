//! Happy Relay — the Relay Core half of the wire protocol (spec §4.1).
//!
//! Authenticates connections, keeps an account-keyed routing table of
//! subscriptions, persists the update log, and brokers RPC calls between
//! whichever connections hold the primary handler for a method and
//! whichever connection calls it. Pairs with `happy-sync`, which implements
//! the other end of the same wire protocol.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use happy_core::types::AccountId;
//! use happy_relay::auth::StaticAuthenticator;
//! use happy_relay::server::RelayContext;
//! use happy_relay::store::UpdateStore;
//! use happy_storage::MemoryKvStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = UpdateStore::with_defaults(MemoryKvStore::new());
//! let authenticator = Arc::new(StaticAuthenticator::new().with_token("tok", AccountId::new()));
//! let context = Arc::new(RelayContext::new(store, authenticator));
//! let app = happy_relay::server::app(context);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:0").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod auth;
pub mod connection;
pub mod error;
pub mod prelude;
pub mod router;
pub mod rpc;
pub mod server;
pub mod store;

pub use auth::{Authenticator, StaticAuthenticator};
pub use error::{ConnectionError, PublishError, RpcError, SubscribeError};
pub use router::{Router, SendOutcome};
pub use rpc::{RpcBroker, RpcOutcome};
pub use server::{RelayContext, app};
pub use store::{EntitySnapshot, PublishOutcome, StoredUpdate, UpdateStore};
