//! Convenience re-export of this crate's commonly used types.

pub use crate::auth::{Authenticator, StaticAuthenticator};
pub use crate::error::{ConnectionError, PublishError, RpcError, SubscribeError};
pub use crate::router::{Router, SendOutcome};
pub use crate::rpc::{RpcBroker, RpcOutcome};
pub use crate::server::{RelayContext, app};
pub use crate::store::{EntitySnapshot, PublishOutcome, StoredUpdate, UpdateStore};
