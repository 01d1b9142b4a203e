//! Convenience re-export of this crate's commonly used types.

pub use crate::applier::{Applier, UpdateOutcome};
pub use crate::cache::{CachedEntity, EntityCache};
pub use crate::client::{ConnectionState, SyncClient, SyncClientConfig};
pub use crate::cursor::CursorStore;
pub use crate::error::{SyncError, SyncResult};
pub use crate::outbox::{Outbox, PendingPublish};
pub use crate::rpc::{HandlerFn, HandlerRegistry, RpcOutcome, RpcTable};
pub use crate::subscription::{SubscriptionRegistry, SyncEvent};
