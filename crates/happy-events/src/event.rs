//! Event types broadcast on the in-process [`crate::EventBus`].
//!
//! These are internal, same-process notifications — a relay connection
//! handler telling the monitoring layer a publish landed, a daemon telling
//! its own heartbeat task a session changed status — distinct from the
//! wire-level [`happy_core::protocol::ServerMessage`] that crosses the
//! network. No event variant here carries ciphertext or decrypted message
//! content; only entity refs, counters, and classifications, matching the
//! same no-user-content discipline the logging layer follows.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "runtime")]
use happy_core::protocol::{EntityRef, Scope};
#[cfg(feature = "runtime")]
use happy_core::types::{AccountId, ConnectionId, SessionId};

/// Metadata common to every event: where it came from and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event id.
    pub id: Uuid,
    /// Component that emitted the event (`"relay"`, `"sync-client"`, ...).
    pub source: String,
    /// Emission time, epoch milliseconds.
    pub timestamp_ms: i64,
}

impl EventMetadata {
    /// Creates metadata for an event about to be emitted by `source`.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            timestamp_ms: chrono_now_ms(),
        }
    }
}

#[cfg(feature = "runtime")]
fn chrono_now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(not(feature = "runtime"))]
const fn chrono_now_ms() -> i64 {
    0
}

/// An event broadcast on the in-process bus.
///
/// This is an internal notification channel, not the wire protocol:
/// the Relay Core uses it to let its own monitoring/heartbeat tasks react
/// to connection and publish activity without threading callbacks through
/// every handler; the Session Runtime uses it to let the daemon's
/// heartbeat task and local IPC listener react to session lifecycle
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HappyEvent {
    /// The relay admitted a new authenticated connection.
    #[cfg(feature = "runtime")]
    ConnectionOpened {
        /// Event metadata.
        metadata: EventMetadata,
        /// The admitted connection.
        connection_id: ConnectionId,
        /// The account it authenticated as.
        account_id: AccountId,
    },
    /// A connection's transport closed (client disconnect, timeout, kick).
    #[cfg(feature = "runtime")]
    ConnectionClosed {
        /// Event metadata.
        metadata: EventMetadata,
        /// The connection that closed.
        connection_id: ConnectionId,
        /// Why it closed.
        reason: ConnectionCloseReason,
    },
    /// A connection subscribed to an additional scope.
    #[cfg(feature = "runtime")]
    Subscribed {
        /// Event metadata.
        metadata: EventMetadata,
        /// The subscribing connection.
        connection_id: ConnectionId,
        /// The scope it subscribed to.
        scope: Scope,
    },
    /// An update was durably persisted and fanned out.
    #[cfg(feature = "runtime")]
    UpdatePublished {
        /// Event metadata.
        metadata: EventMetadata,
        /// The entity that changed.
        entity: EntityRef,
        /// The account-wide sequence number assigned.
        seq: u64,
        /// The entity's version after the update.
        new_version: u64,
    },
    /// A publish was rejected (version mismatch, auth, rate-limit).
    #[cfg(feature = "runtime")]
    UpdateRejected {
        /// Event metadata.
        metadata: EventMetadata,
        /// The entity the publish targeted.
        entity: EntityRef,
        /// Why it was rejected.
        reason: String,
    },
    /// A session transitioned lifecycle state.
    #[cfg(feature = "runtime")]
    SessionStatusChanged {
        /// Event metadata.
        metadata: EventMetadata,
        /// The session.
        session_id: SessionId,
        /// The new status, as a display string (`"running"`, `"archived"`).
        status: String,
    },
    /// A machine's daemon connection heartbeat timed out.
    #[cfg(feature = "runtime")]
    HeartbeatMissed {
        /// Event metadata.
        metadata: EventMetadata,
        /// The connection whose heartbeat lapsed.
        connection_id: ConnectionId,
    },
    /// Emitted once, when the process housing the bus finishes startup.
    RuntimeStarted {
        /// Event metadata.
        metadata: EventMetadata,
        /// The crate/binary version that started.
        version: String,
    },
}

/// Why a relay connection's transport closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionCloseReason {
    /// The transport was closed by the peer.
    PeerClosed,
    /// The heartbeat deadline elapsed with no liveness probe.
    HeartbeatTimeout,
    /// The server initiated a drain (e.g. graceful shutdown, slow-consumer
    /// eviction).
    ServerDrain,
}

impl HappyEvent {
    /// A short, stable discriminator string, used for log fields and
    /// metrics labels (never the event's own JSON tag, which would also
    /// work, but callers that only have a reference shouldn't need to
    /// serialize to get this).
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            #[cfg(feature = "runtime")]
            Self::ConnectionOpened { .. } => "connection_opened",
            #[cfg(feature = "runtime")]
            Self::ConnectionClosed { .. } => "connection_closed",
            #[cfg(feature = "runtime")]
            Self::Subscribed { .. } => "subscribed",
            #[cfg(feature = "runtime")]
            Self::UpdatePublished { .. } => "update_published",
            #[cfg(feature = "runtime")]
            Self::UpdateRejected { .. } => "update_rejected",
            #[cfg(feature = "runtime")]
            Self::SessionStatusChanged { .. } => "session_status_changed",
            #[cfg(feature = "runtime")]
            Self::HeartbeatMissed { .. } => "heartbeat_missed",
            Self::RuntimeStarted { .. } => "runtime_started",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_metadata_carries_a_unique_id_per_instance() {
        let a = EventMetadata::new("relay");
        let b = EventMetadata::new("relay");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn runtime_started_reports_its_event_type() {
        let event = HappyEvent::RuntimeStarted { metadata: EventMetadata::new("relay"), version: "0.1.0".into() };
        assert_eq!(event.event_type(), "runtime_started");
    }
}
