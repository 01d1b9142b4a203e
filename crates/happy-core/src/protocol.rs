//! The wire protocol joining the Sync Client to the Relay Core: a
//! bidirectional JSON-object stream carrying versioned persistent updates,
//! best-effort ephemeral events, and RPC request/response, all multiplexed
//! over one persistent transport per connection.
//!
//! Every variant here is what §6 of the design calls a "message type":
//! cleartext routing/ordering fields live directly on the variant, while any
//! user-content field (`body`, `request`, `response`) is opaque ciphertext
//! produced by [`happy_crypto`](../../happy_crypto/index.html) — this crate
//! only carries the bytes, it never decodes them.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AccountId, ConnectionId, MachineId, SessionId, Timestamp};

/// A routing key a connection subscribes to. Updates and ephemeral events
/// are delivered to every connection currently subscribed to the scope
/// named by their entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// Everything belonging to one account: every machine and session.
    Account {
        /// The account.
        id: AccountId,
    },
    /// One machine's lifecycle and heartbeat updates.
    Machine {
        /// The machine.
        id: MachineId,
    },
    /// One session's metadata, agent state, and message log.
    Session {
        /// The session.
        id: SessionId,
    },
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account { id } => write!(f, "account:{id}"),
            Self::Machine { id } => write!(f, "machine:{id}"),
            Self::Session { id } => write!(f, "session:{id}"),
        }
    }
}

/// The connection kind a client authenticates with. This determines which
/// scope the connection is automatically subscribed to on admission;
/// further scopes may be added explicitly via [`ClientMessage::Subscribe`]
/// as long as they're owned by the authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "connectionKind", rename_all = "kebab-case")]
pub enum ConnectionKind {
    /// Subscribed to the whole account: every machine and session.
    UserScoped,
    /// Subscribed to one session.
    SessionScoped {
        /// The session to auto-subscribe to.
        session_id: SessionId,
    },
    /// Subscribed to one machine.
    MachineScoped {
        /// The machine to auto-subscribe to.
        machine_id: MachineId,
    },
}

impl ConnectionKind {
    /// Returns the scope this connection kind auto-subscribes to. The
    /// account itself is resolved from the bearer credential, not carried
    /// here, so `account_id` is supplied by the caller at admission time.
    #[must_use]
    pub fn initial_scope(&self, account_id: AccountId) -> Scope {
        match self {
            Self::UserScoped => Scope::Account { id: account_id },
            Self::SessionScoped { session_id } => Scope::Session { id: session_id.clone() },
            Self::MachineScoped { machine_id } => Scope::Machine { id: *machine_id },
        }
    }
}

/// A reference to the durable entity an [`UpdateEnvelope`] mutates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entityKind", rename_all = "snake_case")]
pub enum EntityRef {
    /// The account record itself.
    Account {
        /// The account.
        id: AccountId,
    },
    /// A machine registration.
    Machine {
        /// The machine.
        id: MachineId,
    },
    /// A session's metadata or agent-state.
    Session {
        /// The session.
        id: SessionId,
    },
    /// One message in a session's transcript.
    Message {
        /// The owning session.
        session_id: SessionId,
        /// The message.
        message_id: Uuid,
    },
}

impl EntityRef {
    /// The scope an update against this entity routes through.
    #[must_use]
    pub fn scope(&self, account_id: AccountId) -> Scope {
        match self {
            Self::Account { id } => Scope::Account { id: *id },
            Self::Machine { id } => Scope::Machine { id: *id },
            Self::Session { id } | Self::Message { session_id: id, .. } => {
                Scope::Session { id: id.clone() }
            }
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account { id } => write!(f, "account:{id}"),
            Self::Machine { id } => write!(f, "machine:{id}"),
            Self::Session { id } => write!(f, "session:{id}"),
            Self::Message { session_id, message_id } => {
                write!(f, "session:{session_id}/message:{message_id}")
            }
        }
    }
}

/// Reason an `update-reject` was sent back to the publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateRejectReason {
    /// `expectedVersion` did not match the entity's current version.
    VersionMismatch,
    /// The connection is not authorized to publish against this entity.
    Auth,
    /// The publisher is exceeding its rate limit.
    RateLimit,
}

/// Reason an `rpc-error` was returned instead of a `rpc-response`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RpcErrorReason {
    /// No connection currently holds the primary handler for this
    /// `(scope, method)` pair.
    NoHandler,
    /// The call's `timeoutMs` elapsed with no response.
    Timeout,
    /// The handler connection's transport closed mid-call.
    Transport,
}

/// An opaque, already-encrypted payload. The relay stores and forwards this
/// byte string without ever attempting to parse it; only a holder of the
/// account's envelope key (see `happy_crypto::EnvelopeKey`) can open it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ciphertext(#[serde(with = "base64_bytes")] pub Vec<u8>);

impl Ciphertext {
    /// Wraps raw sealed bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the sealed bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ciphertext({} bytes)", self.0.len())
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// A client-generated dedup token attached to a publish. Retrying the same
/// `(entityRef, localId)` pair MUST produce exactly one durable update; see
/// the idempotence law in the testable properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(Uuid);

impl LocalId {
    /// Generates a fresh dedup token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The cleartext envelope of a persistent update, carried both as the
/// outbound publish request (`expectedVersion` set, `seq`/`producer` unset)
/// and as the inbound delivered update (`seq`/`producer` set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEnvelope {
    /// What entity this update mutates.
    pub entity: EntityRef,
    /// The version the publisher observed before mutating, for optimistic
    /// concurrency. Only present on the outbound publish.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expected_version: Option<u64>,
    /// The entity's version *after* this update is applied. Always present
    /// once the relay has accepted the publish.
    pub version: u64,
    /// Account-wide monotonic ordinal, assigned by the Relay Core.
    /// Present only once the update has been durably assigned one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub seq: Option<u64>,
    /// The `connectionId` that published this update, used by every other
    /// subscriber for nothing and by the publisher itself for self-echo
    /// suppression.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub producer: Option<ConnectionId>,
    /// Dedup token; retried publishes with the same `(entity, local_id)`
    /// coalesce to the first that landed.
    pub local_id: LocalId,
    /// Opaque encrypted patch body.
    pub body: Ciphertext,
}

impl UpdateEnvelope {
    /// Builds the outbound publish request for a mutation.
    #[must_use]
    pub fn publish(entity: EntityRef, expected_version: u64, body: Ciphertext) -> Self {
        Self {
            entity,
            expected_version: Some(expected_version),
            version: expected_version + 1,
            seq: None,
            producer: None,
            local_id: LocalId::generate(),
            body,
        }
    }

    /// Builds the outbound publish request for a mutation with an explicit
    /// dedup token, for idempotent retry of a specific prior attempt.
    #[must_use]
    pub fn publish_with_local_id(
        entity: EntityRef,
        expected_version: u64,
        body: Ciphertext,
        local_id: LocalId,
    ) -> Self {
        Self { local_id, ..Self::publish(entity, expected_version, body) }
    }
}

/// Messages a client sends to the Relay Core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Authenticate the connection and declare its connection kind.
    Auth {
        /// Bearer credential.
        token: String,
        /// The connection kind (determines the initial scope).
        #[serde(flatten)]
        connection_kind: ConnectionKind,
    },
    /// Subscribe to an additional scope owned by the authenticated account.
    Subscribe {
        /// The scope to subscribe to.
        scope: Scope,
        /// Resume position; the server replays `seq > sinceSeq`. Absent
        /// means "start from a fresh snapshot, no replay."
        #[serde(skip_serializing_if = "Option::is_none", default)]
        since_seq: Option<u64>,
    },
    /// Propose a mutation.
    Update(UpdateEnvelope),
    /// Best-effort, unpersisted signal.
    Ephemeral {
        /// Scope to fan out to.
        scope: Scope,
        /// Event discriminator (`typing`, `presence`, `usage-tick`, ...).
        kind: String,
        /// When the client emitted this.
        ts: Timestamp,
        /// Opaque payload, if any.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        payload: Option<Ciphertext>,
    },
    /// Issue an RPC call to whichever connection holds the primary handler
    /// for `(targetScope, method)`.
    RpcCall {
        /// Correlates the eventual response to this call.
        call_id: Uuid,
        /// Scope the target handler is registered on.
        target_scope: Scope,
        /// Method name.
        method: String,
        /// How long to wait before synthesizing a timeout.
        timeout_ms: u64,
        /// Opaque encrypted request body.
        request: Ciphertext,
    },
    /// Respond to an inbound RPC call this connection is handling.
    RpcResponse {
        /// The call being responded to.
        call_id: Uuid,
        /// Whether the call succeeded.
        ok: bool,
        /// Opaque encrypted response body, present when `ok`.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        response: Option<Ciphertext>,
        /// Opaque encrypted error body, present when `!ok`.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        error_body: Option<Ciphertext>,
    },
    /// Register this connection as the primary RPC handler for a method,
    /// scoped to whatever scope(s) the connection is subscribed to.
    RpcHandle {
        /// Method name to serve.
        method: String,
    },
    /// Liveness probe.
    Heartbeat {
        /// Client clock at send time.
        ts: Timestamp,
    },
}

/// Messages the Relay Core sends to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Authentication succeeded.
    AuthOk {
        /// Stable identifier for this connection, used for self-echo
        /// suppression.
        connection_id: ConnectionId,
        /// The account the bearer credential resolved to.
        account_id: AccountId,
        /// Server clock at admission time.
        server_time: Timestamp,
    },
    /// A persistent update, either a fresh publish fanned out to other
    /// subscribers or a replayed entry during resync.
    Update(UpdateEnvelope),
    /// A publish this connection made was durably accepted.
    UpdateAck {
        /// The publish's dedup token.
        local_id: LocalId,
        /// The assigned sequence number.
        seq: u64,
        /// The entity's version after this update.
        new_version: u64,
    },
    /// A publish this connection made was rejected.
    UpdateReject {
        /// The publish's dedup token.
        local_id: LocalId,
        /// Why it was rejected.
        reason: UpdateRejectReason,
        /// The entity's actual current version, when known (always present
        /// for `version-mismatch`).
        #[serde(skip_serializing_if = "Option::is_none", default)]
        current_version: Option<u64>,
        /// The entity's actual current body, when known.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        current_body: Option<Ciphertext>,
    },
    /// A best-effort event fanned out to current scope members.
    Ephemeral {
        /// Scope it was fanned out on.
        scope: Scope,
        /// Event discriminator.
        kind: String,
        /// Server-observed send time.
        ts: Timestamp,
        /// Opaque payload, if any.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        payload: Option<Ciphertext>,
    },
    /// An inbound RPC call, routed to this connection because it holds the
    /// primary handler for `(targetScope, method)`.
    RpcCall {
        /// Correlates this call to the eventual response.
        call_id: Uuid,
        /// Scope the call targeted.
        target_scope: Scope,
        /// Method name.
        method: String,
        /// Opaque encrypted request body.
        request: Ciphertext,
    },
    /// A response to a call this connection made.
    RpcResponse {
        /// The call being responded to.
        call_id: Uuid,
        /// Whether the call succeeded.
        ok: bool,
        /// Opaque encrypted response body, present when `ok`.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        response: Option<Ciphertext>,
        /// Opaque encrypted error body, present when `!ok`.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        error_body: Option<Ciphertext>,
    },
    /// A call this connection made could not be completed.
    RpcError {
        /// The call that failed.
        call_id: Uuid,
        /// Why it failed.
        reason: RpcErrorReason,
    },
    /// Liveness probe response.
    Heartbeat {
        /// Server clock at send time.
        ts: Timestamp,
    },
    /// The requested `sinceSeq` is below the retention horizon for this
    /// scope; the client must refetch a full snapshot rather than rely on
    /// log replay.
    ResyncRequired {
        /// The scope that needs a full refetch.
        scope: Scope,
        /// The lowest `seq` the server can still replay for this scope.
        min_seq: u64,
    },
}
