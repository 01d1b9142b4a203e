//! Common identifier and classification types shared across the workspace.
//!
//! Entity references are newtypes rather than bare `Uuid`/`String` so that a
//! `MachineId` can never be passed where a `SessionId` is expected, even
//! though both are backed by similar underlying representations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_newtype!(AccountId, "Identifies an account (the encryption and ownership boundary).");
uuid_newtype!(MachineId, "Identifies a machine the daemon is running on.");
uuid_newtype!(ConnectionId, "Identifies one live relay connection, scoped to a single socket's lifetime.");
uuid_newtype!(TokenId, "Identifies a durable capability token issued by the approval flow.");

/// Identifies a session.
///
/// Sessions are created client-side (the CLI picks the identifier before the
/// relay has ever heard of the session), so this is a short random tag rather
/// than a server-assigned UUID: `happy_` followed by 16 base62 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

const SESSION_ID_ALPHABET: &[u8] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const SESSION_ID_LEN: usize = 16;

impl SessionId {
    /// Generates a new random client-chosen session identifier.
    #[must_use]
    pub fn generate() -> Self {
        let mut s = String::with_capacity(SESSION_ID_LEN + 6);
        s.push_str("happy_");
        for _ in 0..SESSION_ID_LEN {
            let idx = rand::random::<usize>() % SESSION_ID_ALPHABET.len();
            s.push(SESSION_ID_ALPHABET[idx] as char);
        }
        Self(s)
    }

    /// Wraps an existing identifier string without validating its shape.
    ///
    /// Used when deserializing a session id received over the wire; the
    /// relay never rejects a session id for failing to match the client
    /// generation scheme.
    #[must_use]
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifies which coding assistant a session is running (`claude`, `codex`,
/// `gemini`, or a custom binary).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Creates an agent identifier from its binary/display name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A point in time, serialized on the wire as epoch milliseconds.
///
/// Every entity's `createdAt`/`updatedAt` field and the `Update.seq`
/// companion timestamp use this type rather than a bare `DateTime<Utc>` so
/// the millisecond-precision wire representation is enforced at the type
/// boundary, not re-derived at each call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Returns the current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Constructs a timestamp from a raw epoch-millisecond value.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the epoch-millisecond value.
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Converts to a `chrono` UTC datetime, if the stored value is in range.
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }

    /// Constructs a timestamp from a `chrono` UTC datetime.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}ms", self.0),
        }
    }
}

/// A permission a tool or capability token can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read access to files within the workspace boundary.
    Read,
    /// Write access to files within the workspace boundary.
    Write,
    /// Permission to delete files within the workspace boundary.
    Delete,
    /// Permission to execute shell commands.
    Execute,
    /// Permission to make outbound network requests.
    Network,
    /// Permission to invoke an MCP tool-extension (the tool-extension
    /// server's `read_file`/`write_file`/`bash`/`list_files` surface, or a
    /// user-configured MCP server).
    Invoke,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Delete => write!(f, "delete"),
            Self::Execute => write!(f, "execute"),
            Self::Network => write!(f, "network"),
            Self::Invoke => write!(f, "invoke"),
        }
    }
}

/// Coarse risk classification assigned to a tool call, driving the default
/// approval behavior when no capability token already covers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Read-only, side-effect free.
    Low,
    /// Mutates state within the workspace boundary.
    Medium,
    /// Mutates state outside the workspace boundary, or runs arbitrary code.
    High,
    /// Irreversible or destructive (e.g. `rm -rf`, force-push).
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_newtypes_roundtrip_through_string() {
        let id = MachineId::new();
        let s = id.to_string();
        let parsed: MachineId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn uuid_newtypes_are_distinct_types() {
        // This is a compile-time property; the runtime check just confirms
        // the two newtypes don't silently compare equal across kinds.
        let account = AccountId::new();
        let machine = MachineId::new();
        assert_ne!(account.as_uuid(), machine.as_uuid());
    }

    #[test]
    fn session_id_has_expected_shape() {
        let id = SessionId::generate();
        assert!(id.as_str().starts_with("happy_"));
        assert_eq!(id.as_str().len(), 6 + SESSION_ID_LEN);
    }

    #[test]
    fn session_id_generation_is_not_constant() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn timestamp_roundtrips_millis() {
        let ts = Timestamp::from_millis(1_700_000_000_000);
        assert_eq!(ts.as_millis(), 1_700_000_000_000);
        assert!(ts.to_datetime().is_some());
    }

    #[test]
    fn risk_level_orders_low_to_critical() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn serde_transparent_ids_serialize_as_bare_strings() {
        let id = AccountId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
