//! Frontend-originated input: which conversation a message belongs to and
//! how a frontend tags a message so it can be looked back up later (e.g. a
//! relay client replying to a specific assistant turn).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::MessageRole;
use crate::types::{SessionId, Timestamp};

/// Identifies the conversation context a piece of input arrived on.
///
/// Every [`crate::frontend::Frontend`] implementation produces one of these
/// when it reports its context; the session runtime never needs to know
/// which concrete frontend a request came from, only which identifier shape
/// it carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextIdentifier {
    /// A session attached directly to a local terminal.
    CliSession {
        /// The session the terminal is attached to.
        session_id: String,
        /// The OS user running the CLI.
        user_id: Uuid,
    },
    /// A session being controlled remotely through the relay.
    RemoteSession {
        /// The session being controlled.
        session_id: String,
        /// The relay connection the control messages arrived on.
        connection_id: String,
    },
}

impl ContextIdentifier {
    /// Returns `true` if this context is private to a single controlling
    /// user (always true today: Happy has no shared/multi-user frontends).
    #[must_use]
    pub fn is_private(&self) -> bool {
        true
    }

    /// Returns the session identifier this context is scoped to, if any.
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::CliSession { session_id, .. } | Self::RemoteSession { session_id, .. } => session_id,
        }
    }
}

impl fmt::Display for ContextIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CliSession { session_id, .. } => write!(f, "cli:{session_id}"),
            Self::RemoteSession { session_id, .. } => write!(f, "remote:{session_id}"),
        }
    }
}

/// Identifies a single tagged message returned by [`crate::frontend::Frontend::get_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generates a new random message id.
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

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl From<Uuid> for MessageId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A message a frontend can look back up by id, tagged with where it came
/// from. Used to resolve a reply (e.g. a relay client quoting an earlier
/// assistant turn) back to its originating session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedMessage {
    /// The message's identifier.
    pub message_id: MessageId,
    /// Conversation context the message belongs to.
    pub context: ContextIdentifier,
    /// Who authored the message.
    pub role: MessageRole,
    /// Message body.
    pub content: String,
    /// When the message was created.
    pub created_at: Timestamp,
    /// Session the message belongs to, if the context carries one.
    pub session_id: Option<SessionId>,
}

impl TaggedMessage {
    /// Creates a new tagged message with a fresh identifier.
    #[must_use]
    pub fn new(context: ContextIdentifier, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            message_id: MessageId::new(),
            context,
            role,
            content: content.into(),
            created_at: Timestamp::now(),
            session_id: None,
        }
    }

    /// Attaches the session id the message belongs to.
    #[must_use]
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_identifier_displays_kind_prefix() {
        let ctx = ContextIdentifier::CliSession {
            session_id: "happy_abc".to_string(),
            user_id: Uuid::new_v4(),
        };
        assert_eq!(ctx.to_string(), "cli:happy_abc");
        assert!(ctx.is_private());
    }

    #[test]
    fn message_id_roundtrips_through_string() {
        let id = MessageId::new();
        let parsed: MessageId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn tagged_message_carries_context() {
        let ctx = ContextIdentifier::RemoteSession {
            session_id: "happy_xyz".to_string(),
            connection_id: "conn-1".to_string(),
        };
        let msg = TaggedMessage::new(ctx, MessageRole::Assistant, "done");
        assert_eq!(msg.content, "done");
        assert!(msg.session_id.is_none());
    }
}
