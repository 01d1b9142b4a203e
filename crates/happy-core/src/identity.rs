//! Cross-frontend user identity.
//!
//! A `HappyUserId` is the identity the approval and audit systems key on. It
//! is resolved once per frontend (`Frontend::resolve_identity`) from whatever
//! identifier that frontend natively uses (a CLI session's OS user, a relay
//! connection's account id) and then threaded through everything downstream,
//! so the security system never has to know which frontend a request came
//! from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a user across every frontend they control sessions from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HappyUserId(Uuid);

impl HappyUserId {
    /// Generates a new random identity.
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

impl Default for HappyUserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HappyUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for HappyUserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl From<Uuid> for HappyUserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_string() {
        let id = HappyUserId::new();
        let parsed: HappyUserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn distinct_ids_are_not_equal() {
        assert_ne!(HappyUserId::new(), HappyUserId::new());
    }
}
