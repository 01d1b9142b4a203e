//! Bearer-credential resolution.
//!
//! Authentication *onboarding* (how a credential is issued, device pairing,
//! session handoff) is explicitly out of scope for the core (spec §1); the
//! Relay Core only needs to resolve an already-issued bearer token to the
//! [`AccountId`] it authorizes, which is this trait's entire contract.

use async_trait::async_trait;
use happy_core::types::AccountId;

/// Resolves a bearer credential to the account it authenticates.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolves `token`.
    ///
    /// Returns `None` if the token is invalid, expired, or revoked — the
    /// caller maps this to a terminal `auth` connection failure.
    async fn authenticate(&self, token: &str) -> Option<AccountId>;
}

/// A static token table, for tests and single-operator deployments where
/// tokens are provisioned out of band rather than through a full identity
/// service.
#[derive(Debug, Default)]
pub struct StaticAuthenticator {
    tokens: std::collections::HashMap<String, AccountId>,
}

impl StaticAuthenticator {
    /// Creates an authenticator with no tokens registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` as authenticating `account_id`.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, account_id: AccountId) -> Self {
        self.tokens.insert(token.into(), account_id);
        self
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, token: &str) -> Option<AccountId> {
        self.tokens.get(token).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_token_resolves_to_its_account() {
        let account_id = AccountId::new();
        let auth = StaticAuthenticator::new().with_token("tok-a", account_id);
        assert_eq!(auth.authenticate("tok-a").await, Some(account_id));
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let auth = StaticAuthenticator::new();
        assert_eq!(auth.authenticate("nope").await, None);
    }
}
