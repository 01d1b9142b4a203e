//! Authorization checks against a [`CapabilityStore`], for callers (the MCP
//! tool gateway, the approval interceptor) that need a yes/no/why answer
//! rather than the raw token lookup.

use happy_core::types::{Permission, TokenId};

use crate::store::CapabilityStore;

/// The outcome of checking a single resource/permission pair against a
/// capability store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResult {
    /// A non-expired, non-revoked token grants the permission.
    Granted {
        /// The token that granted access.
        token_id: TokenId,
    },
    /// No token in the store grants the permission.
    Denied {
        /// Human-readable reason, for audit logging.
        reason: String,
    },
}

impl AuthorizationResult {
    /// Returns whether this result grants access.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Checks a resource against several permissions at once, e.g. a tool call
/// that needs both `Read` and `Invoke`.
#[derive(Debug, Clone)]
pub struct MultiPermissionCheck {
    resource: String,
    results: Vec<(Permission, AuthorizationResult)>,
}

impl MultiPermissionCheck {
    /// Returns whether every requested permission was granted.
    #[must_use]
    pub fn all_granted(&self) -> bool {
        self.results.iter().all(|(_, r)| r.is_granted())
    }

    /// Returns the permissions that were not granted by any token.
    #[must_use]
    pub fn missing(&self) -> Vec<Permission> {
        self.results
            .iter()
            .filter(|(_, r)| !r.is_granted())
            .map(|(p, _)| *p)
            .collect()
    }

    /// The resource string this check was run against.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Per-permission results, in the order requested.
    #[must_use]
    pub fn results(&self) -> &[(Permission, AuthorizationResult)] {
        &self.results
    }
}

/// Checks whether a capability store grants access to a resource, without
/// exposing the store's internal token representation to the caller.
pub struct CapabilityValidator<'a> {
    store: &'a CapabilityStore,
}

impl<'a> CapabilityValidator<'a> {
    /// Wraps a store for authorization checks.
    #[must_use]
    pub const fn new(store: &'a CapabilityStore) -> Self {
        Self { store }
    }

    /// Checks a single resource/permission pair.
    #[must_use]
    pub fn authorize(&self, resource: &str, permission: Permission) -> AuthorizationResult {
        match self.store.find_capability(resource, permission) {
            Some(token) => AuthorizationResult::Granted { token_id: token.id },
            None => AuthorizationResult::Denied {
                reason: format!("no capability token grants {permission} on {resource}"),
            },
        }
    }

    /// Checks a resource against several permissions at once.
    #[must_use]
    pub fn authorize_all(
        &self,
        resource: &str,
        permissions: &[Permission],
    ) -> MultiPermissionCheck {
        let results = permissions
            .iter()
            .map(|p| (*p, self.authorize(resource, *p)))
            .collect();
        MultiPermissionCheck { resource: resource.to_string(), results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::ResourcePattern;
    use crate::token::{AuditEntryId, CapabilityToken, TokenScope};
    use happy_crypto::KeyPair;

    #[test]
    fn authorize_grants_when_a_token_covers_the_resource() {
        let store = CapabilityStore::in_memory();
        let keypair = KeyPair::generate();
        let token = CapabilityToken::create(
            ResourcePattern::exact("mcp://test:tool").unwrap(),
            vec![Permission::Invoke],
            TokenScope::Session,
            keypair.key_id(),
            AuditEntryId::new(),
            &keypair,
            None,
        );
        store.add(token).unwrap();

        let validator = CapabilityValidator::new(&store);
        let result = validator.authorize("mcp://test:tool", Permission::Invoke);
        assert!(result.is_granted());
    }

    #[test]
    fn authorize_denies_when_no_token_covers_the_resource() {
        let store = CapabilityStore::in_memory();
        let validator = CapabilityValidator::new(&store);
        let result = validator.authorize("mcp://test:tool", Permission::Invoke);
        assert!(!result.is_granted());
    }

    #[test]
    fn authorize_all_reports_missing_permissions() {
        let store = CapabilityStore::in_memory();
        let keypair = KeyPair::generate();
        let token = CapabilityToken::create(
            ResourcePattern::exact("file://workspace/main.rs").unwrap(),
            vec![Permission::Read],
            TokenScope::Session,
            keypair.key_id(),
            AuditEntryId::new(),
            &keypair,
            None,
        );
        store.add(token).unwrap();

        let validator = CapabilityValidator::new(&store);
        let check = validator
            .authorize_all("file://workspace/main.rs", &[Permission::Read, Permission::Write]);

        assert!(!check.all_granted());
        assert_eq!(check.missing(), vec![Permission::Write]);
    }
}
