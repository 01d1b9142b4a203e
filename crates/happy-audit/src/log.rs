//! The audit log itself: chain-linked entry creation and chain verification.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use happy_capabilities::AuditEntryId;
use happy_core::SessionId;
use happy_crypto::{ContentHash, KeyPair, PublicKey};

use crate::entry::{AuditAction, AuditEntry, AuditOutcome, AuthorizationProof};
use crate::error::{AuditError, AuditResult};
use crate::storage::{AuditStorage, SurrealKvAuditStorage};

/// Chain-linked, ed25519-signed audit log.
///
/// Every [`AuditLog::append`] signs the new entry with the runtime key and
/// links it to the session's previous entry by content hash, so
/// [`AuditLog::verify_chain`] can detect any entry that was altered or
/// removed after the fact.
pub struct AuditLog {
    storage: Arc<dyn AuditStorage>,
    runtime_key: KeyPair,
    runtime_public_key: PublicKey,
    // Cached chain heads, avoiding a storage round trip on every append.
    heads: Mutex<HashMap<SessionId, ContentHash>>,
}

impl AuditLog {
    /// Creates an audit log backed by an in-memory store (lost on process
    /// exit).
    #[must_use]
    pub fn in_memory(runtime_key: KeyPair) -> Self {
        Self::with_storage(Arc::new(SurrealKvAuditStorage::in_memory()), runtime_key)
    }

    /// Opens (or creates) a durable audit log at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be opened.
    pub fn open(path: impl AsRef<Path>, runtime_key: KeyPair) -> AuditResult<Self> {
        let storage = SurrealKvAuditStorage::open(path)?;
        Ok(Self::with_storage(Arc::new(storage), runtime_key))
    }

    /// Builds an audit log over a caller-supplied storage backend (e.g. one
    /// shared with other subsystems).
    #[must_use]
    pub fn with_storage(storage: Arc<dyn AuditStorage>, runtime_key: KeyPair) -> Self {
        let runtime_public_key = runtime_key.export_public_key();
        Self { storage, runtime_key, runtime_public_key, heads: Mutex::new(HashMap::new()) }
    }

    /// The runtime's signing public key.
    #[must_use]
    pub const fn runtime_public_key(&self) -> &PublicKey {
        &self.runtime_public_key
    }

    /// Starts a fluent append for `session_id`.
    #[must_use]
    pub fn builder(&self, session_id: SessionId) -> AuditBuilder<'_> {
        AuditBuilder { log: self, session_id, authorization: None }
    }

    fn previous_hash(&self, session_id: &SessionId) -> AuditResult<ContentHash> {
        {
            let heads = self
                .heads
                .lock()
                .map_err(|_| AuditError::StorageError("audit chain-head lock poisoned".into()))?;
            if let Some(hash) = heads.get(session_id) {
                return Ok(*hash);
            }
        }

        match self.storage.get_chain_head(session_id)? {
            Some(id) => {
                let entry = self
                    .storage
                    .get(&id)?
                    .ok_or_else(|| AuditError::EntryNotFound { entry_id: id.to_string() })?;
                Ok(entry.content_hash())
            },
            None => Ok(ContentHash::zero()),
        }
    }

    /// Signs and appends a new entry to `session_id`'s chain, returning the
    /// new entry's id.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the current chain head or persisting the
    /// new entry fails.
    pub fn append(
        &self,
        session_id: SessionId,
        action: AuditAction,
        authorization: AuthorizationProof,
        outcome: AuditOutcome,
    ) -> AuditResult<AuditEntryId> {
        let previous_hash = self.previous_hash(&session_id)?;
        let entry = AuditEntry::create(
            session_id.clone(),
            action,
            authorization,
            outcome,
            previous_hash,
            &self.runtime_key,
        );

        self.storage.store(&entry)?;

        let mut heads = self
            .heads
            .lock()
            .map_err(|_| AuditError::StorageError("audit chain-head lock poisoned".into()))?;
        heads.insert(session_id, entry.content_hash());

        Ok(entry.id.clone())
    }

    /// Looks up a single entry by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn get(&self, id: &AuditEntryId) -> AuditResult<Option<AuditEntry>> {
        self.storage.get(id)
    }

    /// Returns every entry for a session, in append order.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn get_session_entries(&self, session_id: &SessionId) -> AuditResult<Vec<AuditEntry>> {
        self.storage.get_session_entries(session_id)
    }

    /// Number of entries recorded for a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn count_session(&self, session_id: &SessionId) -> AuditResult<usize> {
        self.storage.count_session(session_id)
    }

    /// Total entries across every session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn count(&self) -> AuditResult<usize> {
        self.storage.count()
    }

    /// Every session id that has at least one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn list_sessions(&self) -> AuditResult<Vec<SessionId>> {
        self.storage.list_sessions()
    }

    /// Verifies one session's chain: every entry's signature checks out and
    /// each entry's `previous_hash` matches the content hash of the entry
    /// before it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read the session's
    /// entries.
    pub fn verify_chain(&self, session_id: &SessionId) -> AuditResult<ChainVerificationResult> {
        let entries = self.storage.get_session_entries(session_id)?;
        let mut issues = Vec::new();
        let mut previous: Option<&AuditEntry> = None;

        for entry in &entries {
            if entry.verify_signature().is_err() {
                issues.push(ChainIssue::InvalidSignature { entry_id: entry.id.to_string() });
            }

            let links_correctly = match previous {
                Some(prev) => entry.follows(prev),
                None => entry.previous_hash == ContentHash::zero(),
            };
            if !links_correctly {
                issues.push(ChainIssue::BrokenLink { entry_id: entry.id.to_string() });
            }

            previous = Some(entry);
        }

        Ok(ChainVerificationResult {
            valid: issues.is_empty(),
            entries_verified: entries.len(),
            issues,
        })
    }

    /// Verifies every known session's chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub fn verify_all(&self) -> AuditResult<Vec<(SessionId, ChainVerificationResult)>> {
        self.storage
            .list_sessions()?
            .into_iter()
            .map(|session_id| {
                let result = self.verify_chain(&session_id)?;
                Ok((session_id, result))
            })
            .collect()
    }
}

impl fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLog").finish_non_exhaustive()
    }
}

/// Fluent entry-point for [`AuditLog::append`], for callers building up
/// authorization context before recording the outcome.
pub struct AuditBuilder<'a> {
    log: &'a AuditLog,
    session_id: SessionId,
    authorization: Option<AuthorizationProof>,
}

impl<'a> AuditBuilder<'a> {
    /// Sets how the recorded action was authorized. Defaults to
    /// [`AuthorizationProof::NotRequired`] if never called.
    #[must_use]
    pub fn authorized_by(mut self, authorization: AuthorizationProof) -> Self {
        self.authorization = Some(authorization);
        self
    }

    /// Signs and appends the entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying [`AuditLog::append`] fails.
    pub fn record(self, action: AuditAction, outcome: AuditOutcome) -> AuditResult<AuditEntryId> {
        let authorization = self.authorization.unwrap_or_else(|| AuthorizationProof::NotRequired {
            reason: "no authorization context attached".to_string(),
        });
        self.log.append(self.session_id, action, authorization, outcome)
    }
}

/// Outcome of verifying one session's chain.
#[derive(Debug, Clone)]
pub struct ChainVerificationResult {
    /// `true` if no issues were found.
    pub valid: bool,
    /// Number of entries checked.
    pub entries_verified: usize,
    /// Issues found, if any.
    pub issues: Vec<ChainIssue>,
}

/// A single chain integrity problem found during verification.
#[derive(Debug, Clone)]
pub enum ChainIssue {
    /// An entry's signature did not verify against the recorded runtime key.
    InvalidSignature {
        /// The offending entry's id.
        entry_id: String,
    },
    /// An entry's `previous_hash` did not match the entry before it (or, for
    /// the first entry, was not the zero hash).
    BrokenLink {
        /// The offending entry's id.
        entry_id: String,
    },
}

impl fmt::Display for ChainIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSignature { entry_id } => {
                write!(f, "entry {entry_id} has an invalid signature")
            },
            Self::BrokenLink { entry_id } => {
                write!(f, "entry {entry_id} does not chain from its predecessor")
            },
        }
    }
}
