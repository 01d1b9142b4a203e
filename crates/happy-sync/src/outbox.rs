//! The outbox: pending publishes awaiting acknowledgment, ordered by
//! insertion (spec §4.2 "Outbox of pending publishes").
//!
//! Bounded per spec §5's backpressure rule: on overflow, the oldest queued
//! mutation is dropped only if a newer one for the *same entity* has since
//! superseded it (coalescing); otherwise the new mutation is rejected with
//! [`SyncError::Backpressure`] for the caller to handle.

use std::collections::VecDeque;

use happy_core::protocol::{EntityRef, LocalId, UpdateEnvelope};

use crate::error::{SyncError, SyncResult};

/// Default bound on the number of distinct pending mutations.
pub const DEFAULT_CAPACITY: usize = 256;

/// One queued, not-yet-acknowledged publish.
#[derive(Debug, Clone)]
pub struct PendingPublish {
    /// The entity this mutation targets.
    pub entity: EntityRef,
    /// The outbound publish envelope.
    pub envelope: UpdateEnvelope,
}

/// The bounded, entity-coalescing outbox.
pub struct Outbox {
    capacity: usize,
    queue: VecDeque<PendingPublish>,
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Outbox {
    /// Creates an outbox bounded at `capacity` distinct entities.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity, queue: VecDeque::new() }
    }

    /// Enqueues `envelope` for `entity`.
    ///
    /// If an unacknowledged mutation for the same entity is already
    /// queued, it is replaced in place (coalescing) rather than appended,
    /// so the outbox never carries two pending writes for one entity.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Backpressure`] if the outbox is at capacity and
    /// `entity` has no existing entry to coalesce into.
    pub fn enqueue(&mut self, entity: EntityRef, envelope: UpdateEnvelope) -> SyncResult<()> {
        if let Some(existing) = self.queue.iter_mut().find(|pending| pending.entity == entity) {
            existing.envelope = envelope;
            return Ok(());
        }
        if self.queue.len() >= self.capacity {
            return Err(SyncError::Backpressure);
        }
        self.queue.push_back(PendingPublish { entity, envelope });
        Ok(())
    }

    /// Removes and returns the pending publish for `local_id`, once the
    /// relay has acknowledged or rejected it terminally.
    pub fn remove(&mut self, local_id: LocalId) -> Option<PendingPublish> {
        let index = self.queue.iter().position(|pending| pending.envelope.local_id == local_id)?;
        self.queue.remove(index)
    }

    /// Iterates every pending publish in insertion order, for reconnect
    /// flush.
    pub fn iter(&self) -> impl Iterator<Item = &PendingPublish> {
        self.queue.iter()
    }

    /// How many distinct entities have a pending mutation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the outbox is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use happy_core::protocol::Ciphertext;
    use happy_core::types::AccountId;

    use super::*;

    fn entity() -> EntityRef {
        EntityRef::Account { id: AccountId::new() }
    }

    fn envelope(entity: EntityRef, version: u64) -> UpdateEnvelope {
        UpdateEnvelope::publish(entity, version, Ciphertext::new(vec![1]))
    }

    #[test]
    fn a_second_mutation_for_the_same_entity_coalesces() {
        let mut outbox = Outbox::new(4);
        let entity = entity();
        outbox.enqueue(entity.clone(), envelope(entity.clone(), 0)).unwrap();
        outbox.enqueue(entity.clone(), envelope(entity.clone(), 1)).unwrap();
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn overflow_without_a_coalescing_target_is_backpressure() {
        let mut outbox = Outbox::new(1);
        outbox.enqueue(entity(), envelope(entity(), 0)).unwrap();
        let other = EntityRef::Account { id: AccountId::new() };
        let err = outbox.enqueue(other.clone(), envelope(other, 0)).unwrap_err();
        assert!(matches!(err, SyncError::Backpressure));
    }

    #[test]
    fn remove_drops_the_acknowledged_entry() {
        let mut outbox = Outbox::new(4);
        let entity = entity();
        let envelope = envelope(entity.clone(), 0);
        let local_id = envelope.local_id;
        outbox.enqueue(entity, envelope).unwrap();
        assert!(outbox.remove(local_id).is_some());
        assert!(outbox.is_empty());
    }
}
