//! Synchronous subscriber registry.
//!
//! [`crate::EventBus::subscribe`] gives an async [`crate::EventReceiver`];
//! this module gives the alternative for callers that want an immediate
//! callback instead of polling a channel — e.g. a metrics exporter that
//! just wants to bump a counter per event type.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::event::HappyEvent;

/// Identifies a registered synchronous subscriber, returned by
/// [`SubscriberRegistry::register`] so it can later be passed to
/// [`SubscriberRegistry::unregister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// A synchronous event subscriber, notified inline from
/// [`crate::EventBus::publish`].
///
/// Implementations must return quickly — `notify` runs on the publisher's
/// call stack, not on a separate task.
pub trait EventSubscriber: Send + Sync {
    /// Called once per published event.
    fn notify(&self, event: &HappyEvent);
}

/// An [`EventSubscriber`] that only forwards events matching a predicate.
pub struct FilterSubscriber<F, S> {
    filter: F,
    inner: S,
}

impl<F, S> FilterSubscriber<F, S>
where
    F: Fn(&HappyEvent) -> bool + Send + Sync,
    S: EventSubscriber,
{
    /// Wraps `inner`, only forwarding events for which `filter` returns
    /// `true`.
    pub const fn new(filter: F, inner: S) -> Self {
        Self { filter, inner }
    }
}

impl<F, S> EventSubscriber for FilterSubscriber<F, S>
where
    F: Fn(&HappyEvent) -> bool + Send + Sync,
    S: EventSubscriber,
{
    fn notify(&self, event: &HappyEvent) {
        if (self.filter)(event) {
            self.inner.notify(event);
        }
    }
}

/// A reusable predicate matching events by their `event_type()` string, for
/// callers that don't want to write a closure against the full enum.
#[derive(Debug, Clone)]
pub struct EventFilter {
    event_types: Vec<&'static str>,
}

impl EventFilter {
    /// Matches only the named event types.
    #[must_use]
    pub const fn only(event_types: Vec<&'static str>) -> Self {
        Self { event_types }
    }

    /// Returns whether `event` matches this filter.
    #[must_use]
    pub fn matches(&self, event: &HappyEvent) -> bool {
        self.event_types.contains(&event.event_type())
    }
}

/// Registry of synchronous subscribers, owned by an [`crate::EventBus`].
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: DashMap<SubscriberId, Arc<dyn EventSubscriber>>,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), subscribers: DashMap::new() }
    }

    /// Registers a subscriber, returning an id that can later be passed to
    /// [`Self::unregister`].
    pub fn register(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.insert(id, subscriber);
        id
    }

    /// Removes a previously registered subscriber. Returns `true` if it was
    /// present.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Notifies every registered subscriber of `event`.
    pub fn notify(&self, event: &HappyEvent) {
        for entry in &self.subscribers {
            entry.value().notify(event);
        }
    }

    /// Number of currently registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns `true` if no subscribers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::event::EventMetadata;

    struct CountingSubscriber(Arc<AtomicUsize>);

    impl EventSubscriber for CountingSubscriber {
        fn notify(&self, _event: &HappyEvent) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn registered_subscribers_are_notified_on_publish() {
        let registry = SubscriberRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        registry.register(Arc::new(CountingSubscriber(Arc::clone(&count))));

        let event = HappyEvent::RuntimeStarted { metadata: EventMetadata::new("test"), version: "0.1.0".into() };
        registry.notify(&event);

        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn unregister_stops_future_notifications() {
        let registry = SubscriberRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let id = registry.register(Arc::new(CountingSubscriber(Arc::clone(&count))));
        assert!(registry.unregister(id));

        let event = HappyEvent::RuntimeStarted { metadata: EventMetadata::new("test"), version: "0.1.0".into() };
        registry.notify(&event);

        assert_eq!(count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn filter_subscriber_only_forwards_matching_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = CountingSubscriber(Arc::clone(&count));
        let filter = EventFilter::only(vec!["runtime_started"]);
        let filtered = FilterSubscriber::new(move |e: &HappyEvent| filter.matches(e), inner);

        let event = HappyEvent::RuntimeStarted { metadata: EventMetadata::new("test"), version: "0.1.0".into() };
        filtered.notify(&event);
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }
}
