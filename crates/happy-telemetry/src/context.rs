//! Request correlation context.
//!
//! Wraps a `tracing::Span` carrying a stable request id so log lines from
//! every component touched by one operation (a publish, an RPC call, a
//! hook invocation) can be correlated without passing the id through every
//! function signature by hand.

use tracing::Span;
use uuid::Uuid;

/// Correlates log lines across one logical operation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    component: String,
    operation: Option<String>,
}

impl RequestContext {
    /// Starts a new context for the named component (e.g. `"relay"`,
    /// `"sync-client"`, `"session-runtime"`).
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self { request_id: Uuid::new_v4(), component: component.into(), operation: None }
    }

    /// Attaches the operation name (e.g. `"publish_update"`).
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Returns the correlation id.
    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Builds the `tracing::Span` for this context. Entering it (directly,
    /// or via [`RequestContext::enter`]) attaches `request_id`, `component`,
    /// and `operation` to every event recorded within.
    #[must_use]
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            component = %self.component,
            operation = self.operation.as_deref().unwrap_or("unspecified"),
        )
    }

    /// Enters the span, returning a guard that keeps it active until
    /// dropped.
    #[must_use]
    pub fn enter(&self) -> RequestGuard {
        RequestGuard { _entered: self.span().entered() }
    }
}

/// Keeps a [`RequestContext`]'s span active until dropped.
pub struct RequestGuard {
    _entered: tracing::span::EnteredSpan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_operation_is_recorded_on_the_span() {
        let ctx = RequestContext::new("relay").with_operation("publish_update");
        let _guard = ctx.enter();
        assert_eq!(ctx.operation.as_deref(), Some("publish_update"));
    }

    #[test]
    fn each_context_gets_a_distinct_request_id() {
        let a = RequestContext::new("relay");
        let b = RequestContext::new("relay");
        assert_ne!(a.request_id(), b.request_id());
    }
}
