//! Health checks for the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Overall health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthState {
    /// All systems healthy.
    Healthy,
    /// Some non-critical issues.
    Degraded,
    /// Critical issues.
    Unhealthy,
    /// Unknown state.
    Unknown,
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of a single health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Name of the component being checked.
    pub component: String,

    /// Health state.
    pub state: HealthState,

    /// Human-readable message.
    pub message: Option<String>,

    /// Check duration.
    pub duration_ms: u64,

    /// When this check was performed.
    pub checked_at: DateTime<Utc>,

    /// Additional details.
    #[serde(default)]
    pub details: HashMap<String, serde_json::Value>,
}

impl HealthCheck {
    /// Create a healthy check result.
    #[must_use]
    pub fn healthy(component: impl Into<String>, duration: Duration) -> Self {
        Self {
            component: component.into(),
            state: HealthState::Healthy,
            message: None,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            checked_at: Utc::now(),
            details: HashMap::new(),
        }
    }

    /// Create an unhealthy check result.
    #[must_use]
    pub fn unhealthy(
        component: impl Into<String>,
        message: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            component: component.into(),
            state: HealthState::Unhealthy,
            message: Some(message.into()),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            checked_at: Utc::now(),
            details: HashMap::new(),
        }
    }

    /// Create a degraded check result.
    #[must_use]
    pub fn degraded(
        component: impl Into<String>,
        message: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            component: component.into(),
            state: HealthState::Degraded,
            message: Some(message.into()),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            checked_at: Utc::now(),
            details: HashMap::new(),
        }
    }

    /// Add a detail.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.insert(key.into(), v);
        }
        self
    }

    /// Add a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Overall health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall state.
    pub state: HealthState,

    /// When this status was computed.
    pub checked_at: DateTime<Utc>,

    /// Individual check results.
    pub checks: Vec<HealthCheck>,

    /// Gateway uptime.
    pub uptime_secs: u64,

    /// Version information.
    pub version: String,
}

impl HealthStatus {
    /// Create a new health status from check results.
    #[must_use]
    pub fn from_checks(
        checks: Vec<HealthCheck>,
        uptime: Duration,
        version: impl Into<String>,
    ) -> Self {
        let state = Self::aggregate_state(&checks);

        Self {
            state,
            checked_at: Utc::now(),
            checks,
            uptime_secs: uptime.as_secs(),
            version: version.into(),
        }
    }

    /// Aggregate individual check states into overall state.
    fn aggregate_state(checks: &[HealthCheck]) -> HealthState {
        if checks.is_empty() {
            return HealthState::Unknown;
        }

        let has_unhealthy = checks.iter().any(|c| c.state == HealthState::Unhealthy);
        let has_degraded = checks.iter().any(|c| c.state == HealthState::Degraded);
        let has_unknown = checks.iter().any(|c| c.state == HealthState::Unknown);

        if has_unhealthy {
            HealthState::Unhealthy
        } else if has_degraded || has_unknown {
            HealthState::Degraded
        } else {
            HealthState::Healthy
        }
    }

    /// Check if healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.state == HealthState::Healthy
    }

    /// Get checks by state.
    #[must_use]
    pub fn checks_by_state(&self, state: HealthState) -> Vec<&HealthCheck> {
        self.checks.iter().filter(|c| c.state == state).collect()
    }

    /// Get unhealthy checks.
    #[must_use]
    pub fn unhealthy_checks(&self) -> Vec<&HealthCheck> {
        self.checks_by_state(HealthState::Unhealthy)
    }
}

/// Run health checks for the daemon (spec §4.3 `daemonStatus`).
pub async fn run_health_checks(session_count: usize, relay_connected: bool, uptime: Duration, version: &str) -> HealthStatus {
    let mut checks = Vec::new();

    let start = std::time::Instant::now();
    let session_check =
        HealthCheck::healthy("session_manager", start.elapsed()).with_detail("session_count", session_count);
    checks.push(session_check);

    let start = std::time::Instant::now();
    let relay_check = if relay_connected {
        HealthCheck::healthy("relay_connection", start.elapsed())
    } else {
        HealthCheck::degraded("relay_connection", "not connected to relay", start.elapsed())
    };
    checks.push(relay_check);

    HealthStatus::from_checks(checks, uptime, version)
}
