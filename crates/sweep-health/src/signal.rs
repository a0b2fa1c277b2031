//! Health signal types and the reporter seam.

use std::sync::Arc;
use std::time::Duration;

/// Severity of a health signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Ok,
    Warning,
}

/// A single health report.
///
/// Signals are keyed by `(source, instance_key)`: a newer signal with the
/// same key replaces the older one. A signal lapses once `ttl` has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthSignal {
    /// Reporting component, e.g. `NodeManager`.
    pub source: String,
    /// What the signal is about: a node name or a fixed topic.
    pub instance_key: String,
    pub severity: Severity,
    pub ttl: Duration,
    pub description: String,
}

impl HealthSignal {
    pub fn new(
        source: &str,
        instance_key: &str,
        severity: Severity,
        ttl: Duration,
        description: impl Into<String>,
    ) -> Self {
        Self {
            source: source.to_string(),
            instance_key: instance_key.to_string(),
            severity,
            ttl,
            description: description.into(),
        }
    }

    pub fn ok(source: &str, instance_key: &str, ttl: Duration, description: impl Into<String>) -> Self {
        Self::new(source, instance_key, Severity::Ok, ttl, description)
    }

    pub fn warning(
        source: &str,
        instance_key: &str,
        ttl: Duration,
        description: impl Into<String>,
    ) -> Self {
        Self::new(source, instance_key, Severity::Warning, ttl, description)
    }
}

/// Sink for health signals.
///
/// Fire-and-forget: implementations must not block and must swallow
/// their own failures.
pub trait HealthReporter: Send + Sync {
    fn report(&self, signal: HealthSignal);
}

impl<R: HealthReporter + ?Sized> HealthReporter for Arc<R> {
    fn report(&self, signal: HealthSignal) {
        (**self).report(signal);
    }
}
