//! Health board — in-memory registry of the latest health signals.
//!
//! Holds one signal per `(source, instance_key)`. Entries are removed once
//! their TTL passes, so a node that stops being reported about drops off
//! the board on its own.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::time::Instant;
use tracing::{info, warn};

use crate::signal::{HealthReporter, HealthSignal, Severity};

struct Entry {
    signal: HealthSignal,
    expires_at: Instant,
}

/// Latest-signal health registry with TTL expiry.
#[derive(Default)]
pub struct HealthBoard {
    entries: RwLock<HashMap<(String, String), Entry>>,
    /// Total signals ever reported, including replaced ones.
    received: AtomicU64,
}

impl HealthBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// All signals whose TTL has not yet passed, ordered by key.
    pub fn active(&self) -> Vec<HealthSignal> {
        self.prune();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut signals: Vec<HealthSignal> =
            entries.values().map(|e| e.signal.clone()).collect();
        signals.sort_by(|a, b| {
            (&a.source, &a.instance_key).cmp(&(&b.source, &b.instance_key))
        });
        signals
    }

    /// The live signal for a key, if any.
    pub fn get(&self, source: &str, instance_key: &str) -> Option<HealthSignal> {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&(source.to_string(), instance_key.to_string()))
            .filter(|e| e.expires_at > now)
            .map(|e| e.signal.clone())
    }

    /// Number of live warnings.
    pub fn warning_count(&self) -> usize {
        self.active()
            .iter()
            .filter(|s| s.severity == Severity::Warning)
            .count()
    }

    /// Total number of signals reported since creation.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Drop expired entries.
    pub fn prune(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, e| e.expires_at > now);
    }
}

impl HealthReporter for HealthBoard {
    fn report(&self, signal: HealthSignal) {
        match signal.severity {
            Severity::Ok => info!(
                source = %signal.source,
                key = %signal.instance_key,
                ttl_secs = signal.ttl.as_secs(),
                "{}",
                signal.description
            ),
            Severity::Warning => warn!(
                source = %signal.source,
                key = %signal.instance_key,
                ttl_secs = signal.ttl.as_secs(),
                "{}",
                signal.description
            ),
        }

        self.received.fetch_add(1, Ordering::Relaxed);
        let key = (signal.source.clone(), signal.instance_key.clone());
        let now = Instant::now();
        let expires_at = now + signal.ttl;
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(key, Entry { signal, expires_at });
    }
}
