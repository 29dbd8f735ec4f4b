//! Metrics collection for the dispatch boundary

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Bucket for request types the router does not serve, and for any kind
/// beyond [`MAX_TRACKED_KINDS`]
pub const UNKNOWN_KIND: &str = "UNKNOWN";

/// Distinct request types tracked before new ones fold into [`UNKNOWN_KIND`]
pub const MAX_TRACKED_KINDS: usize = 64;

/// Per request-type counters
#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    resolved: AtomicU64,
    rejected: AtomicU64,
    busy_micros: AtomicU64,
}

/// Dispatch metrics collector
#[derive(Debug)]
pub struct DispatchMetrics {
    /// Counters keyed by request type tag
    by_kind: RwLock<FxHashMap<String, Counters>>,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl DispatchMetrics {
    /// Create new metrics collector
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_kind: RwLock::new(FxHashMap::default()),
            start_time: Instant::now(),
        }
    }

    fn with_counters(&self, kind: &str, update: impl Fn(&Counters)) {
        let by_kind = self.by_kind.read();
        if let Some(counters) = by_kind.get(kind) {
            update(counters);
        } else {
            drop(by_kind);
            let mut by_kind = self.by_kind.write();
            let key = if by_kind.contains_key(kind) || by_kind.len() < MAX_TRACKED_KINDS {
                kind
            } else {
                UNKNOWN_KIND
            };
            update(by_kind.entry(key.to_string()).or_default());
        }
    }

    /// Record a request entering the worker
    pub fn record_received(&self, kind: &str) {
        self.with_counters(kind, |c| {
            c.received.fetch_add(1, Ordering::Relaxed);
        });
    }

    /// Record a resolved request and the time spent computing it
    pub fn record_resolved(&self, kind: &str, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.with_counters(kind, |c| {
            c.resolved.fetch_add(1, Ordering::Relaxed);
            c.busy_micros.fetch_add(micros, Ordering::Relaxed);
        });
    }

    /// Record a rejected request and the time spent before rejection
    pub fn record_rejected(&self, kind: &str, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.with_counters(kind, |c| {
            c.rejected.fetch_add(1, Ordering::Relaxed);
            c.busy_micros.fetch_add(micros, Ordering::Relaxed);
        });
    }

    /// Take a consistent-enough point-in-time snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let by_kind = self.by_kind.read();
        let kinds = by_kind
            .iter()
            .map(|(kind, c)| {
                (
                    kind.clone(),
                    KindCounters {
                        received: c.received.load(Ordering::Relaxed),
                        resolved: c.resolved.load(Ordering::Relaxed),
                        rejected: c.rejected.load(Ordering::Relaxed),
                        busy_micros: c.busy_micros.load(Ordering::Relaxed),
                    },
                )
            })
            .collect();

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            kinds,
        }
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters for one request type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounters {
    pub received: u64,
    pub resolved: u64,
    pub rejected: u64,
    pub busy_micros: u64,
}

/// Serialisable view of the dispatch metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub kinds: BTreeMap<String, KindCounters>,
}

impl MetricsSnapshot {
    /// Total requests received across all types
    pub fn total_received(&self) -> u64 {
        self.kinds.values().map(|c| c.received).sum()
    }

    /// Total requests rejected across all types
    pub fn total_rejected(&self) -> u64 {
        self.kinds.values().map(|c| c.rejected).sum()
    }
}
