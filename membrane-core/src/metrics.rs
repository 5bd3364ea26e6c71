//! Membrane metrics
//!
//! Counters for proxy creation, identity cache effectiveness, and the
//! traffic seen by the policies.

use membrane_types::ProxyKind;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one membrane
#[derive(Debug, Default)]
pub struct MembraneMetrics {
    /// Reactive proxies built
    pub reactive_created: AtomicU64,

    /// Read-only proxies built
    pub read_only_created: AtomicU64,

    /// Wrap requests answered from the registry
    pub registry_hits: AtomicU64,

    /// Wrap requests that had to build a proxy
    pub registry_misses: AtomicU64,

    /// `value_observed` notifications delivered
    pub observed_reads: AtomicU64,

    /// `value_mutated` notifications delivered
    pub mutations_reported: AtomicU64,

    /// Read-only mutations refused in lenient mode
    pub mutations_rejected: AtomicU64,

    /// Dead registry entries dropped by sweeps
    pub entries_swept: AtomicU64,
}

impl MembraneMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a proxy built for the registry
    pub fn record_created(&self, kind: ProxyKind) {
        let counter = match kind {
            ProxyKind::Reactive => &self.reactive_created,
            ProxyKind::ReadOnly => &self.read_only_created,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a wrap request served from the registry
    pub fn record_hit(&self) {
        self.registry_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a wrap request that built a proxy
    pub fn record_miss(&self) {
        self.registry_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivered `value_observed` notification
    pub fn record_observed(&self) {
        self.observed_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivered `value_mutated` notification
    pub fn record_mutation(&self) {
        self.mutations_reported.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a refused read-only mutation
    pub fn record_rejected(&self) {
        self.mutations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record dead registry entries dropped by a sweep
    pub fn record_swept(&self, count: usize) {
        self.entries_swept.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Reset all counters
    pub fn reset(&self) {
        for counter in [
            &self.reactive_created,
            &self.read_only_created,
            &self.registry_hits,
            &self.registry_misses,
            &self.observed_reads,
            &self.mutations_reported,
            &self.mutations_rejected,
            &self.entries_swept,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reactive_created: self.reactive_created.load(Ordering::Relaxed),
            read_only_created: self.read_only_created.load(Ordering::Relaxed),
            registry_hits: self.registry_hits.load(Ordering::Relaxed),
            registry_misses: self.registry_misses.load(Ordering::Relaxed),
            observed_reads: self.observed_reads.load(Ordering::Relaxed),
            mutations_reported: self.mutations_reported.load(Ordering::Relaxed),
            mutations_rejected: self.mutations_rejected.load(Ordering::Relaxed),
            entries_swept: self.entries_swept.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of membrane metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Reactive proxies built
    pub reactive_created: u64,
    /// Read-only proxies built
    pub read_only_created: u64,
    /// Wrap requests answered from the registry
    pub registry_hits: u64,
    /// Wrap requests that had to build a proxy
    pub registry_misses: u64,
    /// `value_observed` notifications delivered
    pub observed_reads: u64,
    /// `value_mutated` notifications delivered
    pub mutations_reported: u64,
    /// Read-only mutations refused in lenient mode
    pub mutations_rejected: u64,
    /// Dead registry entries dropped by sweeps
    pub entries_swept: u64,
}

impl MetricsSnapshot {
    /// Fraction of wrap requests served from the registry (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.registry_hits + self.registry_misses;
        if total == 0 {
            0.0
        } else {
            self.registry_hits as f64 / total as f64
        }
    }

    /// Proxies built of either kind
    pub fn proxies_created(&self) -> u64 {
        self.reactive_created + self.read_only_created
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Proxies: {} reactive | {} read-only",
            self.reactive_created, self.read_only_created
        )?;
        writeln!(
            f,
            "  Hits: {} | Misses: {} | Hit Rate: {:.1}%",
            self.registry_hits,
            self.registry_misses,
            self.hit_rate() * 100.0
        )?;
        writeln!(
            f,
            "  Observed: {} | Mutations: {} | Rejected: {} | Swept: {}",
            self.observed_reads, self.mutations_reported, self.mutations_rejected, self.entries_swept
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_basic() {
        let metrics = MembraneMetrics::new();

        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_created(ProxyKind::Reactive);
        metrics.record_created(ProxyKind::ReadOnly);
        metrics.record_created(ProxyKind::ReadOnly);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hit_rate(), 2.0 / 3.0);
        assert_eq!(snapshot.reactive_created, 1);
        assert_eq!(snapshot.read_only_created, 2);
        assert_eq!(snapshot.proxies_created(), 3);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = MembraneMetrics::new();

        metrics.record_observed();
        metrics.record_swept(4);
        metrics.reset();

        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_snapshot_display() {
        let metrics = MembraneMetrics::new();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_created(ProxyKind::Reactive);
        metrics.record_observed();
        metrics.record_rejected();

        insta::assert_snapshot!(metrics.snapshot().to_string().trim_end(), @r"
        Proxies: 1 reactive | 0 read-only
          Hits: 1 | Misses: 1 | Hit Rate: 50.0%
          Observed: 1 | Mutations: 0 | Rejected: 1 | Swept: 0
        ");
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(MembraneMetrics::new().snapshot()).unwrap();
        assert_eq!(json["registry_hits"], 0);
        assert_eq!(json.as_object().map(|o| o.len()), Some(8));
    }
}
