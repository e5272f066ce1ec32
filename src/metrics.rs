//! Metrics collected while ranking a batch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A snapshot of batch metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchMetrics {
    /// Queries that finished ranking.
    pub ranked_queries: u64,

    /// Queries that failed.
    pub failed_queries: u64,

    /// Queries that produced at least one expansion term.
    pub expanded_queries: u64,

    /// Expansion terms added, summed over all queries.
    pub total_expansion_terms: u64,

    /// Pass-2 hits, summed over all queries.
    pub total_hits: u64,

    /// Average time per query.
    pub avg_query_time: Duration,

    /// Slowest query.
    pub max_query_time: Duration,

    /// Fastest query.
    pub min_query_time: Duration,

    /// Wall time since the collector was created.
    pub elapsed: Duration,
}

impl BatchMetrics {
    /// Queries ranked per second of wall time.
    pub fn queries_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.ranked_queries as f64 / secs
        } else {
            0.0
        }
    }
}

#[derive(Debug)]
struct LatencyBounds {
    min: Duration,
    max: Duration,
}

/// Thread-safe collector shared by the batch workers.
#[derive(Debug)]
pub struct MetricsCollector {
    ranked_queries: AtomicU64,
    failed_queries: AtomicU64,
    expanded_queries: AtomicU64,
    total_expansion_terms: AtomicU64,
    total_hits: AtomicU64,
    total_query_nanos: AtomicU64,
    bounds: Mutex<LatencyBounds>,
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Create a new collector; its clock starts now.
    pub fn new() -> Self {
        MetricsCollector {
            ranked_queries: AtomicU64::new(0),
            failed_queries: AtomicU64::new(0),
            expanded_queries: AtomicU64::new(0),
            total_expansion_terms: AtomicU64::new(0),
            total_hits: AtomicU64::new(0),
            total_query_nanos: AtomicU64::new(0),
            bounds: Mutex::new(LatencyBounds {
                min: Duration::MAX,
                max: Duration::ZERO,
            }),
            start_time: Instant::now(),
        }
    }

    /// Record a ranked query.
    pub fn record_ranked(&self, elapsed: Duration, expansion_terms: usize, hits: usize) {
        self.ranked_queries.fetch_add(1, Ordering::Relaxed);
        if expansion_terms > 0 {
            self.expanded_queries.fetch_add(1, Ordering::Relaxed);
        }
        self.total_expansion_terms
            .fetch_add(expansion_terms as u64, Ordering::Relaxed);
        self.total_hits.fetch_add(hits as u64, Ordering::Relaxed);
        self.record_time(elapsed);
    }

    /// Record a failed query.
    pub fn record_failed(&self, elapsed: Duration) {
        self.failed_queries.fetch_add(1, Ordering::Relaxed);
        self.record_time(elapsed);
    }

    fn record_time(&self, elapsed: Duration) {
        self.total_query_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);

        let mut bounds = self.bounds.lock();
        bounds.min = bounds.min.min(elapsed);
        bounds.max = bounds.max.max(elapsed);
    }

    /// Get the current metrics snapshot.
    pub fn snapshot(&self) -> BatchMetrics {
        let ranked = self.ranked_queries.load(Ordering::Relaxed);
        let failed = self.failed_queries.load(Ordering::Relaxed);
        let total_nanos = self.total_query_nanos.load(Ordering::Relaxed);
        let finished = ranked + failed;

        let avg_query_time = if finished > 0 {
            Duration::from_nanos(total_nanos / finished)
        } else {
            Duration::ZERO
        };

        let bounds = self.bounds.lock();
        let min_query_time = if bounds.min == Duration::MAX {
            Duration::ZERO
        } else {
            bounds.min
        };

        BatchMetrics {
            ranked_queries: ranked,
            failed_queries: failed,
            expanded_queries: self.expanded_queries.load(Ordering::Relaxed),
            total_expansion_terms: self.total_expansion_terms.load(Ordering::Relaxed),
            total_hits: self.total_hits.load(Ordering::Relaxed),
            avg_query_time,
            max_query_time: bounds.max,
            min_query_time,
            elapsed: self.start_time.elapsed(),
        }
    }
}
