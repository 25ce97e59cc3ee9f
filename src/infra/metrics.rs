//! Lock-free route request metrics and periodic reporting
//!
//! Counter updates are atomic; `report()` swaps the windowed values out.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only. Do NOT use them for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Round-trip latency bucket boundaries (milliseconds)
/// Buckets: ≤25, ≤50, ≤100, ≤250, ≤500, ≤1000, ≤2500, ≤5000, ≤10000, >10000
const BUCKET_BOUNDS: [u64; 9] = [25, 50, 100, 250, 500, 1000, 2500, 5000, 10_000];
const NUM_BUCKETS: usize = 10;

#[inline]
fn bucket_index(latency_ms: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_ms)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Route client metrics
pub struct Metrics {
    /// Requests sent to the routing service (monotonic)
    requests_total: AtomicU64,
    /// Requests that returned usable paths (monotonic)
    requests_succeeded: AtomicU64,
    /// Requests that failed with unavailable/protocol errors (monotonic)
    requests_failed: AtomicU64,
    /// Requests abandoned by a new journey (monotonic)
    requests_aborted: AtomicU64,
    /// Responses discarded because a newer request or journey superseded them
    responses_stale: AtomicU64,
    /// Site ids dropped from geometry because the registry lacks them
    geometry_gaps: AtomicU64,
    /// Round-trip latency histogram (reset on report)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    latency_sum_ms: AtomicU64,
    latency_max_ms: AtomicU64,
    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_succeeded: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            requests_aborted: AtomicU64::new(0),
            responses_stale: AtomicU64::new(0),
            geometry_gaps: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            latency_sum_ms: AtomicU64::new(0),
            latency_max_ms: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    #[inline]
    pub fn record_request_sent(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed round trip with its latency
    #[inline]
    pub fn record_request_succeeded(&self, latency_ms: u64) {
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.latency_buckets[bucket_index(latency_ms)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_ms, latency_ms);
    }

    #[inline]
    pub fn record_request_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_request_aborted(&self) {
        self.requests_aborted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_stale_response(&self) {
        self.responses_stale.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_geometry_gaps(&self, dropped: usize) {
        self.geometry_gaps.fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn responses_stale(&self) -> u64 {
        self.responses_stale.load(Ordering::Relaxed)
    }

    /// Snapshot all counters and reset the latency window
    pub fn report(&self) -> MetricsSummary {
        let latency_buckets = swap_buckets(&self.latency_buckets);
        let latency_sum_ms = self.latency_sum_ms.swap(0, Ordering::Relaxed);
        let latency_max_ms = self.latency_max_ms.swap(0, Ordering::Relaxed);
        let window_count: u64 = latency_buckets.iter().sum();
        let avg_latency_ms = if window_count > 0 { latency_sum_ms / window_count } else { 0 };

        MetricsSummary {
            uptime_secs: self.started_at.elapsed().as_secs(),
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            requests_aborted: self.requests_aborted.load(Ordering::Relaxed),
            responses_stale: self.responses_stale.load(Ordering::Relaxed),
            geometry_gaps: self.geometry_gaps.load(Ordering::Relaxed),
            latency_buckets,
            avg_latency_ms,
            max_latency_ms: latency_max_ms,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub uptime_secs: u64,
    pub requests_total: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub requests_aborted: u64,
    pub responses_stale: u64,
    pub geometry_gaps: u64,
    pub latency_buckets: [u64; NUM_BUCKETS],
    pub avg_latency_ms: u64,
    pub max_latency_ms: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            uptime_secs = %self.uptime_secs,
            requests_total = %self.requests_total,
            requests_succeeded = %self.requests_succeeded,
            requests_failed = %self.requests_failed,
            requests_aborted = %self.requests_aborted,
            responses_stale = %self.responses_stale,
            geometry_gaps = %self.geometry_gaps,
            avg_latency_ms = %self.avg_latency_ms,
            max_latency_ms = %self.max_latency_ms,
            "route_metrics"
        );
    }
}
