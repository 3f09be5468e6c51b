//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! `report()` swaps the windowed counters to zero for the periodic log line;
//! `snapshot()` reads without resetting and backs the `/metrics` endpoint.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only and must not be used for coordination.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Prometheus-style exponential bucket boundaries (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
const BUCKET_BOUNDS: [u64; 10] = [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
const NUM_BUCKETS: usize = 11;

pub const METRICS_BUCKET_BOUNDS: [u64; 10] = BUCKET_BOUNDS;
pub const METRICS_NUM_BUCKETS: usize = NUM_BUCKETS;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
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

/// Load all bucket values without resetting
#[inline]
fn load_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.load(Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200, 102400];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Total HTTP requests handled (monotonic)
    requests_total: AtomicU64,
    /// Requests since last report (reset on report)
    requests_since_report: AtomicU64,
    /// Sum of request latencies in microseconds (reset on report)
    latency_sum_us: AtomicU64,
    /// Max request latency in microseconds (reset on report)
    latency_max_us: AtomicU64,
    /// Request latency histogram buckets (reset on report)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Bookings written to the store (monotonic)
    bookings_created: AtomicU64,
    /// Booking writes rejected by casting, validation or the store (monotonic)
    bookings_rejected: AtomicU64,
    /// Tracking lookups that found a shipment (monotonic)
    lookups_found: AtomicU64,
    /// Tracking lookups for unknown codes (monotonic)
    lookups_not_found: AtomicU64,
    /// Tracking lookups with a blank code (monotonic)
    lookups_empty: AtomicU64,
    /// Requests answered with 405 (monotonic)
    method_not_allowed: AtomicU64,
    /// Requests answered with 413 (monotonic)
    payload_too_large: AtomicU64,
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_since_report: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            bookings_created: AtomicU64::new(0),
            bookings_rejected: AtomicU64::new(0),
            lookups_found: AtomicU64::new(0),
            lookups_not_found: AtomicU64::new(0),
            lookups_empty: AtomicU64::new(0),
            method_not_allowed: AtomicU64::new(0),
            payload_too_large: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record a handled request with its latency (lock-free)
    #[inline]
    pub fn record_request(&self, latency_us: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.requests_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);

        let bucket = bucket_index(latency_us);
        self.latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);

        update_atomic_max(&self.latency_max_us, latency_us);
    }

    #[inline]
    pub fn record_booking_created(&self) {
        self.bookings_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_booking_rejected(&self) {
        self.bookings_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_lookup_found(&self) {
        self.lookups_found.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_lookup_not_found(&self) {
        self.lookups_not_found.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_lookup_empty(&self) {
        self.lookups_empty.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_method_not_allowed(&self) {
        self.method_not_allowed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_payload_too_large(&self) {
        self.payload_too_large.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total requests handled
    #[inline]
    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Build a summary and reset the windowed counters
    pub fn report(&self) -> MetricsSummary {
        let now = Instant::now();
        let elapsed_secs = {
            let mut last = self.last_report_time.lock();
            let secs = now.duration_since(*last).as_secs_f64();
            *last = now;
            secs
        };

        let window_requests = self.requests_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        let latency_max = self.latency_max_us.swap(0, Ordering::Relaxed);
        let buckets = swap_buckets(&self.latency_buckets);

        self.summarize(window_requests, latency_sum, latency_max, buckets, elapsed_secs)
    }

    /// Build a summary without resetting anything
    pub fn snapshot(&self) -> MetricsSummary {
        let elapsed_secs = self.last_report_time.lock().elapsed().as_secs_f64();
        self.summarize(
            self.requests_since_report.load(Ordering::Relaxed),
            self.latency_sum_us.load(Ordering::Relaxed),
            self.latency_max_us.load(Ordering::Relaxed),
            load_buckets(&self.latency_buckets),
            elapsed_secs,
        )
    }

    fn summarize(
        &self,
        window_requests: u64,
        latency_sum: u64,
        latency_max: u64,
        buckets: [u64; NUM_BUCKETS],
        elapsed_secs: f64,
    ) -> MetricsSummary {
        let requests_per_sec =
            if elapsed_secs > 0.0 { window_requests as f64 / elapsed_secs } else { 0.0 };
        let avg_latency_us = if window_requests > 0 { latency_sum / window_requests } else { 0 };

        MetricsSummary {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_per_sec,
            avg_latency_us,
            latency_sum_us: latency_sum,
            max_latency_us: latency_max,
            lat_buckets: buckets,
            lat_p50_us: percentile_from_buckets(&buckets, 0.50),
            lat_p95_us: percentile_from_buckets(&buckets, 0.95),
            lat_p99_us: percentile_from_buckets(&buckets, 0.99),
            bookings_created: self.bookings_created.load(Ordering::Relaxed),
            bookings_rejected: self.bookings_rejected.load(Ordering::Relaxed),
            lookups_found: self.lookups_found.load(Ordering::Relaxed),
            lookups_not_found: self.lookups_not_found.load(Ordering::Relaxed),
            lookups_empty: self.lookups_empty.load(Ordering::Relaxed),
            method_not_allowed: self.method_not_allowed.load(Ordering::Relaxed),
            payload_too_large: self.payload_too_large.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics view
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub requests_total: u64,
    pub requests_per_sec: f64,
    pub avg_latency_us: u64,
    /// Exact sum of request latencies in the window
    pub latency_sum_us: u64,
    pub max_latency_us: u64,
    pub lat_buckets: [u64; NUM_BUCKETS],
    pub lat_p50_us: u64,
    pub lat_p95_us: u64,
    pub lat_p99_us: u64,
    pub bookings_created: u64,
    pub bookings_rejected: u64,
    pub lookups_found: u64,
    pub lookups_not_found: u64,
    pub lookups_empty: u64,
    pub method_not_allowed: u64,
    pub payload_too_large: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            requests_total = %self.requests_total,
            requests_per_sec = %format!("{:.2}", self.requests_per_sec),
            avg_latency_us = %self.avg_latency_us,
            max_latency_us = %self.max_latency_us,
            lat_p99_us = %self.lat_p99_us,
            bookings_created = %self.bookings_created,
            bookings_rejected = %self.bookings_rejected,
            lookups_found = %self.lookups_found,
            lookups_not_found = %self.lookups_not_found,
            "metrics"
        );
    }
}
