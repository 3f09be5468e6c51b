//! Prometheus text exposition for `GET /metrics`

use crate::infra::metrics::{MetricsSummary, METRICS_BUCKET_BOUNDS, METRICS_NUM_BUCKETS};
use std::fmt::Write;

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge)
fn write_metric(output: &mut String, name: &str, help: &str, typ: MetricType, val: u64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name} {val}");
}

/// Write a counter split by an `outcome` label
fn write_outcomes(output: &mut String, name: &str, help: &str, outcomes: &[(&str, u64)]) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} counter");
    for (outcome, val) in outcomes {
        let _ = writeln!(output, "{name}{{outcome=\"{outcome}\"}} {val}");
    }
}

/// Write a histogram metric with buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    bounds: &[u64; 10],
    sum: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in bounds.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{le=\"+Inf\"}} {cumulative}");

    let count: u64 = buckets.iter().sum();
    let _ = writeln!(output, "{name}_sum {sum}");
    let _ = writeln!(output, "{name}_count {count}");
}

/// Format metrics in Prometheus text exposition format
pub fn format_prometheus_metrics(summary: &MetricsSummary, bookings_stored: usize) -> String {
    let mut output = String::with_capacity(2048);

    write_metric(
        &mut output,
        "courier_requests_total",
        "Total HTTP requests handled",
        MetricType::Counter,
        summary.requests_total,
    );
    write_histogram(
        &mut output,
        "courier_request_latency_us",
        "Request handling latency in microseconds",
        &summary.lat_buckets,
        &METRICS_BUCKET_BOUNDS,
        summary.latency_sum_us,
    );
    write_metric(
        &mut output,
        "courier_request_latency_p99_us",
        "99th percentile request latency",
        MetricType::Gauge,
        summary.lat_p99_us,
    );

    write_outcomes(
        &mut output,
        "courier_bookings_total",
        "Booking writes by outcome",
        &[("created", summary.bookings_created), ("rejected", summary.bookings_rejected)],
    );
    write_metric(
        &mut output,
        "courier_bookings_stored",
        "Bookings currently held by the store",
        MetricType::Gauge,
        bookings_stored as u64,
    );

    write_outcomes(
        &mut output,
        "courier_tracking_lookups_total",
        "Tracking lookups by outcome",
        &[
            ("found", summary.lookups_found),
            ("not_found", summary.lookups_not_found),
            ("empty", summary.lookups_empty),
        ],
    );

    write_metric(
        &mut output,
        "courier_method_not_allowed_total",
        "Requests rejected with 405",
        MetricType::Counter,
        summary.method_not_allowed,
    );
    write_metric(
        &mut output,
        "courier_payload_too_large_total",
        "Requests rejected with 413",
        MetricType::Counter,
        summary.payload_too_large,
    );

    output
}
