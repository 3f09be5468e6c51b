//! Tracking code lookup
//!
//! `TrackingLookup` is the capability callers depend on. `FixtureLookup`
//! answers from a bundled table of sample shipments after an artificial
//! delay; `io::client::RemoteLookup` answers over HTTP.

use crate::domain::tracking::{TrackingEvent, TrackingRecord};
use crate::infra::metrics::Metrics;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Lookup failures shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Please enter a tracking number.")]
    EmptyInput,
    #[error("Tracking number not found. Please check and try again.")]
    NotFound,
    /// Remote lookups only
    #[error("tracking service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait TrackingLookup: Send + Sync {
    async fn resolve(&self, code: &str) -> Result<TrackingRecord, LookupError>;
}

/// Static tracking table with simulated latency
pub struct FixtureLookup {
    records: FxHashMap<String, TrackingRecord>,
    latency: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl FixtureLookup {
    pub fn new(records: FxHashMap<String, TrackingRecord>, latency: Duration) -> Self {
        Self { records, latency, metrics: None }
    }

    /// The bundled sample shipments
    pub fn sample(latency: Duration) -> Self {
        Self::new(sample_records(), latency)
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Known tracking codes, sorted
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.records.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    fn lookup(&self, code: &str) -> Result<TrackingRecord, LookupError> {
        if code.trim().is_empty() {
            return Err(LookupError::EmptyInput);
        }
        self.records.get(code).cloned().ok_or(LookupError::NotFound)
    }
}

#[async_trait]
impl TrackingLookup for FixtureLookup {
    async fn resolve(&self, code: &str) -> Result<TrackingRecord, LookupError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let result = self.lookup(code);
        if let Some(metrics) = &self.metrics {
            record_outcome(metrics, &result);
        }
        debug!(code = %code, found = %result.is_ok(), "tracking_lookup");
        result
    }
}

/// Unavailable is a transport failure and has no lookup counter
fn record_outcome(metrics: &Metrics, result: &Result<TrackingRecord, LookupError>) {
    match result {
        Ok(_) => metrics.record_lookup_found(),
        Err(LookupError::NotFound) => metrics.record_lookup_not_found(),
        Err(LookupError::EmptyInput) => metrics.record_lookup_empty(),
        Err(LookupError::Unavailable(_)) => {}
    }
}

fn sample_records() -> FxHashMap<String, TrackingRecord> {
    let mut records = FxHashMap::default();

    records.insert(
        "TRK123456789".to_string(),
        TrackingRecord {
            status: "In Transit".to_string(),
            origin: "New York, NY".to_string(),
            destination: "Los Angeles, CA".to_string(),
            current_location: Some("Denver, CO".to_string()),
            estimated_delivery: Some("March 20, 2025".to_string()),
            delivery_date: None,
            delivery_time: None,
            signed_by: None,
            history: vec![
                TrackingEvent::new("March 15, 2025", "09:30 AM", "New York, NY", "Package picked up"),
                TrackingEvent::new("March 16, 2025", "02:15 PM", "Chicago, IL", "In transit"),
                TrackingEvent::new("March 17, 2025", "10:45 AM", "Denver, CO", "In transit"),
            ],
        },
    );

    records.insert(
        "TRK987654321".to_string(),
        TrackingRecord {
            status: "Delivered".to_string(),
            origin: "Seattle, WA".to_string(),
            destination: "Miami, FL".to_string(),
            current_location: None,
            estimated_delivery: None,
            delivery_date: Some("March 15, 2025".to_string()),
            delivery_time: Some("2:30 PM".to_string()),
            signed_by: Some("John Smith".to_string()),
            history: vec![
                TrackingEvent::new("March 12, 2025", "11:20 AM", "Seattle, WA", "Package picked up"),
                TrackingEvent::new("March 13, 2025", "03:45 PM", "Minneapolis, MN", "In transit"),
                TrackingEvent::new("March 14, 2025", "09:10 AM", "Chicago, IL", "In transit"),
                TrackingEvent::new("March 15, 2025", "08:30 AM", "Atlanta, GA", "Out for delivery"),
                TrackingEvent::new("March 15, 2025", "02:30 PM", "Miami, FL", "Delivered"),
            ],
        },
    );

    records
}
