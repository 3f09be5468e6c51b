//! Shipment tracking records

use serde::{Deserialize, Serialize};

/// A single scan in a shipment's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub date: String,
    pub time: String,
    pub location: String,
    pub status: String,
}

impl TrackingEvent {
    pub fn new(date: &str, time: &str, location: &str, status: &str) -> Self {
        Self {
            date: date.to_string(),
            time: time.to_string(),
            location: location.to_string(),
            status: status.to_string(),
        }
    }
}

/// Shipment status and history, keyed externally by tracking code.
///
/// `history` is kept in the order it was recorded (oldest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecord {
    pub status: String,
    pub origin: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_by: Option<String>,
    pub history: Vec<TrackingEvent>,
}

impl TrackingRecord {
    pub fn is_delivered(&self) -> bool {
        self.status == "Delivered"
    }

    /// Most recent history entry
    pub fn latest_event(&self) -> Option<&TrackingEvent> {
        self.history.last()
    }
}
