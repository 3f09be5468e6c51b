//! Booking data model: the wizard draft, the submitted payload, and the stored record

use crate::domain::types::{PickupWindow, ServiceType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// In-progress booking held by the wizard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingDraft {
    pub service_type: Option<ServiceType>,
    pub pickup_address: String,
    pub delivery_address: String,
    pub pickup_date: Option<NaiveDate>,
    pub pickup_window: Option<PickupWindow>,
    pub package_details: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
}

impl BookingDraft {
    /// Service and both addresses are present
    pub fn shipment_ready(&self) -> bool {
        self.service_type.is_some()
            && !self.pickup_address.is_empty()
            && !self.delivery_address.is_empty()
    }

    /// Pickup date and slot are chosen
    pub fn schedule_ready(&self) -> bool {
        self.pickup_date.is_some() && self.pickup_window.is_some()
    }

    /// All contact fields are filled in
    pub fn contact_ready(&self) -> bool {
        !self.contact_name.is_empty()
            && !self.contact_email.is_empty()
            && !self.contact_phone.is_empty()
    }

    /// Map the draft onto the wire payload accepted by `POST /api/bookings`.
    ///
    /// Service type, pickup window and package details are not part of the
    /// stored booking document and are not sent.
    pub fn to_payload(&self) -> BookingPayload {
        BookingPayload {
            name: self.contact_name.clone(),
            email: self.contact_email.clone(),
            phone: self.contact_phone.clone(),
            pickup: self.pickup_address.clone(),
            destination: self.delivery_address.clone(),
            date: self.pickup_date.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// JSON body sent by booking clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPayload {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub pickup: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Booking fields after casting, before the store assigns an identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBooking {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub pickup: Option<String>,
    pub destination: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl NewBooking {
    pub fn into_record(self, id: String, created_at: DateTime<Utc>) -> BookingRecord {
        BookingRecord {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            pickup: self.pickup,
            destination: self.destination,
            date: self.date,
            created_at,
        }
    }
}

/// Persisted booking. Never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_draft() -> BookingDraft {
        BookingDraft {
            service_type: Some(ServiceType::Express),
            pickup_address: "1 Dock St, Seattle, WA".to_string(),
            delivery_address: "9 Bay Rd, Miami, FL".to_string(),
            pickup_date: NaiveDate::from_ymd_opt(2025, 3, 20),
            pickup_window: Some(PickupWindow::Morning),
            package_details: "2 boxes, 10kg".to_string(),
            contact_name: "Ada Park".to_string(),
            contact_email: "ada@example.com".to_string(),
            contact_phone: "555-0100".to_string(),
        }
    }

    #[test]
    fn test_default_draft_is_not_ready() {
        let draft = BookingDraft::default();
        assert!(!draft.shipment_ready());
        assert!(!draft.schedule_ready());
        assert!(!draft.contact_ready());
    }

    #[test]
    fn test_to_payload_maps_fields() {
        let payload = filled_draft().to_payload();
        assert_eq!(payload.name, "Ada Park");
        assert_eq!(payload.email, "ada@example.com");
        assert_eq!(payload.phone, "555-0100");
        assert_eq!(payload.pickup, "1 Dock St, Seattle, WA");
        assert_eq!(payload.destination, "9 Bay Rd, Miami, FL");
        assert_eq!(payload.date.as_deref(), Some("2025-03-20"));
    }

    #[test]
    fn test_record_skips_unset_fields() {
        let record = NewBooking { name: Some("Ada".to_string()), ..Default::default() }
            .into_record("abc".to_string(), Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["name"], "Ada");
        assert!(json.get("email").is_none());
        assert!(json.get("createdAt").is_some());
    }
}
