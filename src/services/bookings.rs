//! Booking creation: maps a JSON document onto the booking fields and stores it
//!
//! Casting rules per field:
//! - text fields accept strings as-is; numbers and booleans are stringified;
//!   `null` or absent leaves the field unset; arrays and objects are rejected
//! - `date` accepts RFC 3339, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.fff]`,
//!   RFC 2822, written-out dates (`March 20, 2025`, `2025/03/20`, `03/20/2025`,
//!   `Thu Mar 20 2025`) or epoch milliseconds as a number or numeric string;
//!   `null`, absent or blank leaves it unset
//!
//! Unknown fields are dropped. No field is required unless configured.

use crate::domain::booking::{BookingRecord, NewBooking};
use crate::infra::metrics::Metrics;
use crate::io::store::{BookingStore, StoreError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Named fields of a booking document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingField {
    Name,
    Email,
    Phone,
    Pickup,
    Destination,
    Date,
}

impl BookingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingField::Name => "name",
            BookingField::Email => "email",
            BookingField::Phone => "phone",
            BookingField::Pickup => "pickup",
            BookingField::Destination => "destination",
            BookingField::Date => "date",
        }
    }

    fn is_missing(&self, booking: &NewBooking) -> bool {
        let text = match self {
            BookingField::Name => &booking.name,
            BookingField::Email => &booking.email,
            BookingField::Phone => &booking.phone,
            BookingField::Pickup => &booking.pickup,
            BookingField::Destination => &booking.destination,
            BookingField::Date => return booking.date.is_none(),
        };
        text.as_deref().map_or(true, str::is_empty)
    }
}

/// Reasons a booking write is refused. All surface to the client as a write failure.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(String),
    #[error("booking payload must be a JSON object")]
    NotAnObject,
    #[error("Cast to {kind} failed for value {value} at path \"{path}\"")]
    Cast { kind: &'static str, path: &'static str, value: String },
    #[error("Path `{0}` is required.")]
    Required(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Creates bookings in the configured store
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    required_fields: Vec<BookingField>,
    metrics: Arc<Metrics>,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>, metrics: Arc<Metrics>) -> Self {
        Self { store, required_fields: Vec::new(), metrics }
    }

    pub fn with_required_fields(mut self, fields: Vec<BookingField>) -> Self {
        self.required_fields = fields;
        self
    }

    pub fn store(&self) -> &Arc<dyn BookingStore> {
        &self.store
    }

    /// Parse a raw request body and store the booking
    pub fn create(&self, body: &[u8]) -> Result<BookingRecord, BookingError> {
        let result = serde_json::from_slice::<Value>(body)
            .map_err(|e| BookingError::InvalidJson(e.to_string()))
            .and_then(|value| self.insert(&value));

        match &result {
            Ok(record) => {
                self.metrics.record_booking_created();
                info!(id = %record.id, has_date = %record.date.is_some(), "booking_created");
            }
            Err(e) => {
                self.metrics.record_booking_rejected();
                warn!(error = %e, "booking_rejected");
            }
        }
        result
    }

    fn insert(&self, value: &Value) -> Result<BookingRecord, BookingError> {
        let booking = cast_document(value)?;
        if let Some(field) = self.required_fields.iter().find(|f| f.is_missing(&booking)) {
            return Err(BookingError::Required(field.as_str()));
        }
        Ok(self.store.insert(booking)?)
    }
}

/// Cast a JSON document onto the booking fields
pub fn cast_document(value: &Value) -> Result<NewBooking, BookingError> {
    let Value::Object(doc) = value else {
        return Err(BookingError::NotAnObject);
    };

    Ok(NewBooking {
        name: cast_text(doc, BookingField::Name)?,
        email: cast_text(doc, BookingField::Email)?,
        phone: cast_text(doc, BookingField::Phone)?,
        pickup: cast_text(doc, BookingField::Pickup)?,
        destination: cast_text(doc, BookingField::Destination)?,
        date: cast_date(doc)?,
    })
}

fn cast_text(doc: &Map<String, Value>, field: BookingField) -> Result<Option<String>, BookingError> {
    match doc.get(field.as_str()) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(number_text(n))),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => {
            Err(BookingError::Cast { kind: "string", path: field.as_str(), value: other.to_string() })
        }
    }
}

/// Integral floats print without a fraction (`5550100.0` -> `5550100`)
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => {
            if f == 0.0 {
                "0".to_string()
            } else {
                format!("{f:.0}")
            }
        }
        _ => n.to_string(),
    }
}

fn from_epoch_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(ms.trunc() as i64)
}

fn cast_date(doc: &Map<String, Value>) -> Result<Option<DateTime<Utc>>, BookingError> {
    let path = BookingField::Date.as_str();
    let parsed = match doc.get(path) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => parse_date(s),
        Some(Value::Number(n)) => n.as_f64().and_then(from_epoch_millis),
        Some(_) => None,
    };

    match parsed {
        Some(date) => Ok(Some(date)),
        None => Err(BookingError::Cast {
            kind: "date",
            path,
            value: doc.get(path).map(Value::to_string).unwrap_or_default(),
        }),
    }
}

/// Parse the date formats booking clients send
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();

    // Numeric strings outside the plausible year range are epoch milliseconds
    if let Ok(ms) = s.parse::<f64>() {
        if !(-271_820.0..275_761.0).contains(&ms) {
            return from_epoch_millis(ms);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }
    // Human-written dates: "March 20, 2025", "2025/03/20", "03/20/2025", "Thu Mar 20 2025"
    for format in ["%B %d, %Y", "%b %d %Y", "%Y/%m/%d", "%m/%d/%Y", "%a %b %d %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    DateTime::parse_from_rfc2822(s).ok().map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::MemoryStore;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn service() -> BookingService {
        BookingService::new(Arc::new(MemoryStore::new()), Arc::new(Metrics::new()))
    }

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_create_well_formed_booking() {
        let service = service();
        let record = service
            .create(&body(json!({
                "name": "Ada Park",
                "email": "ada@example.com",
                "phone": "555-0100",
                "pickup": "1 Dock St",
                "destination": "9 Bay Rd",
                "date": "2025-03-20"
            })))
            .unwrap();

        assert_eq!(record.name.as_deref(), Some("Ada Park"));
        assert_eq!(record.destination.as_deref(), Some("9 Bay Rd"));
        let date = record.date.unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2025, 3, 20));
        assert!(!record.id.is_empty());
        assert_eq!(service.store().len(), 1);
    }

    #[test]
    fn test_identical_payloads_create_separate_records() {
        let service = service();
        let payload = body(json!({"name": "Ada", "email": "ada@example.com"}));
        let a = service.create(&payload).unwrap();
        let b = service.create(&payload).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(service.store().len(), 2);
    }

    #[test]
    fn test_empty_object_is_accepted() {
        let record = service().create(b"{}").unwrap();
        assert_eq!(record.name, None);
        assert_eq!(record.date, None);
    }

    #[test]
    fn test_scalars_are_stringified_and_unknown_fields_dropped() {
        let booking =
            cast_document(&json!({"phone": 5550100, "name": true, "color": "red"})).unwrap();
        assert_eq!(booking.phone.as_deref(), Some("5550100"));
        assert_eq!(booking.name.as_deref(), Some("true"));
    }

    #[test]
    fn test_integral_floats_stringify_without_fraction() {
        let booking =
            cast_document(&json!({"phone": 5550100.0, "pickup": 12.5, "email": 0.0})).unwrap();
        assert_eq!(booking.phone.as_deref(), Some("5550100"));
        assert_eq!(booking.pickup.as_deref(), Some("12.5"));
        assert_eq!(booking.email.as_deref(), Some("0"));
    }

    #[test]
    fn test_object_field_is_a_cast_error() {
        let err = service().create(&body(json!({"name": {"first": "Ada"}}))).unwrap_err();
        assert!(matches!(err, BookingError::Cast { kind: "string", path: "name", .. }));
        assert!(err.to_string().contains("at path \"name\""));
    }

    #[test]
    fn test_unparseable_date_is_a_cast_error() {
        let err = service().create(&body(json!({"date": "next tuesday"}))).unwrap_err();
        assert!(matches!(err, BookingError::Cast { kind: "date", .. }));
    }

    #[test]
    fn test_invalid_bodies() {
        let service = service();
        assert!(matches!(service.create(b"not json"), Err(BookingError::InvalidJson(_))));
        assert!(matches!(service.create(b"[1,2]"), Err(BookingError::NotAnObject)));
        assert!(service.store().is_empty());
    }

    #[test]
    fn test_required_fields() {
        let service = service().with_required_fields(vec![BookingField::Name, BookingField::Date]);

        let err = service.create(&body(json!({"name": "", "date": "2025-01-01"}))).unwrap_err();
        assert_eq!(err.to_string(), "Path `name` is required.");

        let err = service.create(&body(json!({"name": "Ada"}))).unwrap_err();
        assert_eq!(err.to_string(), "Path `date` is required.");

        assert!(service.create(&body(json!({"name": "Ada", "date": "2025-01-01"}))).is_ok());
    }

    #[test]
    fn test_parse_date_formats() {
        let rfc3339 = parse_date("2025-03-15T14:30:00Z").unwrap();
        assert_eq!(rfc3339.hour(), 14);

        let offset = parse_date("2025-03-15T14:30:00+02:00").unwrap();
        assert_eq!(offset.hour(), 12);

        let plain = parse_date("2025-03-15").unwrap();
        assert_eq!((plain.day(), plain.hour()), (15, 0));

        assert!(parse_date("2025-03-15T08:15:00.250").is_some());
        assert!(parse_date("Sat, 15 Mar 2025 14:30:00 +0000").is_some());
        assert!(parse_date("2025-13-45").is_none());
    }

    #[test]
    fn test_written_out_dates() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        for input in [
            "March 20, 2025",
            "Mar 20, 2025",
            "Mar 20 2025",
            "2025/03/20",
            "03/20/2025",
            "Thu Mar 20 2025",
        ] {
            let booking = cast_document(&json!({ "date": input }))
                .unwrap_or_else(|e| panic!("{input}: {e}"));
            let date = booking.date.unwrap();
            assert_eq!(date.date_naive(), expected, "{input}");
            assert_eq!(date.hour(), 0, "{input}");
        }
    }

    #[test]
    fn test_epoch_millis_as_float_and_string() {
        let booking = cast_document(&json!({"date": 1742000000000.0})).unwrap();
        assert_eq!(booking.date.unwrap().timestamp_millis(), 1742000000000);

        let booking = cast_document(&json!({"date": "1742000000000"})).unwrap();
        assert_eq!(booking.date.unwrap().timestamp_millis(), 1742000000000);

        assert!(parse_date("2025").is_none());
    }

    #[test]
    fn test_epoch_millis_and_blank_dates() {
        let booking = cast_document(&json!({"date": 1742000000000i64})).unwrap();
        assert_eq!(booking.date.unwrap().timestamp_millis(), 1742000000000);

        let booking = cast_document(&json!({"date": "  "})).unwrap();
        assert_eq!(booking.date, None);
    }

    #[test]
    fn test_metrics_count_outcomes() {
        let metrics = Arc::new(Metrics::new());
        let service = BookingService::new(Arc::new(MemoryStore::new()), metrics.clone());
        service.create(b"{}").unwrap();
        let _ = service.create(b"[]");

        let summary = metrics.snapshot();
        assert_eq!(summary.bookings_created, 1);
        assert_eq!(summary.bookings_rejected, 1);
    }
}
