//! Domain models - bookings and shipment tracking
//!
//! This module contains the canonical data types used throughout the system:
//! - `BookingDraft` - in-progress booking owned by the wizard
//! - `BookingPayload` - JSON body posted to the bookings endpoint
//! - `BookingRecord` - stored booking with its store-assigned id
//! - `TrackingRecord` - shipment status and scan history
//! - `ServiceType` / `PickupWindow` - enumerated form choices

pub mod booking;
pub mod tracking;
pub mod types;

// Re-export commonly used types at module level
pub use booking::{BookingDraft, BookingPayload, BookingRecord, NewBooking};
pub use tracking::{TrackingEvent, TrackingRecord};
pub use types::{PickupWindow, ServiceType};
