//! Services - business logic and state management
//!
//! This module contains the core business logic services:
//! - `wizard` - Three-step booking form state machine
//! - `tracking` - Tracking code lookup capability and the bundled fixture
//! - `bookings` - Booking document casting and creation

pub mod bookings;
pub mod tracking;
pub mod wizard;

// Re-export commonly used types
pub use bookings::{BookingError, BookingField, BookingService};
pub use tracking::{FixtureLookup, LookupError, TrackingLookup};
pub use wizard::{Step, Wizard, WizardError};
