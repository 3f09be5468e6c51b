//! Shared types for the booking desk

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable)
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

/// Shipping service offered by the booking form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Express,
    Standard,
    International,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] =
        [ServiceType::Express, ServiceType::Standard, ServiceType::International];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Express => "express",
            ServiceType::Standard => "standard",
            ServiceType::International => "international",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServiceType::Express => "Express Delivery",
            ServiceType::Standard => "Standard Shipping",
            ServiceType::International => "International Shipping",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ServiceType::Express => "Same-day or next-day delivery for urgent shipments",
            ServiceType::Standard => "2-3 business days delivery time",
            ServiceType::International => "Global shipping with customs clearance support",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "express" => Ok(ServiceType::Express),
            "standard" => Ok(ServiceType::Standard),
            "international" => Ok(ServiceType::International),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Pickup time slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickupWindow {
    Morning,
    Afternoon,
    Evening,
}

impl PickupWindow {
    pub const ALL: [PickupWindow; 3] =
        [PickupWindow::Morning, PickupWindow::Afternoon, PickupWindow::Evening];

    pub fn as_str(&self) -> &'static str {
        match self {
            PickupWindow::Morning => "morning",
            PickupWindow::Afternoon => "afternoon",
            PickupWindow::Evening => "evening",
        }
    }

    /// Human-readable hours for the slot
    pub fn label(&self) -> &'static str {
        match self {
            PickupWindow::Morning => "8AM - 12PM",
            PickupWindow::Afternoon => "12PM - 4PM",
            PickupWindow::Evening => "4PM - 8PM",
        }
    }
}

impl std::str::FromStr for PickupWindow {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(PickupWindow::Morning),
            "afternoon" => Ok(PickupWindow::Afternoon),
            "evening" => Ok(PickupWindow::Evening),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Returned when parsing an enum from an unrecognised string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_type_from_str() {
        assert_eq!("express".parse::<ServiceType>().unwrap(), ServiceType::Express);
        assert_eq!(
            "international".parse::<ServiceType>().unwrap(),
            ServiceType::International
        );
        assert!("overnight".parse::<ServiceType>().is_err());
    }

    #[test]
    fn test_service_type_serde() {
        let json = serde_json::to_string(&ServiceType::Standard).unwrap();
        assert_eq!(json, "\"standard\"");
    }

    #[test]
    fn test_pickup_window_labels() {
        assert_eq!(PickupWindow::Morning.label(), "8AM - 12PM");
        assert_eq!(PickupWindow::Afternoon.label(), "12PM - 4PM");
        assert_eq!(PickupWindow::Evening.label(), "4PM - 8PM");
        assert_eq!("evening".parse::<PickupWindow>().unwrap(), PickupWindow::Evening);
    }

    #[test]
    fn test_uuid_v7_is_unique() {
        assert_ne!(new_uuid_v7(), new_uuid_v7());
    }
}
