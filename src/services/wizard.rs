//! Three-step booking wizard
//!
//! The wizard is a plain value: every transition borrows the current state and
//! returns the next one, leaving the caller's copy untouched. A rejected
//! transition returns a `WizardError` and the caller keeps the old state.
//!
//! ```text
//! Shipment --next--> Schedule --next--> Contact --submit--> (submitting) --complete--> Complete
//!          <--back--          <--back--         <--reject--
//! ```

use crate::domain::booking::{BookingDraft, BookingPayload, BookingRecord};
use thiserror::Error;

/// Wizard position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Service type and addresses
    Shipment,
    /// Pickup date, slot and package description
    Schedule,
    /// Contact details and summary
    Contact,
    Complete,
}

impl Step {
    /// 1-based position, as shown in the step indicator
    pub fn number(&self) -> u8 {
        match self {
            Step::Shipment => 1,
            Step::Schedule => 2,
            Step::Contact => 3,
            Step::Complete => 4,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Step::Shipment => "Select service type and provide shipping details",
            Step::Schedule => "Schedule pickup date and time",
            Step::Contact => "Provide contact information",
            Step::Complete => "Booking confirmed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("step {} is missing required fields", .0.number())]
    Incomplete(Step),
    #[error("already at the first step")]
    AtFirstStep,
    #[error("the last step is finished by submitting")]
    UseSubmit,
    #[error("a submission is already in flight")]
    AlreadySubmitting,
    #[error("no submission is in flight")]
    NotSubmitting,
    #[error("the booking can no longer be edited")]
    Locked,
}

/// Booking wizard state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wizard {
    step: Step,
    draft: BookingDraft,
    submitting: bool,
    reference: Option<String>,
    last_error: Option<String>,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: Step::Shipment,
            draft: BookingDraft::default(),
            submitting: false,
            reference: None,
            last_error: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_complete(&self) -> bool {
        self.step == Step::Complete
    }

    /// Booking reference, available once the store has accepted the booking
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Reason the most recent submission failed, cleared on the next submit
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply a field edit to the draft
    pub fn edit(&self, f: impl FnOnce(&mut BookingDraft)) -> Result<Self, WizardError> {
        if self.submitting || self.is_complete() {
            return Err(WizardError::Locked);
        }
        let mut next = self.clone();
        f(&mut next.draft);
        Ok(next)
    }

    /// Whether `next` would be accepted from the current step
    pub fn can_advance(&self) -> bool {
        match self.step {
            Step::Shipment => self.draft.shipment_ready(),
            Step::Schedule => self.draft.schedule_ready(),
            Step::Contact | Step::Complete => false,
        }
    }

    pub fn next(&self) -> Result<Self, WizardError> {
        let target = match self.step {
            Step::Shipment => Step::Schedule,
            Step::Schedule => Step::Contact,
            Step::Contact => return Err(WizardError::UseSubmit),
            Step::Complete => return Err(WizardError::Locked),
        };
        if !self.can_advance() {
            return Err(WizardError::Incomplete(self.step));
        }
        Ok(Self { step: target, ..self.clone() })
    }

    pub fn back(&self) -> Result<Self, WizardError> {
        if self.submitting {
            return Err(WizardError::AlreadySubmitting);
        }
        let target = match self.step {
            Step::Shipment => return Err(WizardError::AtFirstStep),
            Step::Schedule => Step::Shipment,
            Step::Contact => Step::Schedule,
            Step::Complete => return Err(WizardError::Locked),
        };
        Ok(Self { step: target, ..self.clone() })
    }

    /// Whether `submit` would be accepted
    pub fn can_submit(&self) -> bool {
        self.step == Step::Contact && !self.submitting && self.draft.contact_ready()
    }

    /// Enter the submitting sub-state and produce the payload to send
    pub fn submit(&self) -> Result<(Self, BookingPayload), WizardError> {
        match self.step {
            Step::Contact => {}
            Step::Complete => return Err(WizardError::Locked),
            other => return Err(WizardError::Incomplete(other)),
        }
        if self.submitting {
            return Err(WizardError::AlreadySubmitting);
        }
        if !self.draft.contact_ready() {
            return Err(WizardError::Incomplete(Step::Contact));
        }
        let payload = self.draft.to_payload();
        let next = Self { submitting: true, last_error: None, ..self.clone() };
        Ok((next, payload))
    }

    /// The store accepted the booking; its id becomes the booking reference
    pub fn complete(&self, record: &BookingRecord) -> Result<Self, WizardError> {
        if !self.submitting {
            return Err(WizardError::NotSubmitting);
        }
        Ok(Self {
            step: Step::Complete,
            submitting: false,
            reference: Some(record.id.clone()),
            last_error: None,
            draft: self.draft.clone(),
        })
    }

    /// The submission failed; stay on the contact step so it can be retried
    pub fn reject(&self, reason: impl Into<String>) -> Result<Self, WizardError> {
        if !self.submitting {
            return Err(WizardError::NotSubmitting);
        }
        Ok(Self { submitting: false, last_error: Some(reason.into()), ..self.clone() })
    }

    /// Lines for the confirmation summary: service name and pickup slot
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let service = self.draft.service_type.map(|s| s.name()).unwrap_or("").to_string();
        let date = self.draft.pickup_date.map(|d| d.to_string()).unwrap_or_default();
        let window = self.draft.pickup_window.map(|w| w.label()).unwrap_or("");
        vec![("Service", service), ("Pickup", format!("{date} ({window})"))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::booking::NewBooking;
    use crate::domain::types::{PickupWindow, ServiceType};
    use chrono::{NaiveDate, Utc};

    fn at_schedule() -> Wizard {
        Wizard::new()
            .edit(|d| {
                d.service_type = Some(ServiceType::Standard);
                d.pickup_address = "1 Dock St".to_string();
                d.delivery_address = "9 Bay Rd".to_string();
            })
            .unwrap()
            .next()
            .unwrap()
    }

    fn at_contact() -> Wizard {
        at_schedule()
            .edit(|d| {
                d.pickup_date = NaiveDate::from_ymd_opt(2025, 3, 20);
                d.pickup_window = Some(PickupWindow::Afternoon);
            })
            .unwrap()
            .next()
            .unwrap()
    }

    fn ready_to_submit() -> Wizard {
        at_contact()
            .edit(|d| {
                d.contact_name = "Ada Park".to_string();
                d.contact_email = "ada@example.com".to_string();
                d.contact_phone = "555-0100".to_string();
            })
            .unwrap()
    }

    fn stored(id: &str) -> BookingRecord {
        NewBooking::default().into_record(id.to_string(), Utc::now())
    }

    #[test]
    fn test_starts_at_shipment_step() {
        let wizard = Wizard::new();
        assert_eq!(wizard.step(), Step::Shipment);
        assert_eq!(wizard.step().number(), 1);
        assert!(!wizard.can_advance());
    }

    #[test]
    fn test_shipment_guard_requires_each_field() {
        let cases: [fn(&mut BookingDraft); 3] = [
            |d| d.service_type = None,
            |d| d.pickup_address.clear(),
            |d| d.delivery_address.clear(),
        ];
        let full = Wizard::new()
            .edit(|d| {
                d.service_type = Some(ServiceType::Express);
                d.pickup_address = "a".to_string();
                d.delivery_address = "b".to_string();
            })
            .unwrap();
        assert!(full.can_advance());

        for clear in cases {
            let partial = full.edit(clear).unwrap();
            assert!(!partial.can_advance());
            assert_eq!(partial.next(), Err(WizardError::Incomplete(Step::Shipment)));
        }
    }

    #[test]
    fn test_whitespace_counts_as_content() {
        let shipment = Wizard::new()
            .edit(|d| {
                d.service_type = Some(ServiceType::Standard);
                d.pickup_address = "   ".to_string();
                d.delivery_address = " ".to_string();
            })
            .unwrap();
        assert!(shipment.can_advance());
        assert_eq!(shipment.next().unwrap().step(), Step::Schedule);

        let contact = at_contact()
            .edit(|d| {
                d.contact_name = " ".to_string();
                d.contact_email = "\t".to_string();
                d.contact_phone = "  ".to_string();
            })
            .unwrap();
        assert!(contact.can_submit());
        let (submitting, payload) = contact.submit().unwrap();
        assert!(submitting.is_submitting());
        assert_eq!(payload.name, " ");
    }

    #[test]
    fn test_schedule_guard() {
        let wizard = at_schedule();
        assert_eq!(wizard.step(), Step::Schedule);
        assert!(!wizard.can_advance());

        let date_only = wizard.edit(|d| d.pickup_date = NaiveDate::from_ymd_opt(2025, 1, 2)).unwrap();
        assert!(!date_only.can_advance());

        let slot_only = wizard.edit(|d| d.pickup_window = Some(PickupWindow::Evening)).unwrap();
        assert!(!slot_only.can_advance());

        // Package details are optional
        let both = date_only.edit(|d| d.pickup_window = Some(PickupWindow::Evening)).unwrap();
        assert!(both.can_advance());
        assert_eq!(both.next().unwrap().step(), Step::Contact);
    }

    #[test]
    fn test_transition_leaves_original_untouched() {
        let wizard = at_schedule();
        let back = wizard.back().unwrap();
        assert_eq!(back.step(), Step::Shipment);
        assert_eq!(wizard.step(), Step::Schedule);
        assert_eq!(back.draft(), wizard.draft());
    }

    #[test]
    fn test_back_from_first_step_is_rejected() {
        assert_eq!(Wizard::new().back(), Err(WizardError::AtFirstStep));
    }

    #[test]
    fn test_next_from_contact_requires_submit() {
        assert_eq!(ready_to_submit().next(), Err(WizardError::UseSubmit));
    }

    #[test]
    fn test_submit_guard() {
        let wizard = at_contact();
        assert!(!wizard.can_submit());
        assert_eq!(wizard.submit().unwrap_err(), WizardError::Incomplete(Step::Contact));

        let no_phone = ready_to_submit().edit(|d| d.contact_phone.clear()).unwrap();
        assert!(!no_phone.can_submit());

        assert!(ready_to_submit().can_submit());
    }

    #[test]
    fn test_submit_produces_payload_and_blocks_resubmit() {
        let (submitting, payload) = ready_to_submit().submit().unwrap();
        assert!(submitting.is_submitting());
        assert!(!submitting.can_submit());
        assert_eq!(payload.name, "Ada Park");
        assert_eq!(payload.date.as_deref(), Some("2025-03-20"));

        assert_eq!(submitting.submit().unwrap_err(), WizardError::AlreadySubmitting);
        assert_eq!(submitting.back(), Err(WizardError::AlreadySubmitting));
        assert_eq!(submitting.edit(|d| d.contact_name.clear()), Err(WizardError::Locked));
    }

    #[test]
    fn test_complete_uses_store_id_as_reference() {
        let (submitting, _) = ready_to_submit().submit().unwrap();
        let done = submitting.complete(&stored("0190f0aa-0000-7000-8000-000000000001")).unwrap();
        assert!(done.is_complete());
        assert_eq!(done.step().number(), 4);
        assert_eq!(done.reference(), Some("0190f0aa-0000-7000-8000-000000000001"));
        assert!(!done.is_submitting());
        assert_eq!(done.back(), Err(WizardError::Locked));
    }

    #[test]
    fn test_complete_without_submit_is_rejected() {
        assert_eq!(ready_to_submit().complete(&stored("x")), Err(WizardError::NotSubmitting));
    }

    #[test]
    fn test_reject_allows_retry() {
        let (submitting, _) = ready_to_submit().submit().unwrap();
        let failed = submitting.reject("connection refused").unwrap();
        assert_eq!(failed.step(), Step::Contact);
        assert_eq!(failed.last_error(), Some("connection refused"));
        assert!(failed.can_submit());

        let (retry, _) = failed.submit().unwrap();
        assert_eq!(retry.last_error(), None);
    }

    #[test]
    fn test_summary() {
        let summary = ready_to_submit().summary();
        assert_eq!(summary[0], ("Service", "Standard Shipping".to_string()));
        assert_eq!(summary[1], ("Pickup", "2025-03-20 (12PM - 4PM)".to_string()));
    }
}
