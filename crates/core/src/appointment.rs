//! Appointment status values and the transition table.
//!
//! A pending booking (`Requested`) and a pending cancellation
//! (`CancellationRequested`) are distinct states. Clients that only know the
//! older vocabulary see both as `Requested` through [`AppointmentStatus::legacy_label`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Patient-initiated booking awaiting admin approval.
    Requested,
    /// Patient asked to cancel a confirmed appointment.
    CancellationRequested,
    Scheduled,
    Rescheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 6] = [
        AppointmentStatus::Requested,
        AppointmentStatus::CancellationRequested,
        AppointmentStatus::Scheduled,
        AppointmentStatus::Rescheduled,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    /// Database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Requested => "requested",
            AppointmentStatus::CancellationRequested => "cancellation_requested",
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Rescheduled => "rescheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Status name in the older single-`Requested` vocabulary.
    pub fn legacy_label(self) -> &'static str {
        match self {
            AppointmentStatus::Requested | AppointmentStatus::CancellationRequested => "Requested",
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Rescheduled => "Rescheduled",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }

    /// States reachable from `self`. Terminal states return an empty slice.
    pub fn valid_transitions(self) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match self {
            Requested => &[Scheduled, Cancelled],
            Scheduled => &[Completed, Cancelled, Rescheduled, CancellationRequested],
            Rescheduled => &[Scheduled, Cancelled, CancellationRequested],
            CancellationRequested => &[Cancelled, Scheduled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition(self, to: AppointmentStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Validate a transition, naming both ends on failure.
    pub fn validate_transition(self, to: AppointmentStatus) -> Result<(), CoreError> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                from: self.as_str(),
                to: to.as_str(),
            })
        }
    }

    pub fn is_terminal(self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Whether the slot this appointment holds counts as booked.
    pub fn holds_slot(self) -> bool {
        self != AppointmentStatus::Cancelled
    }

    /// A patient may ask to cancel only a confirmed appointment.
    pub fn ensure_cancellation_requestable(self) -> Result<(), CoreError> {
        match self {
            AppointmentStatus::Scheduled | AppointmentStatus::Rescheduled => Ok(()),
            other => Err(CoreError::Validation(format!(
                "Cannot request cancellation of an appointment that is {other}"
            ))),
        }
    }

    /// An admin may cancel a confirmed appointment or approve a pending
    /// cancellation. Pending bookings, completed and cancelled appointments
    /// are rejected.
    pub fn ensure_cancellable(self) -> Result<(), CoreError> {
        match self {
            AppointmentStatus::Scheduled
            | AppointmentStatus::Rescheduled
            | AppointmentStatus::CancellationRequested => Ok(()),
            other => Err(CoreError::Validation(format!(
                "Cannot cancel an appointment that is {other}"
            ))),
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppointmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::Validation(format!("Unknown appointment status '{s}'")))
    }
}

impl TryFrom<String> for AppointmentStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::AppointmentStatus::*;
    use super::*;

    // -----------------------------------------------------------------------
    // Valid transitions
    // -----------------------------------------------------------------------

    #[test]
    fn requested_to_scheduled_or_cancelled() {
        assert!(Requested.can_transition(Scheduled));
        assert!(Requested.can_transition(Cancelled));
    }

    #[test]
    fn scheduled_outgoing() {
        assert!(Scheduled.can_transition(Completed));
        assert!(Scheduled.can_transition(Cancelled));
        assert!(Scheduled.can_transition(Rescheduled));
        assert!(Scheduled.can_transition(CancellationRequested));
    }

    #[test]
    fn rescheduled_outgoing() {
        assert!(Rescheduled.can_transition(Scheduled));
        assert!(Rescheduled.can_transition(Cancelled));
    }

    #[test]
    fn pending_cancellation_can_be_approved_or_withdrawn() {
        assert!(CancellationRequested.can_transition(Cancelled));
        assert!(CancellationRequested.can_transition(Scheduled));
    }

    // -----------------------------------------------------------------------
    // Terminal states
    // -----------------------------------------------------------------------

    #[test]
    fn completed_and_cancelled_are_terminal() {
        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        for to in AppointmentStatus::ALL {
            assert!(!Completed.can_transition(to));
            assert!(!Cancelled.can_transition(to));
        }
    }

    // -----------------------------------------------------------------------
    // Invalid transitions
    // -----------------------------------------------------------------------

    #[test]
    fn requested_cannot_complete() {
        assert_matches!(
            Requested.validate_transition(Completed),
            Err(CoreError::InvalidTransition { from: "requested", to: "completed" })
        );
    }

    #[test]
    fn rescheduled_cannot_complete_directly() {
        assert!(!Rescheduled.can_transition(Completed));
    }

    // -----------------------------------------------------------------------
    // Cancellation preconditions
    // -----------------------------------------------------------------------

    #[test]
    fn cancellation_request_only_from_confirmed() {
        assert!(Scheduled.ensure_cancellation_requestable().is_ok());
        assert!(Rescheduled.ensure_cancellation_requestable().is_ok());
        for status in [Requested, CancellationRequested, Completed, Cancelled] {
            assert_matches!(
                status.ensure_cancellation_requestable(),
                Err(CoreError::Validation(_))
            );
        }
    }

    #[test]
    fn direct_cancel_rejects_pending_booking_and_terminal() {
        for status in [Requested, Completed, Cancelled] {
            assert!(status.ensure_cancellable().is_err(), "{status}");
        }
        for status in [Scheduled, Rescheduled, CancellationRequested] {
            assert!(status.ensure_cancellable().is_ok(), "{status}");
        }
    }

    // -----------------------------------------------------------------------
    // Representation
    // -----------------------------------------------------------------------

    #[test]
    fn legacy_label_folds_pending_states() {
        assert_eq!(CancellationRequested.legacy_label(), "Requested");
        assert_eq!(Requested.legacy_label(), "Requested");
        assert_eq!(Scheduled.legacy_label(), "Scheduled");
    }

    #[test]
    fn parse_accepts_legacy_capitalisation() {
        assert_eq!("Scheduled".parse::<AppointmentStatus>().unwrap(), Scheduled);
        assert_eq!(
            "cancellation_requested".parse::<AppointmentStatus>().unwrap(),
            CancellationRequested
        );
        assert!("Pending".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn only_cancelled_releases_the_slot() {
        for status in AppointmentStatus::ALL {
            assert_eq!(status.holds_slot(), status != Cancelled);
        }
    }
}
