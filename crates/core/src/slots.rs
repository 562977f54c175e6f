//! Slot availability arithmetic.
//!
//! Pure functions over a doctor's shift and the slot labels already held by
//! non-cancelled appointments. Fetching those inputs is the caller's job.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::CoreError;
use crate::shift::Shift;
use crate::types::Timestamp;

/// Format of a slot label (`"09:00"`).
pub const SLOT_LABEL_FORMAT: &str = "%H:%M";

/// How far ahead [`suggestion_dates`] looks for an alternative day.
pub const SUGGESTION_HORIZON_DAYS: u32 = 14;

/// Compute the bookable slots for one doctor on one day.
///
/// - An unavailable doctor has no slots, whatever is booked.
/// - `reclaim` is a slot held by the appointment being rescheduled; it is
///   treated as free so moving an appointment onto its own slot is legal.
/// - Order follows the shift timetable.
pub fn available_slots<S: AsRef<str>>(
    shift: Shift,
    doctor_available: bool,
    booked: &[S],
    reclaim: Option<&str>,
) -> Vec<String> {
    if !doctor_available {
        return Vec::new();
    }

    shift
        .slots()
        .iter()
        .filter(|slot| {
            Some(**slot) == reclaim || !booked.iter().any(|b| b.as_ref() == **slot)
        })
        .map(|slot| (*slot).to_string())
        .collect()
}

/// Check that `label` is a well-formed `HH:MM` time.
pub fn validate_slot_label(label: &str) -> Result<NaiveTime, CoreError> {
    NaiveTime::parse_from_str(label, SLOT_LABEL_FORMAT)
        .map_err(|_| CoreError::Validation(format!("Invalid time '{label}', expected HH:MM")))
}

/// Combine a booking date and slot label into a UTC instant.
pub fn slot_instant(date: NaiveDate, label: &str) -> Result<Timestamp, CoreError> {
    let time = validate_slot_label(label)?;
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Candidate days for a suggested alternative, starting at `from`.
pub fn suggestion_dates(from: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take(SUGGESTION_HORIZON_DAYS as usize)
}
