//! Reminder lookahead window and notification text.

use chrono::{Duration, NaiveDate};

use crate::types::Timestamp;

/// Default lookahead for appointment reminders.
pub const DEFAULT_LOOKAHEAD_HOURS: i64 = 24;

/// Title of every reminder notification.
pub const REMINDER_TITLE: &str = "Appointment Reminder";

/// The half-open window `(start, end]` an appointment must fall into to be
/// reminded about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl ReminderWindow {
    pub fn from_now(now: Timestamp, lookahead: Duration) -> Self {
        Self {
            start: now,
            end: now + lookahead,
        }
    }

    /// Calendar days the window touches, for a coarse date-range query.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        (self.start.date_naive(), self.end.date_naive())
    }

    /// Strictly after `start`, at or before `end`.
    pub fn contains(&self, at: Timestamp) -> bool {
        at > self.start && at <= self.end
    }
}

/// Body of the reminder sent to a patient.
pub fn reminder_message(at: Timestamp) -> String {
    format!(
        "Reminder: you have an appointment on {} at {}.",
        at.format("%A, %B %-d, %Y"),
        at.format("%H:%M")
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn at(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 10, h, m, 0).unwrap()
    }

    #[test]
    fn window_excludes_now_and_includes_end() {
        let now = at(9, 0);
        let window = ReminderWindow::from_now(now, Duration::hours(24));

        assert!(!window.contains(now));
        assert!(window.contains(now + Duration::minutes(1)));
        assert!(window.contains(now + Duration::hours(24)));
        assert!(!window.contains(now + Duration::hours(24) + Duration::minutes(1)));
    }

    #[test]
    fn past_appointments_are_outside() {
        let window = ReminderWindow::from_now(at(9, 0), Duration::hours(24));
        assert!(!window.contains(at(8, 0)));
    }

    #[test]
    fn date_range_spans_two_days() {
        let window = ReminderWindow::from_now(at(9, 0), Duration::hours(24));
        let (from, to) = window.date_range();
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2024, 6, 11).unwrap());
    }

    #[test]
    fn message_embeds_formatted_date() {
        assert_eq!(
            reminder_message(at(10, 0)),
            "Reminder: you have an appointment on Monday, June 10, 2024 at 10:00."
        );
    }
}
