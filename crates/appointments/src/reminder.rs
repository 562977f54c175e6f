//! Appointment reminder scheduler.
//!
//! [`ReminderScheduler`] runs as a background task. Each tick it finds
//! scheduled appointments starting within the lookahead window and creates
//! one in-app notification per appointment for the patient. The
//! `reminder_sent` flag is claimed before notifying, so overlapping sweeps
//! never remind twice; a failed notification releases the claim for the
//! next tick.

use std::sync::Arc;
use std::time::Duration;

use hms_core::clock::Clock;
use hms_core::error::CoreError;
use hms_core::reminder::{reminder_message, ReminderWindow, DEFAULT_LOOKAHEAD_HOURS, REMINDER_TITLE};
use hms_db::models::appointment::Appointment;
use tokio_util::sync::CancellationToken;

use crate::error::{ServiceResult, StoreError};
use crate::store::Stores;

/// Default time between sweeps.
const DEFAULT_INTERVAL_SECS: u64 = 3600;

/// Scheduler timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderConfig {
    pub interval: Duration,
    pub lookahead: chrono::Duration,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            lookahead: chrono::Duration::hours(DEFAULT_LOOKAHEAD_HOURS),
        }
    }
}

impl ReminderConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `REMINDER_INTERVAL_SECS`   | `3600`  |
    /// | `REMINDER_LOOKAHEAD_HOURS` | `24`    |
    pub fn from_env() -> Self {
        let interval_secs: u64 = std::env::var("REMINDER_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        let lookahead_hours: i64 = std::env::var("REMINDER_LOOKAHEAD_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|hours| *hours > 0)
            .unwrap_or(DEFAULT_LOOKAHEAD_HOURS);

        Self {
            interval: Duration::from_secs(interval_secs),
            lookahead: chrono::Duration::hours(lookahead_hours),
        }
    }
}

/// Counts from one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Scheduled appointments starting inside the window.
    pub candidates: usize,
    pub sent: usize,
    /// Already reminded, by this or another sweep.
    pub skipped: usize,
    pub failed: usize,
}

pub struct ReminderScheduler {
    stores: Stores,
    clock: Arc<dyn Clock>,
    config: ReminderConfig,
}

impl ReminderScheduler {
    pub fn new(stores: Stores, clock: Arc<dyn Clock>, config: ReminderConfig) -> Self {
        Self {
            stores,
            clock,
            config,
        }
    }

    /// Run the reminder loop until `cancel` fires.
    ///
    /// The first sweep runs immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            lookahead_hours = self.config.lookahead.num_hours(),
            "Reminder scheduler started"
        );

        let mut interval = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Reminder scheduler stopping");
                    break;
                }
                _ = interval.tick() => {
                    match self.sweep().await {
                        Ok(report) if report.candidates > 0 => {
                            tracing::info!(
                                candidates = report.candidates,
                                sent = report.sent,
                                skipped = report.skipped,
                                failed = report.failed,
                                "Reminder sweep complete"
                            );
                        }
                        Ok(_) => tracing::debug!("Reminder sweep: nothing due"),
                        Err(e) => tracing::error!(error = %e, "Reminder sweep failed"),
                    }
                }
            }
        }
    }

    /// One pass over the lookahead window.
    pub async fn sweep(&self) -> Result<SweepReport, StoreError> {
        let window = ReminderWindow::from_now(self.clock.now(), self.config.lookahead);
        let (from, to) = window.date_range();
        let scheduled = self
            .stores
            .appointments
            .list_scheduled_between(from, to)
            .await?;

        let mut report = SweepReport::default();
        for appointment in &scheduled {
            let starts_at = match appointment.starts_at() {
                Ok(at) => at,
                Err(e) => {
                    tracing::warn!(appointment_id = appointment.id, error = %e, "Skipping appointment with bad time");
                    continue;
                }
            };
            if !window.contains(starts_at) {
                continue;
            }

            report.candidates += 1;
            if appointment.reminder_sent {
                report.skipped += 1;
                continue;
            }

            match self.remind(appointment, starts_at).await {
                Ok(true) => report.sent += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(appointment_id = appointment.id, error = %e, "Failed to send reminder");
                }
            }
        }

        Ok(report)
    }

    /// Claim and notify. `Ok(false)` when another sweep already claimed it.
    async fn remind(
        &self,
        appointment: &Appointment,
        starts_at: hms_core::types::Timestamp,
    ) -> ServiceResult<bool> {
        if !self.stores.appointments.claim_reminder(appointment.id).await? {
            return Ok(false);
        }

        let delivered = self.notify(appointment, starts_at).await;
        if delivered.is_err() {
            if let Err(e) = self.stores.appointments.release_reminder(appointment.id).await {
                tracing::error!(appointment_id = appointment.id, error = %e, "Failed to release reminder claim");
            }
        }
        delivered.map(|_| true)
    }

    async fn notify(
        &self,
        appointment: &Appointment,
        starts_at: hms_core::types::Timestamp,
    ) -> ServiceResult<()> {
        let patient = self
            .stores
            .directory
            .find_patient(appointment.patient_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Patient", appointment.patient_id))?;

        let notification_id = self
            .stores
            .notifications
            .create(patient.user_id, REMINDER_TITLE, &reminder_message(starts_at))
            .await?;

        tracing::info!(
            appointment_id = appointment.id,
            user_id = patient.user_id,
            notification_id,
            "Reminder sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use hms_core::appointment::AppointmentStatus;
    use hms_core::clock::ManualClock;
    use hms_core::shift::Shift;
    use hms_core::types::DbId;

    use super::*;
    use crate::testing::InMemoryStore;

    const PATIENT_USER: DbId = 500;

    struct Fixture {
        store: Arc<InMemoryStore>,
        clock: Arc<ManualClock>,
        scheduler: ReminderScheduler,
        doctor_id: DbId,
        patient_id: DbId,
    }

    /// Clock starts at 2024-06-10 10:00 UTC.
    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let doctor_id = store.add_doctor("Dr. Grey", Shift::Night, true).id;
        let patient_id = store.add_patient(PATIENT_USER, "Pat").id;
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 10, 10, 0, 0).unwrap()));
        let scheduler = ReminderScheduler::new(
            Stores::shared(store.clone()),
            clock.clone(),
            ReminderConfig::default(),
        );
        Fixture {
            store,
            clock,
            scheduler,
            doctor_id,
            patient_id,
        }
    }

    fn schedule(f: &Fixture, day: u32, time: &str, status: AppointmentStatus) -> Appointment {
        f.store.add_appointment(
            f.patient_id,
            f.doctor_id,
            NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            time,
            status,
        )
    }

    #[tokio::test]
    async fn reminds_only_within_window() {
        let f = fixture();
        let due_today = schedule(&f, 10, "18:00", AppointmentStatus::Scheduled);
        let due_tomorrow = schedule(&f, 11, "09:00", AppointmentStatus::Scheduled);
        let too_late = schedule(&f, 11, "19:00", AppointmentStatus::Scheduled);
        let past = schedule(&f, 10, "09:00", AppointmentStatus::Scheduled);

        let report = f.scheduler.sweep().await.unwrap();

        assert_eq!(report.candidates, 2);
        assert_eq!(report.sent, 2);
        assert!(f.store.appointment(due_today.id).unwrap().reminder_sent);
        assert!(f.store.appointment(due_tomorrow.id).unwrap().reminder_sent);
        assert!(!f.store.appointment(too_late.id).unwrap().reminder_sent);
        assert!(!f.store.appointment(past.id).unwrap().reminder_sent);
    }

    #[tokio::test]
    async fn window_end_is_inclusive_and_start_exclusive() {
        let f = fixture();
        let at_end = schedule(&f, 11, "10:00", AppointmentStatus::Scheduled);
        let at_start = schedule(&f, 10, "10:00", AppointmentStatus::Scheduled);

        f.scheduler.sweep().await.unwrap();

        assert!(f.store.appointment(at_end.id).unwrap().reminder_sent);
        assert!(!f.store.appointment(at_start.id).unwrap().reminder_sent);
    }

    #[tokio::test]
    async fn message_names_date_and_time() {
        let f = fixture();
        schedule(&f, 10, "18:00", AppointmentStatus::Scheduled);

        f.scheduler.sweep().await.unwrap();

        let notifications = f.store.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].user_id, PATIENT_USER);
        assert_eq!(notifications[0].title, "Appointment Reminder");
        assert_eq!(
            notifications[0].message,
            "Reminder: you have an appointment on Monday, June 10, 2024 at 18:00."
        );
    }

    #[tokio::test]
    async fn repeated_sweeps_remind_once() {
        let f = fixture();
        schedule(&f, 10, "18:00", AppointmentStatus::Scheduled);

        let first = f.scheduler.sweep().await.unwrap();
        f.clock.advance(chrono::Duration::hours(1));
        let second = f.scheduler.sweep().await.unwrap();

        assert_eq!(first.sent, 1);
        assert_eq!(second.sent, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(f.store.notifications().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_sweeps_remind_once() {
        let f = fixture();
        schedule(&f, 10, "18:00", AppointmentStatus::Scheduled);

        let (a, b) = tokio::join!(f.scheduler.sweep(), f.scheduler.sweep());

        assert_eq!(a.unwrap().sent + b.unwrap().sent, 1);
        assert_eq!(f.store.notifications().len(), 1);
    }

    #[tokio::test]
    async fn only_scheduled_appointments_are_reminded() {
        let f = fixture();
        for status in [
            AppointmentStatus::Requested,
            AppointmentStatus::Rescheduled,
            AppointmentStatus::CancellationRequested,
            AppointmentStatus::Cancelled,
        ] {
            schedule(&f, 10, "19:00", status);
        }

        let report = f.scheduler.sweep().await.unwrap();

        assert_eq!(report, SweepReport::default());
        assert!(f.store.notifications().is_empty());
    }

    #[tokio::test]
    async fn failed_notification_releases_claim_and_continues() {
        let f = fixture();
        let failing_patient = f.store.add_patient(777, "Unlucky").id;
        let failing = f.store.add_appointment(
            failing_patient,
            f.doctor_id,
            NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            "18:00",
            AppointmentStatus::Scheduled,
        );
        let ok = schedule(&f, 10, "19:00", AppointmentStatus::Scheduled);
        f.store.fail_notifications_for(777);

        let report = f.scheduler.sweep().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, 1);
        assert!(!f.store.appointment(failing.id).unwrap().reminder_sent);
        assert!(f.store.appointment(ok.id).unwrap().reminder_sent);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let f = fixture();
        schedule(&f, 10, "18:00", AppointmentStatus::Scheduled);
        let cancel = CancellationToken::new();

        let stopper = cancel.clone();
        let run = f.scheduler.run(cancel);
        let stop = async {
            for _ in 0..200 {
                if !f.store.notifications().is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            stopper.cancel();
        };
        tokio::join!(run, stop);

        assert_eq!(f.store.notifications().len(), 1);
    }

    #[test]
    fn config_defaults_to_hourly_with_a_day_of_lookahead() {
        let config = ReminderConfig::default();
        assert_eq!(config.interval, Duration::from_secs(3600));
        assert_eq!(config.lookahead, chrono::Duration::hours(24));
    }
}
