//! Appointment entity model and DTOs.

use chrono::NaiveDate;
use hms_core::appointment::AppointmentStatus;
use hms_core::error::CoreError;
use hms_core::slots::slot_instant;
use hms_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `appointments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Appointment {
    pub id: DbId,
    pub patient_id: DbId,
    pub doctor_id: DbId,
    pub date: NaiveDate,
    pub time: String,
    #[sqlx(try_from = "String")]
    pub status: AppointmentStatus,
    pub reminder_sent: bool,
    pub cancellation_reason: Option<String>,
    pub cancellation_requested_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Appointment {
    /// The instant this appointment starts (date + slot label, UTC).
    pub fn starts_at(&self) -> Result<Timestamp, CoreError> {
        slot_instant(self.date, &self.time)
    }
}

/// DTO for inserting an appointment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointment {
    pub patient_id: DbId,
    pub doctor_id: DbId,
    pub date: NaiveDate,
    pub time: String,
    pub status: AppointmentStatus,
}

/// Partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAppointment {
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub reminder_sent: Option<bool>,
}

impl UpdateAppointment {
    /// Whether this update moves the appointment to another date or slot.
    pub fn moves_slot(&self, current: &Appointment) -> bool {
        self.date.is_some_and(|d| d != current.date)
            || self.time.as_deref().is_some_and(|t| t != current.time)
    }
}

/// Filters for listing appointments. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    pub patient_id: Option<DbId>,
    pub doctor_id: Option<DbId>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
}
