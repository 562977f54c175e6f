//! Repository for the `appointments` table.
//!
//! Status values are written through [`AppointmentStatus::as_str`]; no status
//! literal appears in SQL except the `cancelled` exclusion mirrored by the
//! `uq_appointments_active_slot` partial index.

use chrono::NaiveDate;
use hms_core::appointment::AppointmentStatus;
use hms_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::appointment::{
    Appointment, AppointmentFilter, CreateAppointment, UpdateAppointment,
};

/// Column list for `appointments` queries.
const COLUMNS: &str = "\
    id, patient_id, doctor_id, date, time, status, reminder_sent, \
    cancellation_reason, cancellation_requested_at, created_at, updated_at";

/// Maximum page size for appointment listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for appointment listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides CRUD operations for appointments.
pub struct AppointmentRepo;

impl AppointmentRepo {
    /// Insert a new appointment.
    ///
    /// Fails with a unique violation on `uq_appointments_active_slot` when
    /// another active appointment already holds the doctor/date/slot.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAppointment,
    ) -> Result<Appointment, sqlx::Error> {
        let query = format!(
            "INSERT INTO appointments (patient_id, doctor_id, date, time, status) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(input.patient_id)
            .bind(input.doctor_id)
            .bind(input.date)
            .bind(&input.time)
            .bind(input.status.as_str())
            .fetch_one(pool)
            .await
    }

    /// Find an appointment by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM appointments WHERE id = $1");
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List appointments matching `filter`, newest date first.
    pub async fn list(
        pool: &PgPool,
        filter: &AppointmentFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Appointment>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM appointments \
             WHERE ($1::BIGINT IS NULL OR patient_id = $1) \
               AND ($2::BIGINT IS NULL OR doctor_id = $2) \
               AND ($3::TEXT IS NULL OR status = $3) \
               AND ($4::DATE IS NULL OR date = $4) \
             ORDER BY date DESC, time DESC, id DESC \
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(filter.patient_id)
            .bind(filter.doctor_id)
            .bind(filter.status.map(AppointmentStatus::as_str))
            .bind(filter.date)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Slot labels held by non-cancelled appointments for a doctor on a date.
    pub async fn booked_times(
        pool: &PgPool,
        doctor_id: DbId,
        date: NaiveDate,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT time FROM appointments \
             WHERE doctor_id = $1 AND date = $2 AND status <> $3 \
             ORDER BY time",
        )
        .bind(doctor_id)
        .bind(date)
        .bind(AppointmentStatus::Cancelled.as_str())
        .fetch_all(pool)
        .await
    }

    /// Apply a partial update. Returns `None` if the appointment does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAppointment,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "UPDATE appointments SET \
                date = COALESCE($2, date), \
                time = COALESCE($3, time), \
                status = COALESCE($4, status), \
                reminder_sent = COALESCE($5, reminder_sent), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(input.date)
            .bind(input.time.as_deref())
            .bind(input.status.map(AppointmentStatus::as_str))
            .bind(input.reminder_sent)
            .fetch_optional(pool)
            .await
    }

    /// Move from `from` to `to` if the row is still in `from`.
    ///
    /// Returns `None` when the appointment is missing or its status changed
    /// underneath the caller. `reason` is stored only when provided.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: AppointmentStatus,
        to: AppointmentStatus,
        reason: Option<&str>,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "UPDATE appointments SET \
                status = $3, \
                cancellation_reason = COALESCE($4, cancellation_reason), \
                updated_at = NOW() \
             WHERE id = $1 AND status = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(reason)
            .fetch_optional(pool)
            .await
    }

    /// Mark a cancellation as requested by the patient, guarded on `from`.
    pub async fn request_cancellation(
        pool: &PgPool,
        id: DbId,
        from: AppointmentStatus,
        reason: Option<&str>,
        requested_at: Timestamp,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "UPDATE appointments SET \
                status = $3, \
                cancellation_reason = $4, \
                cancellation_requested_at = $5, \
                updated_at = NOW() \
             WHERE id = $1 AND status = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(AppointmentStatus::CancellationRequested.as_str())
            .bind(reason)
            .bind(requested_at)
            .fetch_optional(pool)
            .await
    }

    /// Scheduled appointments whose date falls in `[from, to]`.
    pub async fn list_scheduled_between(
        pool: &PgPool,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointments \
             WHERE status = $1 AND date BETWEEN $2 AND $3 \
             ORDER BY date, time"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(AppointmentStatus::Scheduled.as_str())
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    /// Atomically flip `reminder_sent` from false to true.
    ///
    /// Returns `true` only for the caller that performed the flip, so two
    /// concurrent sweeps never both notify.
    pub async fn claim_reminder(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE appointments SET reminder_sent = true, updated_at = NOW() \
             WHERE id = $1 AND reminder_sent = false",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Undo [`claim_reminder`](Self::claim_reminder) after a failed send.
    pub async fn release_reminder(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE appointments SET reminder_sent = false, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
