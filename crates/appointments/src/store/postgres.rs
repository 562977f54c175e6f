//! [`PgStore`]: the store traits over the `hms-db` repositories.

use async_trait::async_trait;
use chrono::NaiveDate;
use hms_core::appointment::AppointmentStatus;
use hms_core::types::{DbId, Timestamp};
use hms_db::models::appointment::{
    Appointment, AppointmentFilter, CreateAppointment, UpdateAppointment,
};
use hms_db::models::doctor::Doctor;
use hms_db::models::invoice::Invoice;
use hms_db::models::notification::Notification;
use hms_db::models::patient::Patient;
use hms_db::repositories::{
    AppointmentRepo, DoctorRepo, InvoiceRepo, NotificationRepo, PatientRepo,
};
use hms_db::{is_slot_conflict, DbPool};

use super::{AppointmentStore, Directory, InvoiceStore, NotificationStore};
use crate::error::StoreError;

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map active-slot index violations to [`StoreError::SlotTaken`].
fn slot_aware(err: sqlx::Error) -> StoreError {
    if is_slot_conflict(&err) {
        StoreError::SlotTaken
    } else {
        StoreError::Database(err)
    }
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn find(&self, id: DbId) -> Result<Option<Appointment>, StoreError> {
        Ok(AppointmentRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list(
        &self,
        filter: &AppointmentFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Appointment>, StoreError> {
        Ok(AppointmentRepo::list(&self.pool, filter, limit, offset).await?)
    }

    async fn booked_times(
        &self,
        doctor_id: DbId,
        date: NaiveDate,
    ) -> Result<Vec<String>, StoreError> {
        Ok(AppointmentRepo::booked_times(&self.pool, doctor_id, date).await?)
    }

    async fn insert(&self, input: &CreateAppointment) -> Result<Appointment, StoreError> {
        AppointmentRepo::create(&self.pool, input)
            .await
            .map_err(slot_aware)
    }

    async fn update(
        &self,
        id: DbId,
        input: &UpdateAppointment,
    ) -> Result<Option<Appointment>, StoreError> {
        AppointmentRepo::update(&self.pool, id, input)
            .await
            .map_err(slot_aware)
    }

    async fn transition(
        &self,
        id: DbId,
        from: AppointmentStatus,
        to: AppointmentStatus,
        reason: Option<&str>,
    ) -> Result<Option<Appointment>, StoreError> {
        AppointmentRepo::transition(&self.pool, id, from, to, reason)
            .await
            .map_err(slot_aware)
    }

    async fn request_cancellation(
        &self,
        id: DbId,
        from: AppointmentStatus,
        reason: Option<&str>,
        requested_at: Timestamp,
    ) -> Result<Option<Appointment>, StoreError> {
        Ok(
            AppointmentRepo::request_cancellation(&self.pool, id, from, reason, requested_at)
                .await?,
        )
    }

    async fn list_scheduled_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        Ok(AppointmentRepo::list_scheduled_between(&self.pool, from, to).await?)
    }

    async fn claim_reminder(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(AppointmentRepo::claim_reminder(&self.pool, id).await?)
    }

    async fn release_reminder(&self, id: DbId) -> Result<(), StoreError> {
        Ok(AppointmentRepo::release_reminder(&self.pool, id).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(hms_db::health_check(&self.pool).await?)
    }
}

#[async_trait]
impl Directory for PgStore {
    async fn find_doctor(&self, id: DbId) -> Result<Option<Doctor>, StoreError> {
        Ok(DoctorRepo::find_by_id(&self.pool, id).await?)
    }

    async fn set_doctor_availability(
        &self,
        id: DbId,
        available: bool,
    ) -> Result<Option<Doctor>, StoreError> {
        Ok(DoctorRepo::set_availability(&self.pool, id, available).await?)
    }

    async fn find_patient(&self, id: DbId) -> Result<Option<Patient>, StoreError> {
        Ok(PatientRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_patient_by_user(&self, user_id: DbId) -> Result<Option<Patient>, StoreError> {
        Ok(PatientRepo::find_by_user_id(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl InvoiceStore for PgStore {
    async fn find_for_appointment(
        &self,
        appointment_id: DbId,
    ) -> Result<Option<Invoice>, StoreError> {
        Ok(InvoiceRepo::find_by_appointment(&self.pool, appointment_id).await?)
    }

    async fn mark_refunded(
        &self,
        id: DbId,
        refund_id: &str,
        refunded_at: Timestamp,
    ) -> Result<Option<Invoice>, StoreError> {
        Ok(InvoiceRepo::mark_refunded(&self.pool, id, refund_id, refunded_at).await?)
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn create(
        &self,
        user_id: DbId,
        title: &str,
        message: &str,
    ) -> Result<DbId, StoreError> {
        Ok(NotificationRepo::create(&self.pool, user_id, title, message).await?)
    }

    async fn list_for_user(
        &self,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        Ok(NotificationRepo::list_for_user(&self.pool, user_id, unread_only, limit, offset).await?)
    }

    async fn mark_read(&self, id: DbId, user_id: DbId) -> Result<bool, StoreError> {
        Ok(NotificationRepo::mark_read(&self.pool, id, user_id).await?)
    }

    async fn unread_count(&self, user_id: DbId) -> Result<i64, StoreError> {
        Ok(NotificationRepo::unread_count(&self.pool, user_id).await?)
    }
}
