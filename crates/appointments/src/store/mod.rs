//! Persistence seams used by the scheduling services.
//!
//! Each trait covers one collaborator: appointments, the doctor/patient
//! directory, invoices, and notifications. [`Stores`] bundles one
//! implementation of each behind `Arc<dyn _>` so services and request
//! handlers can share them cheaply.

pub mod postgres;

use std::sync::Arc;

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

use crate::error::StoreError;

/// Appointment persistence.
///
/// `insert` and `update` must fail with [`StoreError::SlotTaken`] when the
/// write would leave two non-cancelled appointments on the same
/// doctor/date/slot.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find(&self, id: DbId) -> Result<Option<Appointment>, StoreError>;

    async fn list(
        &self,
        filter: &AppointmentFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// Slot labels held by non-cancelled appointments.
    async fn booked_times(&self, doctor_id: DbId, date: NaiveDate)
        -> Result<Vec<String>, StoreError>;

    async fn insert(&self, input: &CreateAppointment) -> Result<Appointment, StoreError>;

    async fn update(
        &self,
        id: DbId,
        input: &UpdateAppointment,
    ) -> Result<Option<Appointment>, StoreError>;

    /// Compare-and-set on status. `None` when missing or no longer in `from`.
    async fn transition(
        &self,
        id: DbId,
        from: AppointmentStatus,
        to: AppointmentStatus,
        reason: Option<&str>,
    ) -> Result<Option<Appointment>, StoreError>;

    async fn request_cancellation(
        &self,
        id: DbId,
        from: AppointmentStatus,
        reason: Option<&str>,
        requested_at: Timestamp,
    ) -> Result<Option<Appointment>, StoreError>;

    /// Scheduled appointments dated within `[from, to]`.
    async fn list_scheduled_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// Flip `reminder_sent` false -> true. `true` only for the winner.
    async fn claim_reminder(&self, id: DbId) -> Result<bool, StoreError>;

    async fn release_reminder(&self, id: DbId) -> Result<(), StoreError>;

    /// Confirm the backing store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Doctor and patient lookups.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_doctor(&self, id: DbId) -> Result<Option<Doctor>, StoreError>;

    async fn set_doctor_availability(
        &self,
        id: DbId,
        available: bool,
    ) -> Result<Option<Doctor>, StoreError>;

    async fn find_patient(&self, id: DbId) -> Result<Option<Patient>, StoreError>;

    async fn find_patient_by_user(&self, user_id: DbId) -> Result<Option<Patient>, StoreError>;
}

/// Invoice persistence.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn find_for_appointment(
        &self,
        appointment_id: DbId,
    ) -> Result<Option<Invoice>, StoreError>;

    /// Record a refund. `None` if the invoice is missing or already refunded.
    async fn mark_refunded(
        &self,
        id: DbId,
        refund_id: &str,
        refunded_at: Timestamp,
    ) -> Result<Option<Invoice>, StoreError>;
}

/// In-app notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, user_id: DbId, title: &str, message: &str)
        -> Result<DbId, StoreError>;

    async fn list_for_user(
        &self,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError>;

    /// `false` if the notification does not exist or belongs to someone else.
    async fn mark_read(&self, id: DbId, user_id: DbId) -> Result<bool, StoreError>;

    async fn unread_count(&self, user_id: DbId) -> Result<i64, StoreError>;
}

/// One implementation of every store trait.
#[derive(Clone)]
pub struct Stores {
    pub appointments: Arc<dyn AppointmentStore>,
    pub directory: Arc<dyn Directory>,
    pub invoices: Arc<dyn InvoiceStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl Stores {
    /// Use a single backend for every collaborator.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: AppointmentStore + Directory + InvoiceStore + NotificationStore + 'static,
    {
        Self {
            appointments: store.clone(),
            directory: store.clone(),
            invoices: store.clone(),
            notifications: store,
        }
    }
}
