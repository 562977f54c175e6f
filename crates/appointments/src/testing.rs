//! In-memory collaborators for service and HTTP tests.
//!
//! [`InMemoryStore`] implements every store trait over a single mutex and
//! enforces the active-slot uniqueness rule the way the database index does.
//! [`StubGateway`] records payment calls and can be told to fail.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use hms_core::appointment::AppointmentStatus;
use hms_core::billing::PaymentStatus;
use hms_core::shift::Shift;
use hms_core::types::{DbId, Timestamp};
use hms_db::models::appointment::{
    Appointment, AppointmentFilter, CreateAppointment, UpdateAppointment,
};
use hms_db::models::doctor::Doctor;
use hms_db::models::invoice::Invoice;
use hms_db::models::notification::Notification;
use hms_db::models::patient::Patient;
use hms_payments::{PaymentError, PaymentGateway, ProviderInvoice};

use crate::error::StoreError;
use crate::store::{AppointmentStore, Directory, InvoiceStore, NotificationStore};

#[derive(Default)]
struct State {
    next_id: DbId,
    appointments: BTreeMap<DbId, Appointment>,
    doctors: BTreeMap<DbId, Doctor>,
    patients: BTreeMap<DbId, Patient>,
    invoices: BTreeMap<DbId, Invoice>,
    notifications: Vec<Notification>,
    failing_notification_users: HashSet<DbId>,
    failing_invoice_lookups: bool,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn slot_taken(&self, doctor_id: DbId, date: NaiveDate, time: &str, except: DbId) -> bool {
        self.appointments.values().any(|a| {
            a.id != except
                && a.status.holds_slot()
                && a.doctor_id == doctor_id
                && a.date == date
                && a.time == time
        })
    }

    fn push_appointment(
        &mut self,
        patient_id: DbId,
        doctor_id: DbId,
        date: NaiveDate,
        time: &str,
        status: AppointmentStatus,
    ) -> Appointment {
        let id = self.next_id();
        let now = Utc::now();
        let appointment = Appointment {
            id,
            patient_id,
            doctor_id,
            date,
            time: time.to_string(),
            status,
            reminder_sent: false,
            cancellation_reason: None,
            cancellation_requested_at: None,
            created_at: now,
            updated_at: now,
        };
        self.appointments.insert(id, appointment.clone());
        appointment
    }
}

/// Store backed by in-process maps.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_doctor(&self, name: &str, shift: Shift, available: bool) -> Doctor {
        let mut state = self.lock();
        let id = state.next_id();
        let now = Utc::now();
        let doctor = Doctor {
            id,
            user_id: 1000 + id,
            name: name.to_string(),
            specialization: None,
            shift,
            availability_status: available,
            working_hours: None,
            created_at: now,
            updated_at: now,
        };
        state.doctors.insert(id, doctor.clone());
        doctor
    }

    pub fn add_patient(&self, user_id: DbId, name: &str) -> Patient {
        let mut state = self.lock();
        let id = state.next_id();
        let now = Utc::now();
        let patient = Patient {
            id,
            user_id,
            name: name.to_string(),
            email: None,
            phone: None,
            created_at: now,
            updated_at: now,
        };
        state.patients.insert(id, patient.clone());
        patient
    }

    /// Insert an appointment row as-is, bypassing the slot check.
    pub fn add_appointment(
        &self,
        patient_id: DbId,
        doctor_id: DbId,
        date: NaiveDate,
        time: &str,
        status: AppointmentStatus,
    ) -> Appointment {
        self.lock()
            .push_appointment(patient_id, doctor_id, date, time, status)
    }

    pub fn add_invoice(
        &self,
        appointment_id: DbId,
        patient_id: DbId,
        payment_status: PaymentStatus,
        payment_intent_ref: Option<&str>,
        provider_invoice_ref: Option<&str>,
    ) -> Invoice {
        let mut state = self.lock();
        let id = state.next_id();
        let now = Utc::now();
        let invoice = Invoice {
            id,
            appointment_id,
            patient_id,
            amount_cents: 5000,
            payment_status,
            payment_intent_ref: payment_intent_ref.map(str::to_string),
            provider_invoice_ref: provider_invoice_ref.map(str::to_string),
            refunded: payment_status == PaymentStatus::Refunded,
            refund_id: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        };
        state.invoices.insert(id, invoice.clone());
        invoice
    }

    /// Make notification creation fail for `user_id`.
    pub fn fail_notifications_for(&self, user_id: DbId) {
        self.lock().failing_notification_users.insert(user_id);
    }

    /// Make every invoice lookup fail.
    pub fn fail_invoice_lookups(&self) {
        self.lock().failing_invoice_lookups = true;
    }

    pub fn appointment(&self, id: DbId) -> Option<Appointment> {
        self.lock().appointments.get(&id).cloned()
    }

    pub fn invoice(&self, id: DbId) -> Option<Invoice> {
        self.lock().invoices.get(&id).cloned()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn find(&self, id: DbId) -> Result<Option<Appointment>, StoreError> {
        Ok(self.appointment(id))
    }

    async fn list(
        &self,
        filter: &AppointmentFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let limit = limit.unwrap_or(50).clamp(1, 100) as usize;
        let offset = offset.unwrap_or(0).max(0) as usize;
        let state = self.lock();
        let mut rows: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| filter.patient_id.is_none_or(|p| a.patient_id == p))
            .filter(|a| filter.doctor_id.is_none_or(|d| a.doctor_id == d))
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .filter(|a| filter.date.is_none_or(|d| a.date == d))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.date, &b.time, b.id).cmp(&(a.date, &a.time, a.id)));
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn booked_times(
        &self,
        doctor_id: DbId,
        date: NaiveDate,
    ) -> Result<Vec<String>, StoreError> {
        let state = self.lock();
        let mut times: Vec<String> = state
            .appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.date == date && a.status.holds_slot())
            .map(|a| a.time.clone())
            .collect();
        times.sort();
        Ok(times)
    }

    async fn insert(&self, input: &CreateAppointment) -> Result<Appointment, StoreError> {
        let mut state = self.lock();
        if input.status.holds_slot()
            && state.slot_taken(input.doctor_id, input.date, &input.time, 0)
        {
            return Err(StoreError::SlotTaken);
        }
        Ok(state.push_appointment(
            input.patient_id,
            input.doctor_id,
            input.date,
            &input.time,
            input.status,
        ))
    }

    async fn update(
        &self,
        id: DbId,
        input: &UpdateAppointment,
    ) -> Result<Option<Appointment>, StoreError> {
        let mut state = self.lock();
        let Some(current) = state.appointments.get(&id).cloned() else {
            return Ok(None);
        };
        let mut next = current;
        if let Some(date) = input.date {
            next.date = date;
        }
        if let Some(time) = &input.time {
            next.time = time.clone();
        }
        if let Some(status) = input.status {
            next.status = status;
        }
        if let Some(sent) = input.reminder_sent {
            next.reminder_sent = sent;
        }
        if next.status.holds_slot() && state.slot_taken(next.doctor_id, next.date, &next.time, id)
        {
            return Err(StoreError::SlotTaken);
        }
        next.updated_at = Utc::now();
        state.appointments.insert(id, next.clone());
        Ok(Some(next))
    }

    async fn transition(
        &self,
        id: DbId,
        from: AppointmentStatus,
        to: AppointmentStatus,
        reason: Option<&str>,
    ) -> Result<Option<Appointment>, StoreError> {
        let mut state = self.lock();
        let Some(appt) = state.appointments.get_mut(&id) else {
            return Ok(None);
        };
        if appt.status != from {
            return Ok(None);
        }
        appt.status = to;
        if let Some(reason) = reason {
            appt.cancellation_reason = Some(reason.to_string());
        }
        appt.updated_at = Utc::now();
        Ok(Some(appt.clone()))
    }

    async fn request_cancellation(
        &self,
        id: DbId,
        from: AppointmentStatus,
        reason: Option<&str>,
        requested_at: Timestamp,
    ) -> Result<Option<Appointment>, StoreError> {
        let mut state = self.lock();
        let Some(appt) = state.appointments.get_mut(&id) else {
            return Ok(None);
        };
        if appt.status != from {
            return Ok(None);
        }
        appt.status = AppointmentStatus::CancellationRequested;
        appt.cancellation_reason = reason.map(str::to_string);
        appt.cancellation_requested_at = Some(requested_at);
        appt.updated_at = Utc::now();
        Ok(Some(appt.clone()))
    }

    async fn list_scheduled_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        let state = self.lock();
        let mut rows: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| a.status == AppointmentStatus::Scheduled && a.date >= from && a.date <= to)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (a.date, &a.time).cmp(&(b.date, &b.time)));
        Ok(rows)
    }

    async fn claim_reminder(&self, id: DbId) -> Result<bool, StoreError> {
        let mut state = self.lock();
        match state.appointments.get_mut(&id) {
            Some(appt) if !appt.reminder_sent => {
                appt.reminder_sent = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_reminder(&self, id: DbId) -> Result<(), StoreError> {
        if let Some(appt) = self.lock().appointments.get_mut(&id) {
            appt.reminder_sent = false;
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl Directory for InMemoryStore {
    async fn find_doctor(&self, id: DbId) -> Result<Option<Doctor>, StoreError> {
        Ok(self.lock().doctors.get(&id).cloned())
    }

    async fn set_doctor_availability(
        &self,
        id: DbId,
        available: bool,
    ) -> Result<Option<Doctor>, StoreError> {
        let mut state = self.lock();
        Ok(state.doctors.get_mut(&id).map(|doctor| {
            doctor.availability_status = available;
            doctor.updated_at = Utc::now();
            doctor.clone()
        }))
    }

    async fn find_patient(&self, id: DbId) -> Result<Option<Patient>, StoreError> {
        Ok(self.lock().patients.get(&id).cloned())
    }

    async fn find_patient_by_user(&self, user_id: DbId) -> Result<Option<Patient>, StoreError> {
        Ok(self
            .lock()
            .patients
            .values()
            .find(|p| p.user_id == user_id)
            .cloned())
    }
}

#[async_trait]
impl InvoiceStore for InMemoryStore {
    async fn find_for_appointment(
        &self,
        appointment_id: DbId,
    ) -> Result<Option<Invoice>, StoreError> {
        let state = self.lock();
        if state.failing_invoice_lookups {
            return Err(StoreError::Backend("invoice lookup unavailable".into()));
        }
        Ok(state
            .invoices
            .values()
            .find(|i| i.appointment_id == appointment_id)
            .cloned())
    }

    async fn mark_refunded(
        &self,
        id: DbId,
        refund_id: &str,
        refunded_at: Timestamp,
    ) -> Result<Option<Invoice>, StoreError> {
        let mut state = self.lock();
        Ok(match state.invoices.get_mut(&id) {
            Some(invoice) if !invoice.refunded => {
                invoice.refunded = true;
                invoice.payment_status = PaymentStatus::Refunded;
                invoice.refund_id = Some(refund_id.to_string());
                invoice.refunded_at = Some(refunded_at);
                invoice.updated_at = Utc::now();
                Some(invoice.clone())
            }
            _ => None,
        })
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn create(
        &self,
        user_id: DbId,
        title: &str,
        message: &str,
    ) -> Result<DbId, StoreError> {
        let mut state = self.lock();
        if state.failing_notification_users.contains(&user_id) {
            return Err(StoreError::Backend(format!(
                "notification delivery failed for user {user_id}"
            )));
        }
        let id = state.next_id();
        state.notifications.push(Notification {
            id,
            user_id,
            title: title.to_string(),
            message: message.to_string(),
            is_read: false,
            read_at: None,
            sent_date: Utc::now(),
        });
        Ok(id)
    }

    async fn list_for_user(
        &self,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let state = self.lock();
        Ok(state
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, id: DbId, user_id: DbId) -> Result<bool, StoreError> {
        let mut state = self.lock();
        match state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id && !n.is_read)
        {
            Some(n) => {
                n.is_read = true;
                n.read_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn unread_count(&self, user_id: DbId) -> Result<i64, StoreError> {
        Ok(self
            .lock()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as i64)
    }
}

// ---------------------------------------------------------------------------
// Payment gateway stub
// ---------------------------------------------------------------------------

/// Payment gateway that records calls instead of making them.
#[derive(Default)]
pub struct StubGateway {
    fail_refunds: bool,
    invoice_intent: Option<String>,
    refunds: Mutex<Vec<String>>,
    invoice_lookups: Mutex<Vec<String>>,
}

impl StubGateway {
    /// Every refund succeeds; provider invoices carry no payment intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every refund is declined by the provider.
    pub fn declining() -> Self {
        Self {
            fail_refunds: true,
            ..Self::default()
        }
    }

    /// Provider invoices resolve to `intent`.
    pub fn with_invoice_intent(mut self, intent: &str) -> Self {
        self.invoice_intent = Some(intent.to_string());
        self
    }

    /// Payment intents refunds were requested for, in call order.
    pub fn refunds(&self) -> Vec<String> {
        self.refunds.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Provider invoice refs looked up, in call order.
    pub fn invoice_lookups(&self) -> Vec<String> {
        self.invoice_lookups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_refund(&self, payment_intent_ref: &str) -> Result<String, PaymentError> {
        let mut refunds = self.refunds.lock().unwrap_or_else(|e| e.into_inner());
        refunds.push(payment_intent_ref.to_string());
        if self.fail_refunds {
            return Err(PaymentError::Api {
                status: 402,
                body: "card_declined".into(),
            });
        }
        Ok(format!("re_{}", refunds.len()))
    }

    async fn retrieve_invoice(&self, invoice_ref: &str) -> Result<ProviderInvoice, PaymentError> {
        self.invoice_lookups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(invoice_ref.to_string());
        Ok(ProviderInvoice {
            status: Some("paid".into()),
            payment_intent: self.invoice_intent.clone(),
        })
    }
}
