//! Slot availability, booking and rescheduling.
//!
//! Availability is computed from the doctor's shift minus slots held by
//! non-cancelled appointments. The store's active-slot constraint is the
//! final word: a booking that loses a race against another writer surfaces
//! as [`BookingOutcome::SlotUnavailable`], the same as one rejected up front.

use std::sync::Arc;

use chrono::NaiveDate;
use hms_core::appointment::AppointmentStatus;
use hms_core::clock::Clock;
use hms_core::error::CoreError;
use hms_core::slots::{available_slots, suggestion_dates, validate_slot_label};
use hms_core::types::DbId;
use hms_db::models::appointment::{
    Appointment, AppointmentFilter, CreateAppointment, UpdateAppointment,
};
use hms_db::models::doctor::Doctor;
use serde::Serialize;

use crate::error::{ServiceResult, StoreError};
use crate::store::Stores;

/// Input for a new booking.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub patient_id: DbId,
    pub doctor_id: DbId,
    pub date: NaiveDate,
    pub time: String,
}

/// Alternatives offered when the requested slot cannot be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotNegotiation {
    pub message: String,
    /// Free slots on the requested date.
    pub available_slots: Vec<String>,
    /// First date with a free slot, starting at the requested date.
    pub suggested_date: Option<NaiveDate>,
}

/// Result of an operation that claims a slot.
#[derive(Debug, Clone)]
pub enum BookingOutcome {
    Booked(Appointment),
    SlotUnavailable(SlotNegotiation),
}

/// Booking and rescheduling rules.
#[derive(Clone)]
pub struct BookingService {
    stores: Stores,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(stores: Stores, clock: Arc<dyn Clock>) -> Self {
        Self { stores, clock }
    }

    pub async fn get(&self, id: DbId) -> ServiceResult<Appointment> {
        self.stores
            .appointments
            .find(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Appointment", id).into())
    }

    pub async fn list(
        &self,
        filter: &AppointmentFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Vec<Appointment>> {
        Ok(self.stores.appointments.list(filter, limit, offset).await?)
    }

    async fn doctor(&self, id: DbId) -> ServiceResult<Doctor> {
        self.stores
            .directory
            .find_doctor(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Doctor", id).into())
    }

    async fn ensure_patient(&self, id: DbId) -> ServiceResult<()> {
        match self.stores.directory.find_patient(id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::not_found("Patient", id).into()),
        }
    }

    /// Free slots for a doctor on a date. Unknown doctors have none.
    pub async fn available_slots(&self, doctor_id: DbId, date: NaiveDate) -> ServiceResult<Vec<String>> {
        match self.stores.directory.find_doctor(doctor_id).await? {
            Some(doctor) => self.slots_for(&doctor, date, None).await,
            None => Ok(Vec::new()),
        }
    }

    async fn slots_for(
        &self,
        doctor: &Doctor,
        date: NaiveDate,
        reclaim: Option<&str>,
    ) -> ServiceResult<Vec<String>> {
        if !doctor.availability_status {
            return Ok(Vec::new());
        }
        let booked = self.stores.appointments.booked_times(doctor.id, date).await?;
        Ok(available_slots(doctor.shift, true, &booked, reclaim))
    }

    /// First date in the suggestion horizon starting at `from` with a free slot.
    pub async fn suggest_date(
        &self,
        doctor: &Doctor,
        from: NaiveDate,
    ) -> ServiceResult<Option<NaiveDate>> {
        if !doctor.availability_status {
            return Ok(None);
        }
        for date in suggestion_dates(from) {
            if !self.slots_for(doctor, date, None).await?.is_empty() {
                return Ok(Some(date));
            }
        }
        Ok(None)
    }

    async fn negotiate(
        &self,
        doctor: &Doctor,
        date: NaiveDate,
        time: &str,
        reclaim: Option<&str>,
    ) -> ServiceResult<SlotNegotiation> {
        let available_slots = self.slots_for(doctor, date, reclaim).await?;
        let suggested_date = if available_slots.is_empty() {
            match date.succ_opt() {
                Some(next) => self.suggest_date(doctor, next).await?,
                None => None,
            }
        } else {
            Some(date)
        };

        tracing::info!(
            doctor_id = doctor.id,
            %date,
            time,
            available = available_slots.len(),
            "Requested slot unavailable"
        );

        Ok(SlotNegotiation {
            message: format!(
                "The {time} slot on {date} is not available for {}",
                doctor.name
            ),
            available_slots,
            suggested_date,
        })
    }

    /// Book a confirmed appointment, or return alternatives.
    pub async fn create_direct(&self, input: NewBooking) -> ServiceResult<BookingOutcome> {
        validate_slot_label(&input.time)?;
        let doctor = self.doctor(input.doctor_id).await?;
        self.ensure_patient(input.patient_id).await?;
        if !doctor.availability_status {
            return Err(CoreError::Validation(format!(
                "{} is not accepting appointments",
                doctor.name
            ))
            .into());
        }

        let free = self.slots_for(&doctor, input.date, None).await?;
        if !free.contains(&input.time) {
            let negotiation = self.negotiate(&doctor, input.date, &input.time, None).await?;
            return Ok(BookingOutcome::SlotUnavailable(negotiation));
        }

        self.insert(&doctor, &input, AppointmentStatus::Scheduled).await
    }

    /// Record a patient's booking request pending admin approval.
    ///
    /// No availability check is made; the request is only refused if the
    /// slot is already held by another active appointment.
    pub async fn request(&self, input: NewBooking) -> ServiceResult<BookingOutcome> {
        validate_slot_label(&input.time)?;
        let doctor = self.doctor(input.doctor_id).await?;
        self.ensure_patient(input.patient_id).await?;
        self.insert(&doctor, &input, AppointmentStatus::Requested).await
    }

    async fn insert(
        &self,
        doctor: &Doctor,
        input: &NewBooking,
        status: AppointmentStatus,
    ) -> ServiceResult<BookingOutcome> {
        let create = CreateAppointment {
            patient_id: input.patient_id,
            doctor_id: input.doctor_id,
            date: input.date,
            time: input.time.clone(),
            status,
        };
        match self.stores.appointments.insert(&create).await {
            Ok(appointment) => {
                tracing::info!(
                    appointment_id = appointment.id,
                    doctor_id = appointment.doctor_id,
                    patient_id = appointment.patient_id,
                    status = %appointment.status,
                    "Appointment booked"
                );
                Ok(BookingOutcome::Booked(appointment))
            }
            Err(StoreError::SlotTaken) => {
                let negotiation = self.negotiate(doctor, input.date, &input.time, None).await?;
                Ok(BookingOutcome::SlotUnavailable(negotiation))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a partial update, re-checking availability when the slot moves.
    ///
    /// When the appointment stays on its current date, its own slot counts
    /// as free so an unchanged or swapped time is never rejected against
    /// itself. A supplied status must be a legal transition. Moving the
    /// appointment re-arms its reminder unless the caller sets the flag.
    pub async fn update(&self, id: DbId, mut input: UpdateAppointment) -> ServiceResult<BookingOutcome> {
        let current = self.get(id).await?;

        if let Some(status) = input.status {
            if status != current.status {
                current.status.validate_transition(status)?;
            }
        }

        if input.moves_slot(&current) {
            if current.status.is_terminal() {
                return Err(CoreError::Validation(format!(
                    "Cannot reschedule an appointment that is {}",
                    current.status
                ))
                .into());
            }
            if input.reminder_sent.is_none() {
                input.reminder_sent = Some(false);
            }
            let date = input.date.unwrap_or(current.date);
            let time = input.time.as_deref().unwrap_or(&current.time);
            validate_slot_label(time)?;

            let doctor = self.doctor(current.doctor_id).await?;
            let reclaim = (date == current.date).then_some(current.time.as_str());
            let free = self.slots_for(&doctor, date, reclaim).await?;
            if !free.iter().any(|slot| slot == time) {
                let negotiation = self.negotiate(&doctor, date, time, reclaim).await?;
                return Ok(BookingOutcome::SlotUnavailable(negotiation));
            }
        }

        match self.stores.appointments.update(id, &input).await {
            Ok(Some(updated)) => {
                tracing::info!(
                    appointment_id = id,
                    date = %updated.date,
                    time = %updated.time,
                    status = %updated.status,
                    "Appointment updated"
                );
                Ok(BookingOutcome::Booked(updated))
            }
            Ok(None) => Err(CoreError::not_found("Appointment", id).into()),
            Err(StoreError::SlotTaken) => {
                let doctor = self.doctor(current.doctor_id).await?;
                let date = input.date.unwrap_or(current.date);
                let time = input.time.as_deref().unwrap_or(&current.time);
                let reclaim = (date == current.date).then_some(current.time.as_str());
                let negotiation = self.negotiate(&doctor, date, time, reclaim).await?;
                Ok(BookingOutcome::SlotUnavailable(negotiation))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Change status only. Setting `Cancelled` here does not refund.
    pub async fn update_status(&self, id: DbId, status: AppointmentStatus) -> ServiceResult<Appointment> {
        let current = self.get(id).await?;
        current.status.validate_transition(status)?;

        let updated = self
            .stores
            .appointments
            .transition(id, current.status, status, None)
            .await?
            .ok_or_else(|| concurrent_change(id))?;

        tracing::info!(appointment_id = id, from = %current.status, to = %status, "Appointment status changed");
        Ok(updated)
    }

    /// Patient asks to cancel; an admin decides later.
    pub async fn request_cancellation(
        &self,
        id: DbId,
        reason: Option<&str>,
    ) -> ServiceResult<Appointment> {
        let current = self.get(id).await?;
        current.status.ensure_cancellation_requestable()?;

        let updated = self
            .stores
            .appointments
            .request_cancellation(id, current.status, reason, self.clock.now())
            .await?
            .ok_or_else(|| concurrent_change(id))?;

        tracing::info!(appointment_id = id, "Cancellation requested");
        Ok(updated)
    }
}

pub(crate) fn concurrent_change(id: DbId) -> CoreError {
    CoreError::Conflict(format!("Appointment {id} was modified concurrently"))
}
