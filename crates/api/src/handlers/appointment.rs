//! Handlers for the `/appointments` resource.
//!
//! Patients only ever see and act on their own appointments; the patient
//! profile is resolved from the token's user id.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use hms_appointments::{BookingOutcome, CancellationOutcome, NewBooking};
use hms_core::appointment::AppointmentStatus;
use hms_core::error::CoreError;
use hms_core::types::DbId;
use hms_db::models::appointment::{Appointment, AppointmentFilter, UpdateAppointment};
use hms_db::models::invoice::Invoice;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequireStaff};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body for `POST /appointments` (admin direct booking).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    #[validate(range(min = 1))]
    pub patient_id: DbId,
    #[validate(range(min = 1))]
    pub doctor_id: DbId,
    pub date: NaiveDate,
    #[validate(length(equal = 5))]
    pub time: String,
}

/// Body for `POST /appointments/requests`.
///
/// Patients may omit `patient_id`; admins must supply it.
#[derive(Debug, Deserialize, Validate)]
pub struct BookingRequest {
    #[validate(range(min = 1))]
    pub patient_id: Option<DbId>,
    #[validate(range(min = 1))]
    pub doctor_id: DbId,
    pub date: NaiveDate,
    #[validate(length(equal = 5))]
    pub time: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

/// Body for cancellation requests and admin cancellation.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancellationRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Query parameters for `GET /appointments`.
#[derive(Debug, Deserialize)]
pub struct AppointmentListQuery {
    pub patient_id: Option<DbId>,
    pub doctor_id: Option<DbId>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The caller's patient id when they are a patient, `None` for staff.
async fn patient_scope(state: &AppState, auth: &AuthUser) -> AppResult<Option<DbId>> {
    if !auth.is_patient() {
        return Ok(None);
    }
    let patient = state
        .stores
        .directory
        .find_patient_by_user(auth.user_id)
        .await?
        .ok_or_else(|| CoreError::Forbidden("No patient profile for this account".into()))?;
    Ok(Some(patient.id))
}

fn ensure_owner(scope: Option<DbId>, appointment: &Appointment) -> AppResult<()> {
    match scope {
        Some(patient_id) if patient_id != appointment.patient_id => Err(AppError::Core(
            CoreError::Forbidden("Appointment belongs to another patient".into()),
        )),
        _ => Ok(()),
    }
}

/// Fetch an appointment the caller is allowed to see.
async fn visible_appointment(state: &AppState, auth: &AuthUser, id: DbId) -> AppResult<Appointment> {
    let scope = patient_scope(state, auth).await?;
    let appointment = state.booking.get(id).await?;
    ensure_owner(scope, &appointment)?;
    Ok(appointment)
}

fn into_booked(outcome: BookingOutcome) -> AppResult<Appointment> {
    match outcome {
        BookingOutcome::Booked(appointment) => Ok(appointment),
        BookingOutcome::SlotUnavailable(negotiation) => Err(AppError::SlotUnavailable(negotiation)),
    }
}

// ---------------------------------------------------------------------------
// Booking
// ---------------------------------------------------------------------------

/// POST /api/v1/appointments
///
/// Admin books a confirmed appointment. Returns 201, or 409 with
/// alternatives when the slot is unavailable.
pub async fn create_appointment(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateAppointmentRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Appointment>>)> {
    input.validate()?;

    let outcome = state
        .booking
        .create_direct(NewBooking {
            patient_id: input.patient_id,
            doctor_id: input.doctor_id,
            date: input.date,
            time: input.time,
        })
        .await?;
    let appointment = into_booked(outcome)?;

    tracing::info!(appointment_id = appointment.id, user_id = admin.user_id, "Appointment created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: appointment })))
}

/// POST /api/v1/appointments/requests
///
/// Patient (or admin on their behalf) requests a booking for admin approval.
pub async fn request_appointment(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<BookingRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Appointment>>)> {
    input.validate()?;

    let patient_id = match patient_scope(&state, &auth).await? {
        Some(own) => {
            if input.patient_id.is_some_and(|requested| requested != own) {
                return Err(AppError::Core(CoreError::Forbidden(
                    "Patients may only book for themselves".into(),
                )));
            }
            own
        }
        None if auth.is_admin() => input
            .patient_id
            .ok_or_else(|| AppError::BadRequest("patient_id is required".into()))?,
        None => {
            return Err(AppError::Core(CoreError::Forbidden(
                "Patient or Admin role required".into(),
            )))
        }
    };

    let outcome = state
        .booking
        .request(NewBooking {
            patient_id,
            doctor_id: input.doctor_id,
            date: input.date,
            time: input.time,
        })
        .await?;
    let appointment = into_booked(outcome)?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: appointment })))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/appointments
///
/// List appointments. Patients are restricted to their own regardless of
/// the `patient_id` filter.
pub async fn list_appointments(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<AppointmentListQuery>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Appointment>>>> {
    let scope = patient_scope(&state, &auth).await?;
    let filter = AppointmentFilter {
        patient_id: scope.or(params.patient_id),
        doctor_id: params.doctor_id,
        status: params.status,
        date: params.date,
    };

    let appointments = state.booking.list(&filter, page.limit, page.offset).await?;
    Ok(Json(DataResponse { data: appointments }))
}

/// GET /api/v1/appointments/{id}
pub async fn get_appointment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Appointment>>> {
    let appointment = visible_appointment(&state, &auth, id).await?;
    Ok(Json(DataResponse { data: appointment }))
}

/// GET /api/v1/appointments/{id}/invoice
pub async fn get_invoice(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Invoice>>> {
    visible_appointment(&state, &auth, id).await?;
    let invoice = state
        .stores
        .invoices
        .find_for_appointment(id)
        .await?
        .ok_or_else(|| CoreError::not_found("Invoice", id))?;
    Ok(Json(DataResponse { data: invoice }))
}

// ---------------------------------------------------------------------------
// Changes
// ---------------------------------------------------------------------------

/// PATCH /api/v1/appointments/{id}
///
/// Partial update. Moving the appointment re-checks availability and
/// returns 409 with alternatives when the target slot is taken.
pub async fn update_appointment(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAppointment>,
) -> AppResult<Json<DataResponse<Appointment>>> {
    let appointment = into_booked(state.booking.update(id, input).await?)?;
    Ok(Json(DataResponse { data: appointment }))
}

/// PUT /api/v1/appointments/{id}/status
///
/// Status change only. Setting `cancelled` here does not refund; use
/// `POST /appointments/{id}/cancel` for that.
pub async fn update_status(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateStatusRequest>,
) -> AppResult<Json<DataResponse<Appointment>>> {
    let appointment = state.booking.update_status(id, input.status).await?;

    tracing::info!(appointment_id = id, user_id = staff.user_id, status = %input.status, "Status updated");
    Ok(Json(DataResponse { data: appointment }))
}

/// POST /api/v1/appointments/{id}/cancellation-request
pub async fn request_cancellation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CancellationRequest>,
) -> AppResult<Json<DataResponse<Appointment>>> {
    input.validate()?;
    if !auth.is_patient() && !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Patient or Admin role required".into(),
        )));
    }
    visible_appointment(&state, &auth, id).await?;

    let appointment = state
        .booking
        .request_cancellation(id, input.reason.as_deref())
        .await?;
    Ok(Json(DataResponse { data: appointment }))
}

/// POST /api/v1/appointments/{id}/cancel
///
/// Admin cancellation. Refunds a paid invoice on a best-effort basis; the
/// response reports whether the refund went through.
pub async fn cancel_appointment(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CancellationRequest>,
) -> AppResult<Json<DataResponse<CancellationOutcome>>> {
    input.validate()?;

    let outcome = state.cancellation.cancel(id, input.reason.as_deref()).await?;

    tracing::info!(
        appointment_id = id,
        user_id = admin.user_id,
        refund_processed = outcome.refund_processed,
        "Appointment cancelled by admin"
    );
    Ok(Json(DataResponse { data: outcome }))
}
