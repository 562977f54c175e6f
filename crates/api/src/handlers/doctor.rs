//! Handlers for the `/doctors` resource.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use hms_core::error::CoreError;
use hms_core::types::DbId;
use hms_db::models::doctor::Doctor;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsResponse {
    pub success: bool,
    pub available_slots: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub available: bool,
}

/// GET /api/v1/doctors/{id}
pub async fn get_doctor(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Doctor>>> {
    let doctor = state
        .stores
        .directory
        .find_doctor(id)
        .await?
        .ok_or_else(|| CoreError::not_found("Doctor", id))?;
    Ok(Json(DataResponse { data: doctor }))
}

/// GET /api/v1/doctors/{id}/slots?date=YYYY-MM-DD
///
/// Free slots on `date`. Unknown or unavailable doctors yield an empty list.
pub async fn available_slots(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<SlotQuery>,
) -> AppResult<Json<SlotsResponse>> {
    let available_slots = state.booking.available_slots(id, params.date).await?;
    Ok(Json(SlotsResponse {
        success: true,
        available_slots,
    }))
}

/// PUT /api/v1/doctors/{id}/availability
pub async fn set_availability(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AvailabilityRequest>,
) -> AppResult<Json<DataResponse<Doctor>>> {
    let doctor = state
        .stores
        .directory
        .set_doctor_availability(id, input.available)
        .await?
        .ok_or_else(|| CoreError::not_found("Doctor", id))?;

    tracing::info!(doctor_id = id, user_id = admin.user_id, available = input.available, "Doctor availability changed");
    Ok(Json(DataResponse { data: doctor }))
}
