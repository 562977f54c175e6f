//! Route definitions for the `/doctors` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::doctor;
use crate::state::AppState;

/// Routes mounted at `/doctors`.
///
/// ```text
/// GET    /{id}                -> get_doctor
/// GET    /{id}/slots          -> available_slots
/// PUT    /{id}/availability   -> set_availability
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(doctor::get_doctor))
        .route("/{id}/slots", get(doctor::available_slots))
        .route("/{id}/availability", put(doctor::set_availability))
}
