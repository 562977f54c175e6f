//! Route definitions for the `/appointments` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::appointment;
use crate::state::AppState;

/// Routes mounted at `/appointments`.
///
/// ```text
/// GET    /                            -> list_appointments
/// POST   /                            -> create_appointment
/// POST   /requests                    -> request_appointment
/// GET    /{id}                        -> get_appointment
/// PATCH  /{id}                        -> update_appointment
/// PUT    /{id}/status                 -> update_status
/// POST   /{id}/cancellation-request   -> request_cancellation
/// POST   /{id}/cancel                 -> cancel_appointment
/// GET    /{id}/invoice                -> get_invoice
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(appointment::list_appointments).post(appointment::create_appointment),
        )
        .route("/requests", post(appointment::request_appointment))
        .route(
            "/{id}",
            get(appointment::get_appointment).patch(appointment::update_appointment),
        )
        .route("/{id}/status", put(appointment::update_status))
        .route(
            "/{id}/cancellation-request",
            post(appointment::request_cancellation),
        )
        .route("/{id}/cancel", post(appointment::cancel_appointment))
        .route("/{id}/invoice", get(appointment::get_invoice))
}
