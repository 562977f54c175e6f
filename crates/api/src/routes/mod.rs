pub mod appointment;
pub mod doctor;
pub mod health;
pub mod notification;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /doctors/{id}                                    profile (auth)
/// /doctors/{id}/slots?date=                        free slots (auth)
/// /doctors/{id}/availability                       toggle (admin, PUT)
///
/// /appointments                                    list (auth), create (admin)
/// /appointments/requests                           request booking (patient/admin)
/// /appointments/{id}                               get (auth), update (staff, PATCH)
/// /appointments/{id}/status                        status change (staff, PUT)
/// /appointments/{id}/cancellation-request          request cancel (patient/admin)
/// /appointments/{id}/cancel                        cancel + refund (admin)
/// /appointments/{id}/invoice                       invoice (auth)
///
/// /notifications                                   list (auth)
/// /notifications/unread-count                      unread count (auth)
/// /notifications/{id}/read                         mark read (auth, POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/doctors", doctor::router())
        .nest("/appointments", appointment::router())
        .nest("/notifications", notification::router())
}
