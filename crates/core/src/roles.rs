//! Well-known role name constants.
//!
//! These must match the `role` claim issued in access tokens.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_DOCTOR: &str = "doctor";
pub const ROLE_PATIENT: &str = "patient";

/// Admins and doctors may drive appointment status changes.
pub fn is_staff(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_DOCTOR
}
