//! Doctor entity model.

use hms_core::shift::Shift;
use hms_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `doctors` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Doctor {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub specialization: Option<String>,
    #[sqlx(try_from = "String")]
    pub shift: Shift,
    pub availability_status: bool,
    /// Free-text display field; slot computation uses `shift` only.
    pub working_hours: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
