//! Repository for the `doctors` table.

use hms_core::types::DbId;
use sqlx::PgPool;

use crate::models::doctor::Doctor;

/// Column list for `doctors` queries.
const COLUMNS: &str = "\
    id, user_id, name, specialization, shift, availability_status, \
    working_hours, created_at, updated_at";

pub struct DoctorRepo;

impl DoctorRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Doctor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM doctors WHERE id = $1");
        sqlx::query_as::<_, Doctor>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Toggle whether the doctor accepts new bookings.
    pub async fn set_availability(
        pool: &PgPool,
        id: DbId,
        available: bool,
    ) -> Result<Option<Doctor>, sqlx::Error> {
        let query = format!(
            "UPDATE doctors SET availability_status = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Doctor>(&query)
            .bind(id)
            .bind(available)
            .fetch_optional(pool)
            .await
    }
}
