//! Repository for the `patients` table.

use hms_core::types::DbId;
use sqlx::PgPool;

use crate::models::patient::Patient;

/// Column list for `patients` queries.
const COLUMNS: &str = "id, user_id, name, email, phone, created_at, updated_at";

pub struct PatientRepo;

impl PatientRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Patient>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM patients WHERE id = $1");
        sqlx::query_as::<_, Patient>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the patient record owned by a user account.
    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Patient>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM patients WHERE user_id = $1");
        sqlx::query_as::<_, Patient>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
