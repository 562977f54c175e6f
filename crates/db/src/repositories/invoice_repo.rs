//! Repository for the `invoices` table.

use hms_core::billing::PaymentStatus;
use hms_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::invoice::Invoice;

/// Column list for `invoices` queries.
const COLUMNS: &str = "\
    id, appointment_id, patient_id, amount_cents, payment_status, \
    payment_intent_ref, provider_invoice_ref, refunded, refund_id, refunded_at, \
    created_at, updated_at";

pub struct InvoiceRepo;

impl InvoiceRepo {
    /// The invoice linked to an appointment, if one was issued.
    pub async fn find_by_appointment(
        pool: &PgPool,
        appointment_id: DbId,
    ) -> Result<Option<Invoice>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM invoices WHERE appointment_id = $1");
        sqlx::query_as::<_, Invoice>(&query)
            .bind(appointment_id)
            .fetch_optional(pool)
            .await
    }

    /// Record a successful refund.
    ///
    /// Guarded by `refunded = false` so a second refund id never overwrites
    /// the first.
    pub async fn mark_refunded(
        pool: &PgPool,
        id: DbId,
        refund_id: &str,
        refunded_at: Timestamp,
    ) -> Result<Option<Invoice>, sqlx::Error> {
        let query = format!(
            "UPDATE invoices SET \
                payment_status = $2, refunded = true, refund_id = $3, \
                refunded_at = $4, updated_at = NOW() \
             WHERE id = $1 AND refunded = false \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .bind(PaymentStatus::Refunded.as_str())
            .bind(refund_id)
            .bind(refunded_at)
            .fetch_optional(pool)
            .await
    }
}
