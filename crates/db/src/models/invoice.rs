//! Invoice entity model.

use hms_core::billing::{refund_due, PaymentStatus};
use hms_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `invoices` table. One per appointment.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invoice {
    pub id: DbId,
    pub appointment_id: DbId,
    pub patient_id: DbId,
    pub amount_cents: i64,
    #[sqlx(try_from = "String")]
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing)]
    pub payment_intent_ref: Option<String>,
    #[serde(skip_serializing)]
    pub provider_invoice_ref: Option<String>,
    pub refunded: bool,
    pub refund_id: Option<String>,
    pub refunded_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Invoice {
    pub fn refund_due(&self) -> bool {
        refund_due(self.payment_status, self.refunded)
    }
}
