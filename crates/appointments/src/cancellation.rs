//! Admin cancellation with refund.
//!
//! A paid, unrefunded invoice is refunded before the appointment is marked
//! cancelled. Refund problems, including a provider that never answers, are
//! logged and never block the cancellation; the caller learns whether money
//! moved through [`CancellationOutcome::refund_processed`].

use std::sync::Arc;
use std::time::Duration;

use hms_core::appointment::AppointmentStatus;
use hms_core::clock::Clock;
use hms_core::error::CoreError;
use hms_core::types::DbId;
use hms_db::models::appointment::Appointment;
use hms_db::models::invoice::Invoice;
use hms_payments::{PaymentError, PaymentGateway};
use serde::Serialize;

use crate::booking::concurrent_change;
use crate::error::{RefundError, ServiceResult};
use crate::store::Stores;

/// Default bound on the whole refund step.
const DEFAULT_REFUND_TIMEOUT: Duration = Duration::from_secs(15);

/// Status compare-and-set attempts before reporting a conflict.
const MAX_CANCEL_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationOutcome {
    pub appointment: Appointment,
    pub refund_processed: bool,
}

#[derive(Clone)]
pub struct CancellationService {
    stores: Stores,
    payments: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    refund_timeout: Duration,
}

impl CancellationService {
    pub fn new(stores: Stores, payments: Arc<dyn PaymentGateway>, clock: Arc<dyn Clock>) -> Self {
        Self {
            stores,
            payments,
            clock,
            refund_timeout: DEFAULT_REFUND_TIMEOUT,
        }
    }

    /// Bound the refund step (intent lookup, refund and bookkeeping).
    pub fn with_refund_timeout(mut self, timeout: Duration) -> Self {
        self.refund_timeout = timeout;
        self
    }

    /// Cancel an appointment, refunding its invoice when one is due.
    pub async fn cancel(&self, id: DbId, reason: Option<&str>) -> ServiceResult<CancellationOutcome> {
        let current = self
            .stores
            .appointments
            .find(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Appointment", id))?;
        current.status.ensure_cancellable()?;

        let invoice = match self.stores.invoices.find_for_appointment(id).await {
            Ok(invoice) => invoice,
            Err(e) => {
                tracing::warn!(appointment_id = id, error = %e, "Invoice lookup failed, cancelling without refund");
                None
            }
        };

        let invoice = match invoice {
            Some(invoice) if invoice.refund_due() => Some(self.try_refund(invoice).await),
            other => other,
        };
        let refund_processed = invoice.as_ref().is_some_and(|i| i.refunded);

        let appointment = self.mark_cancelled(current, reason).await?;

        tracing::info!(appointment_id = id, refund_processed, "Appointment cancelled");
        Ok(CancellationOutcome {
            appointment,
            refund_processed,
        })
    }

    /// Move the appointment to `Cancelled`.
    ///
    /// The status may have moved while the refund was in flight (a patient
    /// filing a cancellation request, say). The compare-and-set is retried
    /// against the fresh status for as long as it stays cancellable.
    async fn mark_cancelled(
        &self,
        mut current: Appointment,
        reason: Option<&str>,
    ) -> ServiceResult<Appointment> {
        let id = current.id;
        for _ in 0..MAX_CANCEL_ATTEMPTS {
            if let Some(cancelled) = self
                .stores
                .appointments
                .transition(id, current.status, AppointmentStatus::Cancelled, reason)
                .await?
            {
                return Ok(cancelled);
            }

            current = self
                .stores
                .appointments
                .find(id)
                .await?
                .ok_or_else(|| CoreError::not_found("Appointment", id))?;
            if current.status == AppointmentStatus::Cancelled {
                return Ok(current);
            }
            if let Err(e) = current.status.ensure_cancellable() {
                tracing::warn!(appointment_id = id, status = %current.status, "Appointment left the cancellable states during cancellation");
                return Err(e.into());
            }
        }
        Err(concurrent_change(id).into())
    }

    /// Refund `invoice`, returning its latest state. Failures and timeouts are
    /// logged and leave the invoice unchanged.
    async fn try_refund(&self, invoice: Invoice) -> Invoice {
        match tokio::time::timeout(self.refund_timeout, self.refund(&invoice)).await {
            Ok(Ok(updated)) => updated,
            Ok(Err(e)) => {
                tracing::error!(
                    invoice_id = invoice.id,
                    appointment_id = invoice.appointment_id,
                    error = %e,
                    "Refund failed"
                );
                invoice
            }
            Err(_) => {
                tracing::error!(
                    invoice_id = invoice.id,
                    appointment_id = invoice.appointment_id,
                    timeout_secs = self.refund_timeout.as_secs(),
                    "Refund timed out"
                );
                invoice
            }
        }
    }

    async fn refund(&self, invoice: &Invoice) -> Result<Invoice, RefundError> {
        let payment_intent = self.payment_intent(invoice).await?;
        let refund_id = self.payments.create_refund(&payment_intent).await?;

        match self
            .stores
            .invoices
            .mark_refunded(invoice.id, &refund_id, self.clock.now())
            .await
        {
            Ok(Some(updated)) => {
                tracing::info!(invoice_id = invoice.id, refund_id = %refund_id, "Invoice refunded");
                Ok(updated)
            }
            // Another writer recorded the refund first.
            Ok(None) => Ok(self
                .stores
                .invoices
                .find_for_appointment(invoice.appointment_id)
                .await?
                .unwrap_or_else(|| invoice.clone())),
            Err(e) => {
                tracing::error!(
                    invoice_id = invoice.id,
                    refund_id = %refund_id,
                    "Refund issued but not recorded"
                );
                Err(e.into())
            }
        }
    }

    /// Stored payment intent, or the one on the provider's invoice.
    async fn payment_intent(&self, invoice: &Invoice) -> Result<String, PaymentError> {
        if let Some(intent) = &invoice.payment_intent_ref {
            return Ok(intent.clone());
        }
        let invoice_ref = invoice
            .provider_invoice_ref
            .as_deref()
            .ok_or_else(|| PaymentError::MissingPaymentIntent(invoice.id.to_string()))?;
        self.payments
            .retrieve_invoice(invoice_ref)
            .await?
            .payment_intent
            .ok_or_else(|| PaymentError::MissingPaymentIntent(invoice_ref.to_string()))
    }
}
