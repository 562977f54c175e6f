//! Payment provider collaborator.
//!
//! [`PaymentGateway`] is the narrow interface the cancellation flow consumes:
//! issue a refund against a payment intent, and look up a provider invoice to
//! find its payment intent. [`StripeGateway`] implements it over the
//! provider's REST API with [`reqwest`].

pub mod error;
pub mod stripe;

use async_trait::async_trait;
use serde::Deserialize;

pub use error::PaymentError;
pub use stripe::{PaymentConfig, StripeGateway};

/// Provider-side view of an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderInvoice {
    /// Provider status string, e.g. `"paid"` or `"open"`.
    pub status: Option<String>,
    /// Payment intent the invoice was settled with, if any.
    pub payment_intent: Option<String>,
}

/// External payment service. Fallible and possibly slow.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Refund the full amount of a payment intent, returning the refund id.
    async fn create_refund(&self, payment_intent_ref: &str) -> Result<String, PaymentError>;

    /// Fetch a provider invoice.
    async fn retrieve_invoice(&self, invoice_ref: &str) -> Result<ProviderInvoice, PaymentError>;
}
