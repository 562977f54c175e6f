/// Errors from the payment provider layer.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Payment provider error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// No payment intent is recorded for the invoice being refunded.
    #[error("Invoice {0} has no payment intent to refund")]
    MissingPaymentIntent(String),

    /// Gateway credentials were not configured.
    #[error("Payment provider is not configured")]
    NotConfigured,
}
