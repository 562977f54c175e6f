//! REST client for a Stripe-compatible payment API.
//!
//! Only the two calls the cancellation flow needs are wrapped: `POST
//! /v1/refunds` and `GET /v1/invoices/{id}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{PaymentError, PaymentGateway, ProviderInvoice};

/// Default provider base URL.
const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Payment provider configuration.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Base URL without trailing slash.
    pub api_base: String,
    /// Secret API key. Without it every call fails with
    /// [`PaymentError::NotConfigured`].
    pub secret_key: Option<String>,
    /// Upper bound on a single provider call, in seconds.
    pub timeout_secs: u64,
}

impl PaymentConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                | Default                  |
    /// |------------------------|--------------------------|
    /// | `PAYMENT_API_BASE`     | `https://api.stripe.com` |
    /// | `PAYMENT_SECRET_KEY`   | unset                    |
    /// | `PAYMENT_TIMEOUT_SECS` | `10`                     |
    pub fn from_env() -> Self {
        let api_base = std::env::var("PAYMENT_API_BASE")
            .unwrap_or_else(|_| DEFAULT_API_BASE.into())
            .trim_end_matches('/')
            .to_string();
        let secret_key = std::env::var("PAYMENT_SECRET_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        let timeout_secs: u64 = std::env::var("PAYMENT_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("PAYMENT_TIMEOUT_SECS must be a valid u64");

        Self {
            api_base,
            secret_key,
            timeout_secs,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    id: String,
}

/// HTTP client for the payment provider.
pub struct StripeGateway {
    client: reqwest::Client,
    config: PaymentConfig,
}

impl StripeGateway {
    pub fn new(config: PaymentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, config }
    }

    fn secret(&self) -> Result<&str, PaymentError> {
        self.config
            .secret_key
            .as_deref()
            .ok_or(PaymentError::NotConfigured)
    }

    /// Turn a non-2xx response into [`PaymentError::Api`], otherwise decode JSON.
    async fn parse_response<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_refund(&self, payment_intent_ref: &str) -> Result<String, PaymentError> {
        let response = self
            .client
            .post(format!("{}/v1/refunds", self.config.api_base))
            .bearer_auth(self.secret()?)
            .form(&[("payment_intent", payment_intent_ref)])
            .send()
            .await?;

        let refund: RefundResponse = Self::parse_response(response).await?;
        tracing::info!(refund_id = %refund.id, "Refund created");
        Ok(refund.id)
    }

    async fn retrieve_invoice(&self, invoice_ref: &str) -> Result<ProviderInvoice, PaymentError> {
        let response = self
            .client
            .get(format!("{}/v1/invoices/{invoice_ref}", self.config.api_base))
            .bearer_auth(self.secret()?)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn gateway(server: &MockServer) -> StripeGateway {
        StripeGateway::new(PaymentConfig {
            api_base: server.uri(),
            secret_key: Some("sk_test_123".into()),
            timeout_secs: 1,
        })
    }

    #[tokio::test]
    async fn create_refund_returns_refund_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/refunds"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(body_string_contains("payment_intent=pi_42"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "re_1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let refund_id = gateway(&server).create_refund("pi_42").await.unwrap();
        assert_eq!(refund_id, "re_1");
    }

    #[tokio::test]
    async fn provider_error_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/refunds"))
            .respond_with(ResponseTemplate::new(402).set_body_string("charge_already_refunded"))
            .mount(&server)
            .await;

        let err = gateway(&server).create_refund("pi_42").await.unwrap_err();
        match err {
            PaymentError::Api { status, body } => {
                assert_eq!(status, 402);
                assert_eq!(body, "charge_already_refunded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/refunds"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "re_1"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let err = gateway(&server).create_refund("pi_42").await.unwrap_err();
        match err {
            PaymentError::Request(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn retrieve_invoice_decodes_payment_intent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/invoices/in_7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "in_7",
                "status": "paid",
                "payment_intent": "pi_7",
            })))
            .mount(&server)
            .await;

        let invoice = gateway(&server).retrieve_invoice("in_7").await.unwrap();
        assert_eq!(invoice.status.as_deref(), Some("paid"));
        assert_eq!(invoice.payment_intent.as_deref(), Some("pi_7"));
    }

    #[tokio::test]
    async fn missing_secret_fails_without_calling_out() {
        let gateway = StripeGateway::new(PaymentConfig {
            api_base: "http://127.0.0.1:9".into(),
            secret_key: None,
            timeout_secs: 1,
        });
        let err = gateway.create_refund("pi_1").await.unwrap_err();
        assert!(matches!(err, PaymentError::NotConfigured));
    }
}
