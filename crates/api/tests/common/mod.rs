//! Shared harness for API integration tests.
//!
//! Builds the production router over the in-memory store and a recording
//! payment gateway, so tests run without PostgreSQL or network access.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use hms_api::auth::jwt::{generate_access_token, JwtConfig};
use hms_api::config::ServerConfig;
use hms_api::router::build_app_router;
use hms_api::state::AppState;
use hms_appointments::testing::{InMemoryStore, StubGateway};
use hms_appointments::{ReminderConfig, Stores};
use hms_core::clock::ManualClock;
use hms_core::types::DbId;
use hms_payments::PaymentConfig;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        reminders: ReminderConfig::default(),
        payments: PaymentConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            secret_key: None,
            timeout_secs: 5,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<StubGateway>,
    pub config: ServerConfig,
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(StubGateway::new())
}

pub fn build_test_app_with(gateway: StubGateway) -> TestApp {
    let config = test_config();
    let store = Arc::new(InMemoryStore::new());
    let gateway = Arc::new(gateway);
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
    ));

    let state = AppState::new(
        config.clone(),
        Stores::shared(store.clone()),
        gateway.clone(),
        clock,
    );
    let router = build_app_router(state, &config);

    TestApp {
        router,
        store,
        gateway,
        config,
    }
}

impl TestApp {
    pub fn token(&self, user_id: DbId, role: &str) -> String {
        generate_access_token(user_id, role, &self.config.jwt).unwrap()
    }

    /// Send a request and return the status with the parsed JSON body
    /// (`Value::Null` for empty bodies).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, serde_json::Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(
        &self,
        uri: &str,
        token: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }
}
