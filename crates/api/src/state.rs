use std::sync::Arc;
use std::time::Duration;

use hms_appointments::{BookingService, CancellationService, Stores};
use hms_core::clock::Clock;
use hms_payments::PaymentGateway;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is an `Arc` or a bundle of `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Persistence collaborators, for reads that need no business rules.
    pub stores: Stores,
    pub booking: BookingService,
    pub cancellation: CancellationService,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        stores: Stores,
        payments: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // Intent lookup plus refund, kept inside the request deadline.
        let refund_secs = (config.payments.timeout_secs * 2)
            .min(config.request_timeout_secs.saturating_sub(5))
            .max(1);
        Self {
            config: Arc::new(config),
            booking: BookingService::new(stores.clone(), Arc::clone(&clock)),
            cancellation: CancellationService::new(stores.clone(), payments, clock)
                .with_refund_timeout(Duration::from_secs(refund_secs)),
            stores,
        }
    }
}
