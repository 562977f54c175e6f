use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hms_appointments::store::postgres::PgStore;
use hms_appointments::{ReminderScheduler, Stores};
use hms_core::clock::{Clock, SystemClock};
use hms_payments::StripeGateway;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hms_api::config::ServerConfig;
use hms_api::router::build_app_router;
use hms_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hms_api=debug,hms_appointments=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = hms_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    hms_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    hms_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Collaborators ---
    let stores = Stores::shared(Arc::new(PgStore::new(pool)));
    if config.payments.secret_key.is_none() {
        tracing::warn!("PAYMENT_SECRET_KEY not set; refunds will fail and be logged");
    }
    let payments = Arc::new(StripeGateway::new(config.payments.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // --- Reminder scheduler ---
    let reminder_cancel = CancellationToken::new();
    let scheduler = ReminderScheduler::new(stores.clone(), Arc::clone(&clock), config.reminders);
    let scheduler_cancel = reminder_cancel.clone();
    let reminder_handle = tokio::spawn(async move {
        scheduler.run(scheduler_cancel).await;
    });

    // --- App state + router ---
    let state = AppState::new(config.clone(), stores, payments, clock);
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    reminder_cancel.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(grace, reminder_handle).await.is_err() {
        tracing::warn!("Reminder scheduler did not stop within the shutdown timeout");
    } else {
        tracing::info!("Reminder scheduler stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
