use hms_core::error::CoreError;
use hms_payments::PaymentError;

/// Errors raised by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Another active appointment already holds the doctor/date/slot.
    #[error("Slot is already booked")]
    SlotTaken,

    /// Failure from a non-SQL backend.
    #[error("Store error: {0}")]
    Backend(String),
}

/// Errors returned by the scheduling services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Why a refund attempt did not complete. Never surfaced to callers of
/// [`CancellationService::cancel`](crate::cancellation::CancellationService::cancel).
#[derive(Debug, thiserror::Error)]
pub(crate) enum RefundError {
    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
