//! Appointment scheduling services.
//!
//! - [`booking::BookingService`] computes free slots, books and reschedules
//!   appointments, and negotiates alternatives when a slot is taken.
//! - [`cancellation::CancellationService`] cancels appointments and refunds
//!   paid invoices through a [`hms_payments::PaymentGateway`].
//! - [`reminder::ReminderScheduler`] periodically notifies patients about
//!   appointments starting within the lookahead window.
//!
//! All services talk to persistence through the traits in [`store`], so they
//! run unchanged against PostgreSQL ([`store::postgres::PgStore`]) or the
//! in-memory store used by the test suites.

pub mod booking;
pub mod cancellation;
pub mod error;
pub mod reminder;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use booking::{BookingOutcome, BookingService, NewBooking, SlotNegotiation};
pub use cancellation::{CancellationOutcome, CancellationService};
pub use error::{ServiceError, ServiceResult, StoreError};
pub use reminder::{ReminderConfig, ReminderScheduler, SweepReport};
pub use store::Stores;
