//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod appointment_repo;
pub mod doctor_repo;
pub mod invoice_repo;
pub mod notification_repo;
pub mod patient_repo;

pub use appointment_repo::AppointmentRepo;
pub use doctor_repo::DoctorRepo;
pub use invoice_repo::InvoiceRepo;
pub use notification_repo::NotificationRepo;
pub use patient_repo::PatientRepo;
