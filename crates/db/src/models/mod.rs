//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - Input DTOs for inserts and partial updates where the entity is mutable

pub mod appointment;
pub mod doctor;
pub mod invoice;
pub mod notification;
pub mod patient;
