//! Domain rules for the hospital appointment service.
//!
//! This crate has zero internal deps: shift timetables, slot arithmetic, the
//! appointment state machine and the reminder window are plain functions so
//! the repository layer, the services and the HTTP layer can all share them.

pub mod appointment;
pub mod billing;
pub mod clock;
pub mod error;
pub mod reminder;
pub mod roles;
pub mod shift;
pub mod slots;
pub mod types;
