/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Calendar day an appointment is booked on. Day granularity only.
pub type AppointmentDate = chrono::NaiveDate;
