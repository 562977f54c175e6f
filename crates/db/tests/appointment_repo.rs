//! Integration tests for the appointment and invoice repositories.
//!
//! Exercises the repository layer against a real database. Run with
//! `DATABASE_URL` pointing at a disposable PostgreSQL instance and
//! `--ignored`.

use chrono::{NaiveDate, Utc};
use hms_core::appointment::AppointmentStatus;
use hms_core::billing::PaymentStatus;
use hms_core::types::DbId;
use hms_db::models::appointment::{CreateAppointment, UpdateAppointment};
use hms_db::repositories::{AppointmentRepo, InvoiceRepo, NotificationRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_patient(pool: &PgPool, user_id: DbId) -> DbId {
    sqlx::query_scalar("INSERT INTO patients (user_id, name) VALUES ($1, 'Pat') RETURNING id")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn seed_doctor(pool: &PgPool, user_id: DbId, shift: &str) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO doctors (user_id, name, shift) VALUES ($1, 'Dr. Who', $2) RETURNING id",
    )
    .bind(user_id)
    .bind(shift)
    .fetch_one(pool)
    .await
    .unwrap()
}

fn june_10() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

fn booking(patient_id: DbId, doctor_id: DbId, time: &str) -> CreateAppointment {
    CreateAppointment {
        patient_id,
        doctor_id,
        date: june_10(),
        time: time.to_string(),
        status: AppointmentStatus::Scheduled,
    }
}

// ---------------------------------------------------------------------------
// Active-slot uniqueness
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn second_active_booking_violates_slot_index(pool: PgPool) {
    let patient = seed_patient(&pool, 1).await;
    let doctor = seed_doctor(&pool, 2, "morning").await;

    AppointmentRepo::create(&pool, &booking(patient, doctor, "10:00"))
        .await
        .unwrap();
    let err = AppointmentRepo::create(&pool, &booking(patient, doctor, "10:00"))
        .await
        .unwrap_err();

    assert!(hms_db::is_slot_conflict(&err));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cancelled_booking_frees_the_slot(pool: PgPool) {
    let patient = seed_patient(&pool, 1).await;
    let doctor = seed_doctor(&pool, 2, "morning").await;

    let first = AppointmentRepo::create(&pool, &booking(patient, doctor, "10:00"))
        .await
        .unwrap();
    AppointmentRepo::transition(
        &pool,
        first.id,
        AppointmentStatus::Scheduled,
        AppointmentStatus::Cancelled,
        Some("patient travelling"),
    )
    .await
    .unwrap()
    .unwrap();

    let booked = AppointmentRepo::booked_times(&pool, doctor, june_10()).await.unwrap();
    assert!(booked.is_empty());

    AppointmentRepo::create(&pool, &booking(patient, doctor, "10:00"))
        .await
        .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn transition_is_guarded_on_current_status(pool: PgPool) {
    let patient = seed_patient(&pool, 1).await;
    let doctor = seed_doctor(&pool, 2, "morning").await;
    let appt = AppointmentRepo::create(&pool, &booking(patient, doctor, "12:00"))
        .await
        .unwrap();

    let stale = AppointmentRepo::transition(
        &pool,
        appt.id,
        AppointmentStatus::Rescheduled,
        AppointmentStatus::Completed,
        None,
    )
    .await
    .unwrap();
    assert!(stale.is_none());
}

// ---------------------------------------------------------------------------
// Partial update and reminder claim
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn partial_update_leaves_unset_fields(pool: PgPool) {
    let patient = seed_patient(&pool, 1).await;
    let doctor = seed_doctor(&pool, 2, "morning").await;
    let created = AppointmentRepo::create(&pool, &booking(patient, doctor, "09:00"))
        .await
        .unwrap();

    let update = UpdateAppointment {
        time: Some("11:00".into()),
        ..Default::default()
    };
    let updated = AppointmentRepo::update(&pool, created.id, &update)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.time, "11:00");
    assert_eq!(updated.date, created.date);
    assert_eq!(updated.status, AppointmentStatus::Scheduled);
    assert!(!updated.reminder_sent);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn reminder_claim_succeeds_once(pool: PgPool) {
    let patient = seed_patient(&pool, 1).await;
    let doctor = seed_doctor(&pool, 2, "night").await;
    let created = AppointmentRepo::create(&pool, &booking(patient, doctor, "18:00"))
        .await
        .unwrap();

    assert!(AppointmentRepo::claim_reminder(&pool, created.id).await.unwrap());
    assert!(!AppointmentRepo::claim_reminder(&pool, created.id).await.unwrap());

    AppointmentRepo::release_reminder(&pool, created.id).await.unwrap();
    assert!(AppointmentRepo::claim_reminder(&pool, created.id).await.unwrap());
}

// ---------------------------------------------------------------------------
// Invoices and notifications
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn mark_refunded_is_one_shot(pool: PgPool) {
    let patient = seed_patient(&pool, 1).await;
    let doctor = seed_doctor(&pool, 2, "evening").await;
    let appt = AppointmentRepo::create(&pool, &booking(patient, doctor, "14:00"))
        .await
        .unwrap();
    let invoice_id: DbId = sqlx::query_scalar(
        "INSERT INTO invoices (appointment_id, patient_id, amount_cents, payment_status, payment_intent_ref) \
         VALUES ($1, $2, 5000, 'paid', 'pi_123') RETURNING id",
    )
    .bind(appt.id)
    .bind(patient)
    .fetch_one(&pool)
    .await
    .unwrap();

    let refunded = InvoiceRepo::mark_refunded(&pool, invoice_id, "re_1", Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
    assert!(refunded.refunded);

    let again = InvoiceRepo::mark_refunded(&pool, invoice_id, "re_2", Utc::now())
        .await
        .unwrap();
    assert!(again.is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn notifications_unread_count(pool: PgPool) {
    let id = NotificationRepo::create(&pool, 7, "Appointment Reminder", "hello")
        .await
        .unwrap();
    assert_eq!(NotificationRepo::unread_count(&pool, 7).await.unwrap(), 1);

    assert!(NotificationRepo::mark_read(&pool, id, 7).await.unwrap());
    assert_eq!(NotificationRepo::unread_count(&pool, 7).await.unwrap(), 0);
}
