//! Integration tests for the payment provider webhook.

mod common;

use axum::http::StatusCode;
use bookd_db::models::status::{AppointmentStatus, PaymentStatus, TaskStatus};
use chrono::{Duration, Utc};
use common::*;
use serde_json::json;
use sqlx::PgPool;

/// A pending_payment appointment plus its pending payment row, as the pay
/// endpoint leaves them.
async fn seed_pending_payment(pool: &PgPool, org_id: i64, lead_id: i64, external_id: &str) -> i64 {
    let start = Utc::now() + Duration::days(5);
    let end = start + Duration::hours(2);
    let appointment_id: i64 = sqlx::query_scalar(
        "INSERT INTO appointments (org_id, lead_id, start_at, end_at, status_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(org_id)
    .bind(lead_id)
    .bind(start)
    .bind(end)
    .bind(AppointmentStatus::PendingPayment.id())
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO payments (org_id, lead_id, provider, amount_cents, currency, status_id, external_id) \
         VALUES ($1, $2, 'stripe', 25000, 'usd', $3, $4)",
    )
    .bind(org_id)
    .bind(lead_id)
    .bind(PaymentStatus::Pending.id())
    .bind(external_id)
    .execute(pool)
    .await
    .unwrap();

    appointment_id
}

fn intent_event(
    event_type: &str,
    external_id: &str,
    org_id: i64,
    lead_id: i64,
    appointment_id: i64,
) -> serde_json::Value {
    json!({
        "type": event_type,
        "data": {
            "object": {
                "id": external_id,
                "metadata": {
                    "org_id": org_id.to_string(),
                    "lead_id": lead_id.to_string(),
                    "appointment_id": appointment_id.to_string(),
                }
            }
        }
    })
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn successful_payment_enqueues_confirmation_task(pool: PgPool) {
    let org_id = insert_org(&pool, json!({})).await;
    let lead_id = insert_lead(&pool, org_id).await;
    let appointment_id = seed_pending_payment(&pool, org_id, lead_id, "pi_hook_ok").await;

    let event = intent_event(
        "payment_intent.succeeded",
        "pi_hook_ok",
        org_id,
        lead_id,
        appointment_id,
    );
    let response = post_json(build_test_app(pool.clone()), "/api/v1/webhooks/payment", event).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["received"], true);

    // The webhook itself only enqueues; the runner does the work.
    let queued: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks WHERE task_type = 'confirm_payment' AND status_id = $1",
    )
    .bind(TaskStatus::Queued.id())
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(queued, 1);

    let status: i16 = sqlx::query_scalar("SELECT status_id FROM appointments WHERE id = $1")
        .bind(appointment_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, AppointmentStatus::PendingPayment.id());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_payment_releases_the_appointment(pool: PgPool) {
    let org_id = insert_org(&pool, json!({})).await;
    let lead_id = insert_lead(&pool, org_id).await;
    let appointment_id = seed_pending_payment(&pool, org_id, lead_id, "pi_hook_fail").await;

    let event = intent_event(
        "payment_intent.payment_failed",
        "pi_hook_fail",
        org_id,
        lead_id,
        appointment_id,
    );
    let response = post_json(build_test_app(pool.clone()), "/api/v1/webhooks/payment", event).await;
    assert_eq!(response.status(), StatusCode::OK);

    let status: i16 = sqlx::query_scalar("SELECT status_id FROM appointments WHERE id = $1")
        .bind(appointment_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, AppointmentStatus::Cancelled.id());

    let payment_status: i16 =
        sqlx::query_scalar("SELECT status_id FROM payments WHERE external_id = 'pi_hook_fail'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(payment_status, PaymentStatus::Failed.id());

    let events: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE event_type = 'payment_failed'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(events, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unrecognized_event_types_are_acknowledged(pool: PgPool) {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/webhooks/payment",
        json!({ "type": "customer.created", "data": { "object": {} } }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["received"], true);

    let tasks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(tasks, 0);
}
