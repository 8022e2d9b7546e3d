//! Integration tests for the task queue trigger endpoint.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_bearer_token_is_401(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(app, "/api/v1/cron/run-tasks").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wrong_bearer_token_is_401(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get_with_bearer(app, "/api/v1/cron/run-tasks", "wrong-secret").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_queue_reports_zero_counts(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get_with_bearer(app, "/api/v1/cron/run-tasks", TEST_CRON_SECRET).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["processed"], 0);
    assert_eq!(json["total"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn due_tasks_are_processed_and_counted(pool: PgPool) {
    let org_id = insert_org(&pool, json!({})).await;
    let lead_id = insert_lead(&pool, org_id).await;

    sqlx::query(
        "INSERT INTO tasks (org_id, lead_id, task_type, payload, status_id) \
         VALUES ($1, $2, 'notify_admin', '{\"reason\": \"cron test\"}'::jsonb, 1)",
    )
    .bind(org_id)
    .bind(lead_id)
    .execute(&pool)
    .await
    .unwrap();

    let app = build_test_app(pool.clone());
    let response = get_with_bearer(app, "/api/v1/cron/run-tasks", TEST_CRON_SECRET).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["processed"], 1);
    assert_eq!(json["total"], 1);

    let done: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE status_id = 3")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(done, 1);
}
