//! Integration tests for the task queue runner: retry/backoff policy,
//! terminal failures, FIFO order, batching, and failure containment.

mod common;

use std::sync::{Arc, Mutex};

use bookd_core::tasks::task_type;
use bookd_db::models::status::TaskStatus;
use bookd_db::models::task::NewTask;
use bookd_db::repositories::TaskRepo;
use bookd_queue::{HandlerRegistry, TaskRunner};
use chrono::{Duration, Utc};
use common::*;
use serde_json::json;
use sqlx::PgPool;

/// Enqueue a `notify_admin` task (the simplest valid payload) and return
/// its id.
async fn enqueue_notify(pool: &PgPool, org_id: i64, lead_id: i64) -> i64 {
    TaskRepo::enqueue(
        pool,
        &NewTask {
            org_id,
            lead_id,
            task_type: task_type::NOTIFY_ADMIN.to_string(),
            payload: json!({ "reason": "test" }),
            run_at: None,
        },
    )
    .await
    .unwrap()
    .id
}

fn runner_with(ctx: bookd_queue::HandlerContext, registry: HandlerRegistry) -> TaskRunner {
    TaskRunner::new(ctx, registry)
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// A handler that fails twice then succeeds ends `done` with
/// `retry_count = 2`.
#[sqlx::test(migrations = "../../db/migrations")]
async fn task_succeeds_on_third_attempt(pool: PgPool) {
    let org_id = insert_org(&pool, json!({})).await;
    let lead_id = insert_lead(&pool, org_id).await;
    let task_id = enqueue_notify(&pool, org_id, lead_id).await;

    let (ctx, _, _) = mock_context(pool.clone());
    let mut registry = HandlerRegistry::new();
    registry.register(task_type::NOTIFY_ADMIN, Box::new(FlakyHandler::new(2)));
    let runner = runner_with(ctx, registry);

    // Attempt 1: fails, re-queued with retry_count 1.
    let report = runner.run_batch().await.unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.processed, 0);

    let task = TaskRepo::find_by_id(&pool, task_id).await.unwrap().unwrap();
    assert_eq!(task.status_id, TaskStatus::Queued.id());
    assert_eq!(task.retry_count, 1);

    // Attempt 2: fails again.
    make_all_due(&pool).await;
    runner.run_batch().await.unwrap();
    let task = TaskRepo::find_by_id(&pool, task_id).await.unwrap().unwrap();
    assert_eq!(task.retry_count, 2);
    assert_eq!(task.status_id, TaskStatus::Queued.id());

    // Attempt 3: succeeds. retry_count stays at 2.
    make_all_due(&pool).await;
    let report = runner.run_batch().await.unwrap();
    assert_eq!(report.processed, 1);

    let task = TaskRepo::find_by_id(&pool, task_id).await.unwrap().unwrap();
    assert_eq!(task.status_id, TaskStatus::Done.id());
    assert_eq!(task.retry_count, 2);
}

/// A handler that always fails is failed permanently after 3 attempts and
/// never selected again.
#[sqlx::test(migrations = "../../db/migrations")]
async fn task_fails_permanently_after_three_attempts(pool: PgPool) {
    let org_id = insert_org(&pool, json!({})).await;
    let lead_id = insert_lead(&pool, org_id).await;
    let task_id = enqueue_notify(&pool, org_id, lead_id).await;

    let (ctx, _, _) = mock_context(pool.clone());
    let mut registry = HandlerRegistry::new();
    registry.register(task_type::NOTIFY_ADMIN, Box::new(FlakyHandler::new(usize::MAX)));
    let runner = runner_with(ctx, registry);

    for _ in 0..3 {
        make_all_due(&pool).await;
        runner.run_batch().await.unwrap();
    }

    let task = TaskRepo::find_by_id(&pool, task_id).await.unwrap().unwrap();
    assert_eq!(task.status_id, TaskStatus::Failed.id());
    assert_eq!(task.retry_count, 3);
    assert!(task.last_error.is_some());

    // Excluded from all future polls, even when nominally "due".
    make_all_due(&pool).await;
    let report = runner.run_batch().await.unwrap();
    assert_eq!(report.total, 0);

    // One task_error event per failed attempt.
    assert_eq!(count_events(&pool, org_id, "task_error").await, 3);
}

/// The first retry is delayed by one minute, the second by four.
#[sqlx::test(migrations = "../../db/migrations")]
async fn retry_backoff_increases(pool: PgPool) {
    let org_id = insert_org(&pool, json!({})).await;
    let lead_id = insert_lead(&pool, org_id).await;
    let task_id = enqueue_notify(&pool, org_id, lead_id).await;

    let (ctx, _, _) = mock_context(pool.clone());
    let mut registry = HandlerRegistry::new();
    registry.register(task_type::NOTIFY_ADMIN, Box::new(FlakyHandler::new(usize::MAX)));
    let runner = runner_with(ctx, registry);

    runner.run_batch().await.unwrap();
    let task = TaskRepo::find_by_id(&pool, task_id).await.unwrap().unwrap();
    let now = Utc::now();
    assert!(task.run_at > now + Duration::seconds(30));
    assert!(task.run_at < now + Duration::minutes(2));

    // Not due yet: the runner must not pick it up again.
    let report = runner.run_batch().await.unwrap();
    assert_eq!(report.total, 0);

    make_all_due(&pool).await;
    runner.run_batch().await.unwrap();
    let task = TaskRepo::find_by_id(&pool, task_id).await.unwrap().unwrap();
    let now = Utc::now();
    assert!(task.run_at > now + Duration::minutes(3));
    assert!(task.run_at < now + Duration::minutes(5));
}

// ---------------------------------------------------------------------------
// Terminal failures
// ---------------------------------------------------------------------------

/// An unknown task type is a configuration error: failed immediately, no
/// retries.
#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_task_type_fails_without_retry(pool: PgPool) {
    let org_id = insert_org(&pool, json!({})).await;
    let lead_id = insert_lead(&pool, org_id).await;
    let task = TaskRepo::enqueue(
        &pool,
        &NewTask {
            org_id,
            lead_id,
            task_type: "no_such_type".to_string(),
            payload: json!({}),
            run_at: None,
        },
    )
    .await
    .unwrap();

    let (ctx, _, _) = mock_context(pool.clone());
    let runner = runner_with(ctx, HandlerRegistry::with_default_handlers());

    let report = runner.run_batch().await.unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.processed, 0);

    let task = TaskRepo::find_by_id(&pool, task.id).await.unwrap().unwrap();
    assert_eq!(task.status_id, TaskStatus::Failed.id());
    assert_eq!(task.retry_count, 0, "configuration errors are not retried");
    assert_eq!(count_events(&pool, org_id, "task_error").await, 1);
}

/// A payload that does not match its type's schema is also terminal.
#[sqlx::test(migrations = "../../db/migrations")]
async fn malformed_payload_fails_without_retry(pool: PgPool) {
    let org_id = insert_org(&pool, json!({})).await;
    let lead_id = insert_lead(&pool, org_id).await;
    let task = TaskRepo::enqueue(
        &pool,
        &NewTask {
            org_id,
            lead_id,
            task_type: task_type::NOTIFY_ADMIN.to_string(),
            // Missing the required `reason` field.
            payload: json!({ "bogus": true }),
            run_at: None,
        },
    )
    .await
    .unwrap();

    let (ctx, _, _) = mock_context(pool.clone());
    let runner = runner_with(ctx, HandlerRegistry::with_default_handlers());

    runner.run_batch().await.unwrap();

    let task = TaskRepo::find_by_id(&pool, task.id).await.unwrap().unwrap();
    assert_eq!(task.status_id, TaskStatus::Failed.id());
    assert_eq!(task.retry_count, 0);
}

// ---------------------------------------------------------------------------
// Ordering, batching, containment
// ---------------------------------------------------------------------------

/// Tasks run oldest-first, and a failing task does not abort the rest of
/// the batch.
#[sqlx::test(migrations = "../../db/migrations")]
async fn failure_does_not_abort_batch(pool: PgPool) {
    let org_id = insert_org(&pool, json!({})).await;
    let lead_id = insert_lead(&pool, org_id).await;

    let first = enqueue_notify(&pool, org_id, lead_id).await;
    let poison = TaskRepo::enqueue(
        &pool,
        &NewTask {
            org_id,
            lead_id,
            task_type: "no_such_type".to_string(),
            payload: json!({}),
            run_at: None,
        },
    )
    .await
    .unwrap()
    .id;
    let last = enqueue_notify(&pool, org_id, lead_id).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let (ctx, _, _) = mock_context(pool.clone());
    let mut registry = HandlerRegistry::new();
    registry.register(
        task_type::NOTIFY_ADMIN,
        Box::new(RecordingHandler {
            seen: Arc::clone(&seen),
        }),
    );
    let runner = runner_with(ctx, registry);

    let report = runner.run_batch().await.unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.processed, 2);

    assert_eq!(*seen.lock().unwrap(), vec![first, last], "FIFO order");

    let poison = TaskRepo::find_by_id(&pool, poison).await.unwrap().unwrap();
    assert_eq!(poison.status_id, TaskStatus::Failed.id());
}

/// One invocation claims at most 20 tasks; the rest wait for the next poll.
#[sqlx::test(migrations = "../../db/migrations")]
async fn batch_is_capped_at_twenty(pool: PgPool) {
    let org_id = insert_org(&pool, json!({})).await;
    let lead_id = insert_lead(&pool, org_id).await;
    for _ in 0..25 {
        enqueue_notify(&pool, org_id, lead_id).await;
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let (ctx, _, _) = mock_context(pool.clone());
    let mut registry = HandlerRegistry::new();
    registry.register(
        task_type::NOTIFY_ADMIN,
        Box::new(RecordingHandler {
            seen: Arc::clone(&seen),
        }),
    );
    let runner = runner_with(ctx, registry);

    let report = runner.run_batch().await.unwrap();
    assert_eq!(report.total, 20);
    assert_eq!(report.processed, 20);

    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE status_id = $1")
            .bind(TaskStatus::Queued.id())
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 5);

    let report = runner.run_batch().await.unwrap();
    assert_eq!(report.total, 5);
}

/// Nothing due means an empty report, not an error.
#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_queue_reports_zero(pool: PgPool) {
    let (ctx, _, _) = mock_context(pool.clone());
    let runner = runner_with(ctx, HandlerRegistry::with_default_handlers());
    let report = runner.run_batch().await.unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(report.processed, 0);
}
