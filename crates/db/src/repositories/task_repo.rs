//! Repository for the `tasks` table.
//!
//! The runner owns every status/run_at/retry_count mutation here. Claiming
//! uses `FOR UPDATE SKIP LOCKED` so overlapping runner invocations never
//! pick up the same due task.

use bookd_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::status::TaskStatus;
use crate::models::task::{NewTask, Task};

/// Column list for `tasks` queries.
const COLUMNS: &str = "\
    id, org_id, lead_id, task_type, payload, status_id, run_at, \
    retry_count, last_error, created_at, updated_at";

/// Provides queue operations for durable tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Enqueue a new task. `run_at = None` means due immediately.
    pub async fn enqueue(pool: &PgPool, input: &NewTask) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (org_id, lead_id, task_type, payload, status_id, run_at) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW())) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(input.org_id)
            .bind(input.lead_id)
            .bind(&input.task_type)
            .bind(&input.payload)
            .bind(TaskStatus::Queued.id())
            .bind(input.run_at)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the oldest due task, marking it `running`.
    ///
    /// `FOR UPDATE SKIP LOCKED` skips rows already claimed by a concurrent
    /// invocation, so the same task is never dispatched twice.
    pub async fn claim_next_due(pool: &PgPool) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks \
             SET status_id = $1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM tasks \
                 WHERE status_id = $2 AND run_at <= NOW() \
                 ORDER BY created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(TaskStatus::Running.id())
            .bind(TaskStatus::Queued.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a task as successfully completed.
    pub async fn complete(pool: &PgPool, task_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET status_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(task_id)
            .bind(TaskStatus::Done.id())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Re-queue a failed task for another attempt at `run_at`.
    ///
    /// `retry_count` is the new (already incremented) attempt count;
    /// `run_at` must not be earlier than the previous one.
    pub async fn requeue_for_retry(
        pool: &PgPool,
        task_id: DbId,
        retry_count: i32,
        run_at: Timestamp,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tasks \
             SET status_id = $2, retry_count = $3, run_at = $4, last_error = $5, \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(task_id)
        .bind(TaskStatus::Queued.id())
        .bind(retry_count)
        .bind(run_at)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a task as permanently failed. Failed tasks are never
    /// re-selected by [`claim_next_due`](Self::claim_next_due).
    pub async fn fail(
        pool: &PgPool,
        task_id: DbId,
        retry_count: i32,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tasks \
             SET status_id = $2, retry_count = $3, last_error = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(task_id)
        .bind(TaskStatus::Failed.id())
        .bind(retry_count)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find a task by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
