//! Task entity model and enqueue DTO for the durable task queue.

use bookd_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `tasks` table.
///
/// The runner owns `status_id`, `run_at`, `retry_count`, and `last_error`;
/// the handler for `task_type` owns the interpretation of `payload`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub org_id: DbId,
    pub lead_id: DbId,
    pub task_type: String,
    pub payload: serde_json::Value,
    pub status_id: StatusId,
    pub run_at: Timestamp,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for enqueueing a new task.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub org_id: DbId,
    pub lead_id: DbId,
    pub task_type: String,
    pub payload: serde_json::Value,
    /// When the task becomes due. `None` means immediately.
    pub run_at: Option<Timestamp>,
}
