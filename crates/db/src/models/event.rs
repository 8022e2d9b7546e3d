//! Event entity model.

use bookd_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the append-only `events` table. Emitted on every state
/// transition; never mutated or deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub org_id: DbId,
    pub event_type: String,
    pub lead_id: Option<DbId>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}
