//! Appointment entity model.

use bookd_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `appointments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Appointment {
    pub id: DbId,
    pub org_id: DbId,
    pub lead_id: DbId,
    /// The hold this appointment was created alongside.
    pub hold_id: Option<DbId>,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    pub status_id: StatusId,
    pub calendar_event_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
