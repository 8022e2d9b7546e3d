//! Lead entity model.
//!
//! The lead lifecycle is thin CRUD; only the `booked`/`lost` statuses
//! matter to the booking core (follow-up stop conditions).

use bookd_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Lead status values stored in `leads.status`.
pub mod lead_status {
    pub const NEW: &str = "new";
    pub const QUOTED: &str = "quoted";
    pub const BOOKED: &str = "booked";
    pub const LOST: &str = "lost";
}

/// A row from the `leads` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lead {
    pub id: DbId,
    pub org_id: DbId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
