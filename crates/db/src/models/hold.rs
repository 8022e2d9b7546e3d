//! Hold entity model.

use bookd_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `holds` table: a short-lived exclusive reservation on a
/// time range. Never deleted; expiry is the `expires_at < now` predicate.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Hold {
    pub id: DbId,
    pub org_id: DbId,
    pub lead_id: DbId,
    pub slot_start: Timestamp,
    pub slot_end: Timestamp,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl Hold {
    /// Whether the hold still reserves its slot at `now`.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.expires_at >= now
    }
}
