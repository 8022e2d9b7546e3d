//! Payment entity model.

use bookd_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `payments` table: one payment intent at the provider.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: DbId,
    pub org_id: DbId,
    pub lead_id: DbId,
    pub provider: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status_id: StatusId,
    pub external_id: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
