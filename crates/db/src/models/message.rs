//! Message log and message template entity models.

use bookd_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Message direction values stored in `messages.direction`.
pub mod direction {
    pub const OUTBOUND: &str = "outbound";
    pub const INBOUND: &str = "inbound";
}

/// A row from the `messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub org_id: DbId,
    pub lead_id: DbId,
    pub channel: String,
    pub direction: String,
    pub body: String,
    pub provider_id: Option<String>,
    pub created_at: Timestamp,
}

/// A row from the `message_templates` table. Bodies use `{{variable}}`
/// placeholders rendered by `bookd_core::templates`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageTemplate {
    pub id: DbId,
    pub org_id: DbId,
    pub channel: String,
    pub name: String,
    pub body: String,
    pub created_at: Timestamp,
}
