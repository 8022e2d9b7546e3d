//! Per-org provider connection entity model.

use bookd_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Connection kind values stored in `org_connections.kind`.
pub mod kind {
    pub const CALENDAR: &str = "calendar";
    pub const PAYMENT: &str = "payment";
    pub const SMS: &str = "sms";
}

/// Provider names stored in `org_connections.provider`.
pub mod provider {
    pub const GOOGLE: &str = "google";
    pub const MICROSOFT: &str = "microsoft";
    pub const STRIPE: &str = "stripe";
    pub const TWILIO: &str = "twilio";
}

/// A row from the `org_connections` table. `config_encrypted` holds the
/// provider credentials, AES-256-GCM encrypted by `bookd_core::crypto`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrgConnection {
    pub id: DbId,
    pub org_id: DbId,
    pub kind: String,
    pub provider: String,
    pub config_encrypted: String,
    pub calendar_id: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
