//! Org entity model.

use bookd_core::availability::SlotStrategy;
use bookd_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `orgs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Org {
    pub id: DbId,
    pub name: String,
    /// Free-form configuration JSON: `slot_strategy`, `notification_email`.
    pub config: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Org {
    /// The org's slot strategy, falling back to the platform default when
    /// absent or malformed.
    pub fn slot_strategy(&self) -> SlotStrategy {
        self.config
            .get("slot_strategy")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Email address for internal notifications, when configured.
    pub fn notification_email(&self) -> Option<&str> {
        self.config.get("notification_email").and_then(|v| v.as_str())
    }
}
