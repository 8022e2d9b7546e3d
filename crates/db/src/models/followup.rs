//! Follow-up rule entity model.

use bookd_core::tasks::Channel;
use bookd_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One step of a follow-up sequence, stored inside `followup_rules.steps`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowupStep {
    pub delay_hours: i64,
    pub channel: Channel,
    pub template_name: String,
}

/// A row from the `followup_rules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FollowupRule {
    pub id: DbId,
    pub org_id: DbId,
    pub trigger: String,
    pub steps: serde_json::Value,
    pub enabled: bool,
    pub created_at: Timestamp,
}

impl FollowupRule {
    /// Deserialize the rule's step list. A malformed rule yields an error
    /// rather than silently dropping steps.
    pub fn steps(&self) -> Result<Vec<FollowupStep>, serde_json::Error> {
        serde_json::from_value(self.steps.clone())
    }
}
