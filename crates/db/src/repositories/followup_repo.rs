//! Repository for the `followup_rules` table.

use bookd_core::types::DbId;
use sqlx::PgPool;

use crate::models::followup::FollowupRule;

/// Column list for `followup_rules` queries.
const COLUMNS: &str = "id, org_id, trigger, steps, enabled, created_at";

/// Provides read operations for follow-up rules.
pub struct FollowupRepo;

impl FollowupRepo {
    /// Enabled rules for an org and trigger, oldest first.
    pub async fn list_enabled_for_trigger(
        pool: &PgPool,
        org_id: DbId,
        trigger: &str,
    ) -> Result<Vec<FollowupRule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM followup_rules \
             WHERE org_id = $1 AND trigger = $2 AND enabled \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, FollowupRule>(&query)
            .bind(org_id)
            .bind(trigger)
            .fetch_all(pool)
            .await
    }
}
