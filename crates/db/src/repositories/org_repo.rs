//! Repository for the `orgs` table.

use bookd_core::types::DbId;
use sqlx::PgPool;

use crate::models::org::Org;

/// Column list for `orgs` queries.
const COLUMNS: &str = "id, name, config, created_at, updated_at";

/// Provides read operations for orgs.
pub struct OrgRepo;

impl OrgRepo {
    /// Find an org by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Org>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orgs WHERE id = $1");
        sqlx::query_as::<_, Org>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
