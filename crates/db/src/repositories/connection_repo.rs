//! Repository for the `org_connections` table.

use bookd_core::types::DbId;
use sqlx::PgPool;

use crate::models::connection::OrgConnection;

/// Column list for `org_connections` queries.
const COLUMNS: &str = "\
    id, org_id, kind, provider, config_encrypted, calendar_id, is_active, \
    created_at, updated_at";

/// Provides operations for per-org provider connections.
pub struct ConnectionRepo;

impl ConnectionRepo {
    /// The org's active connection of the given kind, if any.
    pub async fn find_active(
        pool: &PgPool,
        org_id: DbId,
        kind: &str,
    ) -> Result<Option<OrgConnection>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM org_connections \
             WHERE org_id = $1 AND kind = $2 AND is_active \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, OrgConnection>(&query)
            .bind(org_id)
            .bind(kind)
            .fetch_optional(pool)
            .await
    }

    /// Replace a connection's encrypted credential blob (token refresh).
    pub async fn update_config(
        pool: &PgPool,
        id: DbId,
        config_encrypted: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE org_connections SET config_encrypted = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(config_encrypted)
        .execute(pool)
        .await?;
        Ok(())
    }
}
