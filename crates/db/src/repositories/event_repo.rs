//! Repository for the append-only `events` table.

use bookd_core::types::DbId;
use sqlx::PgPool;

use crate::models::event::Event;

/// Column list for `events` queries.
const COLUMNS: &str = "id, org_id, event_type, lead_id, metadata, created_at";

/// Provides append/read operations for audit events.
pub struct EventRepo;

impl EventRepo {
    /// Append a new event row, returning the generated ID.
    pub async fn insert(
        pool: &PgPool,
        org_id: DbId,
        event_type: &str,
        lead_id: Option<DbId>,
        metadata: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO events (org_id, event_type, lead_id, metadata) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(org_id)
        .bind(event_type)
        .bind(lead_id)
        .bind(metadata)
        .fetch_one(pool)
        .await
    }

    /// List an org's events newest-first.
    pub async fn list_recent(
        pool: &PgPool,
        org_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM events \
             WHERE org_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(org_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// List a lead's events newest-first.
    pub async fn list_for_lead(
        pool: &PgPool,
        org_id: DbId,
        lead_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM events \
             WHERE org_id = $1 AND lead_id = $2 \
             ORDER BY created_at DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(org_id)
            .bind(lead_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
