//! Repository for the `messages` and `message_templates` tables.

use bookd_core::types::DbId;
use sqlx::PgPool;

use crate::models::message::{direction, MessageTemplate};

/// Column list for `message_templates` queries.
const TEMPLATE_COLUMNS: &str = "id, org_id, channel, name, body, created_at";

/// Provides operations for the message log and templates.
pub struct MessageRepo;

impl MessageRepo {
    /// Log an outbound message, returning the generated ID.
    pub async fn insert_outbound(
        pool: &PgPool,
        org_id: DbId,
        lead_id: DbId,
        channel: &str,
        body: &str,
        provider_id: Option<&str>,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO messages (org_id, lead_id, channel, direction, body, provider_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(org_id)
        .bind(lead_id)
        .bind(channel)
        .bind(direction::OUTBOUND)
        .bind(body)
        .bind(provider_id)
        .fetch_one(pool)
        .await
    }

    /// Whether the lead has ever replied with a STOP message. Opted-out
    /// leads receive no further follow-ups.
    pub async fn has_inbound_stop(
        pool: &PgPool,
        org_id: DbId,
        lead_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM messages \
                 WHERE org_id = $1 AND lead_id = $2 \
                   AND direction = $3 AND body ILIKE '%stop%' \
             )",
        )
        .bind(org_id)
        .bind(lead_id)
        .bind(direction::INBOUND)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Find an org's template by channel and name.
    pub async fn find_template(
        pool: &PgPool,
        org_id: DbId,
        channel: &str,
        name: &str,
    ) -> Result<Option<MessageTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM message_templates \
             WHERE org_id = $1 AND channel = $2 AND name = $3"
        );
        sqlx::query_as::<_, MessageTemplate>(&query)
            .bind(org_id)
            .bind(channel)
            .bind(name)
            .fetch_optional(pool)
            .await
    }
}
