//! Repository for the `leads` table.

use bookd_core::types::DbId;
use sqlx::PgPool;

use crate::models::lead::Lead;

/// Column list for `leads` queries.
const COLUMNS: &str = "id, org_id, name, phone, email, address, status, created_at, updated_at";

/// Provides read/update operations for leads.
pub struct LeadRepo;

impl LeadRepo {
    /// Find a lead by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Lead>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM leads WHERE id = $1");
        sqlx::query_as::<_, Lead>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Update the lead's lifecycle status (e.g. to `booked` on payment).
    pub async fn set_status(pool: &PgPool, id: DbId, status: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE leads SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(pool)
            .await?;
        Ok(())
    }
}
