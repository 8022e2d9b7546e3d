//! Shared fixtures for db integration tests.

use bookd_core::types::DbId;
use sqlx::PgPool;

/// Insert a minimal org and return its id.
pub async fn insert_org(pool: &PgPool) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO orgs (name, config) VALUES ('Test Org', '{}'::jsonb) RETURNING id",
    )
    .fetch_one(pool)
    .await
    .expect("insert org")
}

/// Insert a lead for the org and return its id.
pub async fn insert_lead(pool: &PgPool, org_id: DbId) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO leads (org_id, name, phone, email) \
         VALUES ($1, 'Test Lead', '+15550100', 'lead@example.test') \
         RETURNING id",
    )
    .bind(org_id)
    .fetch_one(pool)
    .await
    .expect("insert lead")
}
