//! Repository for the `payments` table.

use bookd_core::types::DbId;
use sqlx::PgPool;

use crate::models::payment::Payment;
use crate::models::status::PaymentStatus;

/// Column list for `payments` queries.
const COLUMNS: &str = "\
    id, org_id, lead_id, provider, amount_cents, currency, status_id, \
    external_id, created_at, updated_at";

/// Provides operations for payment intents.
pub struct PaymentRepo;

impl PaymentRepo {
    /// Record a freshly created payment intent in `pending` status.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        pool: &PgPool,
        org_id: DbId,
        lead_id: DbId,
        provider: &str,
        amount_cents: i64,
        currency: &str,
        external_id: &str,
    ) -> Result<Payment, sqlx::Error> {
        let query = format!(
            "INSERT INTO payments \
                 (org_id, lead_id, provider, amount_cents, currency, status_id, external_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(org_id)
            .bind(lead_id)
            .bind(provider)
            .bind(amount_cents)
            .bind(currency)
            .bind(PaymentStatus::Pending.id())
            .bind(external_id)
            .fetch_one(pool)
            .await
    }

    /// Mark a pending payment as paid by its provider id.
    /// Returns `false` if no pending payment matched.
    pub async fn mark_paid(pool: &PgPool, external_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE payments SET status_id = $2, updated_at = NOW() \
             WHERE external_id = $1 AND status_id = $3",
        )
        .bind(external_id)
        .bind(PaymentStatus::Paid.id())
        .bind(PaymentStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a pending payment as failed by its provider id.
    pub async fn mark_failed(pool: &PgPool, external_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE payments SET status_id = $2, updated_at = NOW() \
             WHERE external_id = $1 AND status_id = $3",
        )
        .bind(external_id)
        .bind(PaymentStatus::Failed.id())
        .bind(PaymentStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether the lead has any paid payment. Used as a follow-up stop
    /// condition.
    pub async fn has_paid_for_lead(
        pool: &PgPool,
        org_id: DbId,
        lead_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM payments \
                 WHERE org_id = $1 AND lead_id = $2 AND status_id = $3 \
             )",
        )
        .bind(org_id)
        .bind(lead_id)
        .bind(PaymentStatus::Paid.id())
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }
}
