//! Repository for the `holds` table.
//!
//! Hold creation is the double-booking gate: the overlap scan and both
//! inserts run in one transaction with the conflicting rows locked, so two
//! concurrent checkouts for the same slot cannot both succeed.

use bookd_core::availability::BusyInterval;
use bookd_core::booking::hold_ttl;
use bookd_core::types::{DbId, Timestamp};
use chrono::Utc;
use sqlx::PgPool;

use crate::models::appointment::Appointment;
use crate::models::hold::Hold;
use crate::models::status::AppointmentStatus;

/// Column list for `holds` queries.
const COLUMNS: &str = "id, org_id, lead_id, slot_start, slot_end, expires_at, created_at";

/// Column list for `appointments` queries (the dependent insert).
const APPOINTMENT_COLUMNS: &str = "\
    id, org_id, lead_id, hold_id, start_at, end_at, status_id, \
    calendar_event_id, created_at, updated_at";

/// Provides operations for checkout holds.
pub struct HoldRepo;

impl HoldRepo {
    /// Find a hold by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Hold>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM holds WHERE id = $1");
        sqlx::query_as::<_, Hold>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Unexpired holds overlapping `[from, to)`, as busy intervals for the
    /// availability generator.
    pub async fn busy_between(
        pool: &PgPool,
        org_id: DbId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<BusyInterval>, sqlx::Error> {
        let rows: Vec<(Timestamp, Timestamp)> = sqlx::query_as(
            "SELECT slot_start, slot_end FROM holds \
             WHERE org_id = $1 AND expires_at >= NOW() \
               AND slot_start < $3 AND slot_end > $2",
        )
        .bind(org_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(start, end)| BusyInterval { start, end })
            .collect())
    }

    /// Create a hold and its dependent `pending_hold` appointment, or
    /// return `Ok(None)` when the slot is already taken.
    ///
    /// The whole operation is one transaction. Conflicting rows are locked
    /// with `FOR UPDATE`, so a concurrent request for an overlapping slot
    /// blocks on the scan and then sees this hold.
    pub async fn create_with_appointment(
        pool: &PgPool,
        org_id: DbId,
        lead_id: DbId,
        slot_start: Timestamp,
        slot_end: Timestamp,
    ) -> Result<Option<(Hold, Appointment)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Any unexpired hold overlapping the requested range?
        let hold_conflicts: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM holds \
             WHERE org_id = $1 AND expires_at >= NOW() \
               AND slot_start < $3 AND slot_end > $2 \
             FOR UPDATE",
        )
        .bind(org_id)
        .bind(slot_start)
        .bind(slot_end)
        .fetch_all(&mut *tx)
        .await?;

        if !hold_conflicts.is_empty() {
            tx.rollback().await?;
            return Ok(None);
        }

        // Any live appointment overlapping the requested range?
        let appointment_conflicts: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM appointments \
             WHERE org_id = $1 AND status_id IN ($4, $5, $6) \
               AND start_at < $3 AND end_at > $2 \
             FOR UPDATE",
        )
        .bind(org_id)
        .bind(slot_start)
        .bind(slot_end)
        .bind(AppointmentStatus::PendingHold.id())
        .bind(AppointmentStatus::PendingPayment.id())
        .bind(AppointmentStatus::Confirmed.id())
        .fetch_all(&mut *tx)
        .await?;

        if !appointment_conflicts.is_empty() {
            tx.rollback().await?;
            return Ok(None);
        }

        let expires_at = Utc::now() + hold_ttl();

        let query = format!(
            "INSERT INTO holds (org_id, lead_id, slot_start, slot_end, expires_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let hold = sqlx::query_as::<_, Hold>(&query)
            .bind(org_id)
            .bind(lead_id)
            .bind(slot_start)
            .bind(slot_end)
            .bind(expires_at)
            .fetch_one(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO appointments (org_id, lead_id, hold_id, start_at, end_at, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {APPOINTMENT_COLUMNS}"
        );
        let appointment = sqlx::query_as::<_, Appointment>(&query)
            .bind(org_id)
            .bind(lead_id)
            .bind(hold.id)
            .bind(slot_start)
            .bind(slot_end)
            .bind(AppointmentStatus::PendingHold.id())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some((hold, appointment)))
    }
}
