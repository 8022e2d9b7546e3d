//! Repository for the `appointments` table.

use bookd_core::availability::BusyInterval;
use bookd_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::appointment::Appointment;
use crate::models::status::AppointmentStatus;

/// Column list for `appointments` queries.
const COLUMNS: &str = "\
    id, org_id, lead_id, hold_id, start_at, end_at, status_id, \
    calendar_event_id, created_at, updated_at";

/// An appointment cancelled by expired-hold cleanup, for event emission.
#[derive(Debug, Clone, Copy)]
pub struct CancelledAppointment {
    pub id: DbId,
    pub lead_id: DbId,
}

/// Provides operations for appointments.
pub struct AppointmentRepo;

impl AppointmentRepo {
    /// Find an appointment by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM appointments WHERE id = $1");
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Conditionally advance an appointment from `from` to `to`.
    ///
    /// Returns `false` when the row was not in the expected `from` status
    /// (raced by another transition). Callers pick only transitions the
    /// state machine in `bookd_core::booking` allows.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE appointments SET status_id = $3, updated_at = NOW() \
             WHERE id = $1 AND status_id = $2",
        )
        .bind(id)
        .bind(from.id())
        .bind(to.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the external calendar event backing a confirmed appointment.
    pub async fn set_calendar_event_id(
        pool: &PgPool,
        id: DbId,
        calendar_event_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE appointments SET calendar_event_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(calendar_event_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Non-cancelled appointments overlapping `[from, to)`, as busy
    /// intervals for the availability generator.
    pub async fn busy_between(
        pool: &PgPool,
        org_id: DbId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<BusyInterval>, sqlx::Error> {
        let rows: Vec<(Timestamp, Timestamp)> = sqlx::query_as(
            "SELECT start_at, end_at FROM appointments \
             WHERE org_id = $1 AND status_id IN ($4, $5, $6) \
               AND start_at < $3 AND end_at > $2",
        )
        .bind(org_id)
        .bind(from)
        .bind(to)
        .bind(AppointmentStatus::PendingHold.id())
        .bind(AppointmentStatus::PendingPayment.id())
        .bind(AppointmentStatus::Confirmed.id())
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(start, end)| BusyInterval { start, end })
            .collect())
    }

    /// Cancel non-confirmed appointments whose backing hold has expired.
    ///
    /// This is the lazy "cleanup on next read": an abandoned checkout stops
    /// blocking availability as soon as anything looks at the calendar
    /// again. Returns the cancelled rows so the caller can emit events.
    pub async fn cancel_expired_pending(
        pool: &PgPool,
        org_id: DbId,
    ) -> Result<Vec<CancelledAppointment>, sqlx::Error> {
        let rows: Vec<(DbId, DbId)> = sqlx::query_as(
            "UPDATE appointments a \
             SET status_id = $2, updated_at = NOW() \
             FROM holds h \
             WHERE a.hold_id = h.id \
               AND a.org_id = $1 \
               AND a.status_id IN ($3, $4) \
               AND h.expires_at < NOW() \
             RETURNING a.id, a.lead_id",
        )
        .bind(org_id)
        .bind(AppointmentStatus::Cancelled.id())
        .bind(AppointmentStatus::PendingHold.id())
        .bind(AppointmentStatus::PendingPayment.id())
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, lead_id)| CancelledAppointment { id, lead_id })
            .collect())
    }

    /// Whether the lead already has a live (non-cancelled) appointment.
    /// Used as a follow-up stop condition.
    pub async fn has_active_for_lead(
        pool: &PgPool,
        org_id: DbId,
        lead_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM appointments \
                 WHERE org_id = $1 AND lead_id = $2 AND status_id IN ($3, $4, $5) \
             )",
        )
        .bind(org_id)
        .bind(lead_id)
        .bind(AppointmentStatus::PendingHold.id())
        .bind(AppointmentStatus::PendingPayment.id())
        .bind(AppointmentStatus::Confirmed.id())
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }
}
