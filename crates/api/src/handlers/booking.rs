//! Handlers for the public booking flow: slot query, hold creation, and
//! payment start.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bookd_core::availability::{generate_slots, Slot, DEFAULT_DAYS_AHEAD};
use bookd_core::booking::state_machine;
use bookd_core::error::CoreError;
use bookd_core::types::{DbId, Timestamp};
use bookd_db::models::lead::Lead;
use bookd_db::models::org::Org;
use bookd_db::models::status::AppointmentStatus;
use bookd_db::repositories::{
    AppointmentRepo, EventRepo, HoldRepo, LeadRepo, OrgRepo, PaymentRepo,
};
use bookd_providers::ProviderError;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch the lead (404) and its org (the org-scoping key for every booking
/// endpoint is a lead id).
async fn find_lead_and_org(pool: &sqlx::PgPool, lead_id: DbId) -> AppResult<(Lead, Org)> {
    let lead = LeadRepo::find_by_id(pool, lead_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Lead",
            id: lead_id,
        }))?;
    let org = OrgRepo::find_by_id(pool, lead.org_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Org",
            id: lead.org_id,
        }))?;
    Ok((lead, org))
}

/// Lazily cancel appointments whose hold expired, and record each one.
/// "Expired" never blocks anything past this point.
async fn reclaim_expired(state: &AppState, org_id: DbId) -> AppResult<()> {
    let cancelled = AppointmentRepo::cancel_expired_pending(&state.pool, org_id).await?;
    for appointment in &cancelled {
        EventRepo::insert(
            &state.pool,
            org_id,
            "appointment_cancelled",
            Some(appointment.lead_id),
            &json!({ "appointment_id": appointment.id, "reason": "hold_expired" }),
        )
        .await?;
    }
    if !cancelled.is_empty() {
        tracing::info!(org_id, count = cancelled.len(), "Reclaimed expired holds");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub lead_id: DbId,
}

#[derive(Debug, Serialize)]
pub struct SlotsResponse {
    pub slots: Vec<Slot>,
}

/// GET /api/v1/booking/slots?lead_id=
///
/// Open slots for the lead's org over the next 14 days. Busy time is the
/// union of calendar busy intervals, unexpired holds, and non-cancelled
/// appointments.
pub async fn list_slots(
    State(state): State<AppState>,
    Query(params): Query<SlotsQuery>,
) -> AppResult<impl IntoResponse> {
    let (lead, org) = find_lead_and_org(&state.pool, params.lead_id).await?;
    let strategy = org.slot_strategy();

    let now = Utc::now();
    let window_start = now + Duration::hours(strategy.lead_time_hours);
    let window_end = now + Duration::days(DEFAULT_DAYS_AHEAD);

    reclaim_expired(&state, org.id).await?;

    // Calendar data is best-effort: a provider outage must not take the
    // booking page down, but it is surfaced rather than swallowed.
    let mut busy = match state.calendar.free_busy(org.id, window_start, window_end).await {
        Ok(busy) => busy,
        Err(ProviderError::NotConnected { .. }) => {
            tracing::debug!(org_id = org.id, "No calendar connected; skipping free-busy");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(
                org_id = org.id,
                error = %e,
                "Calendar free-busy fetch failed; generating slots without calendar data",
            );
            EventRepo::insert(
                &state.pool,
                org.id,
                "calendar_fetch_failed",
                Some(lead.id),
                &json!({ "error": e.to_string() }),
            )
            .await?;
            Vec::new()
        }
    };

    busy.extend(HoldRepo::busy_between(&state.pool, org.id, window_start, window_end).await?);
    busy.extend(
        AppointmentRepo::busy_between(&state.pool, org.id, window_start, window_end).await?,
    );

    let slots = generate_slots(&strategy, &busy, now, DEFAULT_DAYS_AHEAD);
    Ok(Json(SlotsResponse { slots }))
}

// ---------------------------------------------------------------------------
// Hold
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateHoldRequest {
    pub lead_id: DbId,
    pub slot_start: Timestamp,
    pub slot_end: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct CreateHoldResponse {
    pub hold_id: DbId,
    pub appointment_id: DbId,
    pub expires_at: Timestamp,
}

/// POST /api/v1/booking/hold
///
/// Reserve a slot for checkout: a 10-minute hold plus its dependent
/// `pending_hold` appointment, created atomically. 409 when the slot is
/// already taken.
pub async fn create_hold(
    State(state): State<AppState>,
    Json(input): Json<CreateHoldRequest>,
) -> AppResult<impl IntoResponse> {
    if input.slot_end <= input.slot_start {
        return Err(AppError::Core(CoreError::Validation(
            "slot_end must be after slot_start".to_string(),
        )));
    }

    let (lead, org) = find_lead_and_org(&state.pool, input.lead_id).await?;

    reclaim_expired(&state, org.id).await?;

    let Some((hold, appointment)) = HoldRepo::create_with_appointment(
        &state.pool,
        org.id,
        lead.id,
        input.slot_start,
        input.slot_end,
    )
    .await?
    else {
        return Err(AppError::Core(CoreError::Conflict(
            "Slot no longer available".to_string(),
        )));
    };

    EventRepo::insert(
        &state.pool,
        org.id,
        "hold_created",
        Some(lead.id),
        &json!({
            "hold_id": hold.id,
            "appointment_id": appointment.id,
            "slot_start": hold.slot_start,
            "slot_end": hold.slot_end,
            "expires_at": hold.expires_at,
        }),
    )
    .await?;

    tracing::info!(
        org_id = org.id,
        lead_id = lead.id,
        hold_id = hold.id,
        appointment_id = appointment.id,
        "Hold created",
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateHoldResponse {
            hold_id: hold.id,
            appointment_id: appointment.id,
            expires_at: hold.expires_at,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Pay
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct PayRequest {
    pub lead_id: DbId,
    pub hold_id: DbId,
    pub appointment_id: DbId,
    #[validate(range(min = 1, message = "amount_cents must be positive"))]
    pub amount_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct PayResponse {
    pub client_secret: String,
}

/// POST /api/v1/booking/pay
///
/// Begin payment for a held slot. Requires the hold to still be unexpired
/// (410 otherwise), moves the appointment to `pending_payment`, creates a
/// payment intent at the provider, and records the payment row.
pub async fn start_payment(
    State(state): State<AppState>,
    Json(input): Json<PayRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    let (lead, org) = find_lead_and_org(&state.pool, input.lead_id).await?;

    let hold = HoldRepo::find_by_id(&state.pool, input.hold_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Hold",
            id: input.hold_id,
        }))?;
    if !hold.is_active(Utc::now()) {
        return Err(AppError::Core(CoreError::Expired(
            "Hold has expired".to_string(),
        )));
    }

    let appointment = AppointmentRepo::find_by_id(&state.pool, input.appointment_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Appointment",
            id: input.appointment_id,
        }))?;

    // Advance to pending_payment. A second pay attempt for the same hold
    // finds the appointment already there; anything else is a conflict.
    if appointment.status_id != AppointmentStatus::PendingPayment.id() {
        state_machine::validate_transition(
            appointment.status_id,
            AppointmentStatus::PendingPayment.id(),
        )
        .map_err(|msg| AppError::Core(CoreError::Conflict(msg)))?;

        let moved = AppointmentRepo::transition(
            &state.pool,
            appointment.id,
            AppointmentStatus::PendingHold,
            AppointmentStatus::PendingPayment,
        )
        .await?;
        if !moved {
            return Err(AppError::Core(CoreError::Conflict(
                "Appointment is no longer payable".to_string(),
            )));
        }
    }

    let metadata: BTreeMap<String, String> = [
        ("org_id", org.id.to_string()),
        ("lead_id", lead.id.to_string()),
        ("appointment_id", appointment.id.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let intent = state
        .payments
        .create_payment_intent(
            org.id,
            input.amount_cents,
            &format!("Booking deposit for {}", lead.name),
            &metadata,
        )
        .await
        .map_err(|e| AppError::Core(CoreError::Provider(e.to_string())))?;

    PaymentRepo::insert(
        &state.pool,
        org.id,
        lead.id,
        "stripe",
        input.amount_cents,
        "usd",
        &intent.external_id,
    )
    .await?;

    EventRepo::insert(
        &state.pool,
        org.id,
        "payment_initiated",
        Some(lead.id),
        &json!({
            "external_id": intent.external_id,
            "amount_cents": input.amount_cents,
            "appointment_id": appointment.id,
        }),
    )
    .await?;

    Ok(Json(PayResponse {
        client_secret: intent.client_secret,
    }))
}
