//! Payment provider webhook handler.
//!
//! A successful payment enqueues a `confirm_payment` task; the saga it
//! heads (appointment confirmation, calendar sync, reminders) runs on the
//! task queue. A failed payment is handled inline: the appointment is
//! released and recovery follow-ups are scheduled.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use bookd_core::tasks::{task_type, ConfirmPaymentPayload};
use bookd_core::types::DbId;
use bookd_db::models::status::AppointmentStatus;
use bookd_db::models::task::NewTask;
use bookd_db::repositories::{
    AppointmentRepo, EventRepo, LeadRepo, OrgRepo, PaymentRepo, TaskRepo,
};
use bookd_queue::handlers::followups::schedule_followups;
use serde_json::json;

use crate::error::AppResult;
use crate::state::AppState;

/// Intent identity extracted from a webhook payload's metadata.
struct IntentRef {
    external_id: String,
    org_id: DbId,
    lead_id: DbId,
    appointment_id: Option<DbId>,
}

fn intent_ref(event: &serde_json::Value) -> Option<IntentRef> {
    let object = &event["data"]["object"];
    let metadata = &object["metadata"];
    Some(IntentRef {
        external_id: object["id"].as_str()?.to_string(),
        org_id: metadata["org_id"].as_str()?.parse().ok()?,
        lead_id: metadata["lead_id"].as_str()?.parse().ok()?,
        appointment_id: metadata["appointment_id"]
            .as_str()
            .and_then(|s| s.parse().ok()),
    })
}

/// POST /api/v1/webhooks/payment
///
/// Always answers `{ "received": true }` for recognized shapes; the real
/// work is asynchronous.
pub async fn payment_webhook(
    State(state): State<AppState>,
    Json(event): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    match event["type"].as_str().unwrap_or_default() {
        "payment_intent.succeeded" => handle_success(&state, &event).await?,
        "payment_intent.payment_failed" => handle_failure(&state, &event).await?,
        other => {
            tracing::debug!(event_type = other, "Ignoring unhandled webhook event");
        }
    }
    Ok(Json(json!({ "received": true })))
}

async fn handle_success(state: &AppState, event: &serde_json::Value) -> AppResult<()> {
    let Some(intent) = intent_ref(event) else {
        tracing::warn!("payment_intent.succeeded without usable metadata, ignoring");
        return Ok(());
    };
    let Some(appointment_id) = intent.appointment_id else {
        tracing::warn!(external_id = %intent.external_id, "Succeeded intent without appointment_id");
        return Ok(());
    };

    TaskRepo::enqueue(
        &state.pool,
        &NewTask {
            org_id: intent.org_id,
            lead_id: intent.lead_id,
            task_type: task_type::CONFIRM_PAYMENT.to_string(),
            payload: serde_json::to_value(ConfirmPaymentPayload {
                external_id: intent.external_id.clone(),
                appointment_id,
            })
            .map_err(|e| crate::error::AppError::InternalError(e.to_string()))?,
            run_at: None,
        },
    )
    .await?;

    tracing::info!(
        org_id = intent.org_id,
        lead_id = intent.lead_id,
        external_id = %intent.external_id,
        "Payment succeeded; confirmation task enqueued",
    );
    Ok(())
}

async fn handle_failure(state: &AppState, event: &serde_json::Value) -> AppResult<()> {
    let Some(intent) = intent_ref(event) else {
        tracing::warn!("payment_intent.payment_failed without usable metadata, ignoring");
        return Ok(());
    };

    PaymentRepo::mark_failed(&state.pool, &intent.external_id).await?;

    // Release the slot.
    if let Some(appointment_id) = intent.appointment_id {
        AppointmentRepo::transition(
            &state.pool,
            appointment_id,
            AppointmentStatus::PendingPayment,
            AppointmentStatus::Cancelled,
        )
        .await?;
    }

    EventRepo::insert(
        &state.pool,
        intent.org_id,
        "payment_failed",
        Some(intent.lead_id),
        &json!({ "external_id": intent.external_id }),
    )
    .await?;

    // Try to win the lead back.
    let lead = LeadRepo::find_by_id(&state.pool, intent.lead_id).await?;
    let org = OrgRepo::find_by_id(&state.pool, intent.org_id).await?;
    if let (Some(lead), Some(org)) = (lead, org) {
        let context: BTreeMap<String, String> = [
            ("name".to_string(), lead.name.clone()),
            ("company".to_string(), org.name.clone()),
        ]
        .into();
        schedule_followups(&state.pool, intent.org_id, intent.lead_id, "payment_failed", &context)
            .await?;
    }

    tracing::info!(
        org_id = intent.org_id,
        lead_id = intent.lead_id,
        external_id = %intent.external_id,
        "Payment failed; appointment released",
    );
    Ok(())
}
