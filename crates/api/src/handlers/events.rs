//! Handlers for the audit event log (internal/ops surface).

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use bookd_core::types::DbId;
use bookd_db::repositories::EventRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum page size for event listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for event listing.
const DEFAULT_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    pub org_id: DbId,
    /// Narrow to a single lead's timeline.
    pub lead_id: Option<DbId>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// GET /api/v1/events
///
/// Newest-first audit events for an org, optionally narrowed to one lead.
/// Asynchronous failures (reminder sends, task exhaustion) are visible
/// only here, never to the booking client.
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<EventListQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let events = match params.lead_id {
        Some(lead_id) => {
            EventRepo::list_for_lead(&state.pool, params.org_id, lead_id, limit, offset).await?
        }
        None => EventRepo::list_recent(&state.pool, params.org_id, limit, offset).await?,
    };

    Ok(Json(DataResponse { data: events }))
}
