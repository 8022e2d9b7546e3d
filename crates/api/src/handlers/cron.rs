//! Task queue trigger handler.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use bookd_core::error::CoreError;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/v1/cron/run-tasks
///
/// Invoked by an external scheduler (e.g. every minute). Processes one
/// batch of due tasks and reports the counts. When `CRON_SECRET` is
/// configured, requires a matching bearer token.
pub async fn run_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    if let Some(secret) = &state.config.cron_secret {
        let expected = format!("Bearer {secret}");
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == expected)
            .unwrap_or(false);
        if !authorized {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid cron secret".to_string(),
            )));
        }
    }

    let report = state.runner.run_batch().await?;

    Ok(Json(json!({
        "success": true,
        "processed": report.processed,
        "total": report.total,
    })))
}
