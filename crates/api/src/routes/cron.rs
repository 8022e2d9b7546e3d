//! Route definitions for the task queue trigger.

use axum::routing::get;
use axum::Router;

use crate::handlers::cron;
use crate::state::AppState;

/// Routes mounted at `/cron`.
///
/// ```text
/// GET    /run-tasks   -> run_tasks
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/run-tasks", get(cron::run_tasks))
}
