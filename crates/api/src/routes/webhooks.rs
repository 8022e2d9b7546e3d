//! Route definitions for provider webhooks.

use axum::routing::post;
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Routes mounted at `/webhooks`.
///
/// ```text
/// POST   /payment   -> payment_webhook
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/payment", post(webhooks::payment_webhook))
}
