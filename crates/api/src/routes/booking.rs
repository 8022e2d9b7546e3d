//! Route definitions for the public booking flow.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::booking;
use crate::state::AppState;

/// Routes mounted at `/booking`.
///
/// ```text
/// GET    /slots   -> list_slots
/// POST   /hold    -> create_hold
/// POST   /pay     -> start_payment
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/slots", get(booking::list_slots))
        .route("/hold", post(booking::create_hold))
        .route("/pay", post(booking::start_payment))
}
