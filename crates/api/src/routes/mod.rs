pub mod booking;
pub mod cron;
pub mod events;
pub mod health;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /booking/slots            open slots for a lead's org (GET)
/// /booking/hold             reserve a slot for checkout (POST)
/// /booking/pay              start payment for a held slot (POST)
///
/// /webhooks/payment         payment provider callback (POST)
///
/// /cron/run-tasks           task queue trigger (GET, bearer secret)
///
/// /events                   audit event log (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/booking", booking::router())
        .nest("/webhooks", webhooks::router())
        .nest("/cron", cron::router())
        .nest("/events", events::router())
}
