use std::sync::Arc;

use bookd_providers::{Calendar, Payments};
use bookd_queue::TaskRunner;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: bookd_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Calendar collaborator (free-busy + event creation).
    pub calendar: Arc<dyn Calendar>,
    /// Payment collaborator (intent creation).
    pub payments: Arc<dyn Payments>,
    /// Task queue runner, invoked by the cron trigger endpoint.
    pub runner: Arc<TaskRunner>,
}
