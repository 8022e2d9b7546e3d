//! Shared dependencies injected into every task handler.

use std::sync::Arc;

use bookd_providers::{Calendar, Email, Sms};
use sqlx::PgPool;

/// Everything a handler may touch: the database pool and the external
/// collaborator capabilities. Cloning is cheap (pool and providers are
/// handles).
#[derive(Clone)]
pub struct HandlerContext {
    pub pool: PgPool,
    pub calendar: Arc<dyn Calendar>,
    pub sms: Arc<dyn Sms>,
    pub email: Arc<dyn Email>,
}

impl HandlerContext {
    pub fn new(
        pool: PgPool,
        calendar: Arc<dyn Calendar>,
        sms: Arc<dyn Sms>,
        email: Arc<dyn Email>,
    ) -> Self {
        Self {
            pool,
            calendar,
            sms,
            email,
        }
    }
}
