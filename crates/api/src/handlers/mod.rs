//! HTTP handlers, one module per resource.

pub mod booking;
pub mod cron;
pub mod events;
pub mod health;
pub mod webhooks;
