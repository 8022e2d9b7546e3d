//! Explicit task handler registry.
//!
//! The registry is a plain map built at process start and passed into the
//! runner by dependency injection. Registration happens in exactly one
//! place ([`HandlerRegistry::with_default_handlers`]), so the set of live
//! task types is visible at a glance and tests can swap individual
//! handlers for instrumented ones.

use std::collections::HashMap;

use async_trait::async_trait;
use bookd_core::tasks::{task_type, TaskPayload};
use bookd_db::models::task::Task;

use crate::context::HandlerContext;
use crate::handlers;

/// One unit of side-effecting work for a single task type.
///
/// Handlers receive the already validated [`TaskPayload`] for their type.
/// Returning an error means the attempt failed and the runner applies the
/// retry policy; handlers must be safe to re-run.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn run(
        &self,
        ctx: &HandlerContext,
        task: &Task,
        payload: &TaskPayload,
    ) -> anyhow::Result<()>;
}

/// Maps `task_type` to its handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Box<dyn TaskHandler>>,
}

impl HandlerRegistry {
    /// An empty registry. Mostly useful in tests.
    pub fn new() -> Self {
        Self::default()
    }

    /// The production registry with every domain handler registered.
    pub fn with_default_handlers() -> Self {
        let mut registry = Self::new();
        registry.register(
            task_type::CONFIRM_PAYMENT,
            Box::new(handlers::confirm_payment::ConfirmPaymentHandler),
        );
        registry.register(
            task_type::CREATE_CALENDAR_EVENT,
            Box::new(handlers::calendar_sync::CreateCalendarEventHandler),
        );
        registry.register(
            task_type::SCHEDULE_REMINDERS,
            Box::new(handlers::reminders::ScheduleRemindersHandler),
        );
        registry.register(
            task_type::SEND_REMINDER,
            Box::new(handlers::reminders::SendReminderHandler),
        );
        registry.register(
            task_type::SEND_FOLLOWUP,
            Box::new(handlers::followups::SendFollowupHandler),
        );
        registry.register(
            task_type::NOTIFY_ADMIN,
            Box::new(handlers::notify_admin::NotifyAdminHandler),
        );
        registry
    }

    /// Register (or replace) the handler for a task type.
    pub fn register(&mut self, task_type: &'static str, handler: Box<dyn TaskHandler>) {
        self.handlers.insert(task_type, handler);
    }

    /// Look up the handler for a task type.
    pub fn get(&self, task_type: &str) -> Option<&dyn TaskHandler> {
        self.handlers.get(task_type).map(|h| h.as_ref())
    }
}
