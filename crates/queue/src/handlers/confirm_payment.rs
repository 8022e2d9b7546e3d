//! Payment confirmation: the head of the post-payment saga.

use async_trait::async_trait;
use bookd_core::tasks::{
    task_type, CreateCalendarEventPayload, ScheduleRemindersPayload, TaskPayload,
};
use bookd_db::models::lead::lead_status;
use bookd_db::models::status::AppointmentStatus;
use bookd_db::models::task::{NewTask, Task};
use bookd_db::repositories::{AppointmentRepo, EventRepo, LeadRepo, PaymentRepo, TaskRepo};
use serde_json::json;

use crate::context::HandlerContext;
use crate::registry::TaskHandler;

/// Marks the payment paid, confirms the appointment, and enqueues the
/// calendar-sync and reminder-scheduling tasks.
pub struct ConfirmPaymentHandler;

#[async_trait]
impl TaskHandler for ConfirmPaymentHandler {
    async fn run(
        &self,
        ctx: &HandlerContext,
        task: &Task,
        payload: &TaskPayload,
    ) -> anyhow::Result<()> {
        let TaskPayload::ConfirmPayment(payload) = payload else {
            anyhow::bail!("confirm_payment dispatched with mismatched payload");
        };

        PaymentRepo::mark_paid(&ctx.pool, &payload.external_id).await?;

        let confirmed = AppointmentRepo::transition(
            &ctx.pool,
            payload.appointment_id,
            AppointmentStatus::PendingPayment,
            AppointmentStatus::Confirmed,
        )
        .await?;

        if !confirmed {
            // Hold-expiry cleanup (or a cancellation) got there first.
            // The payment is recorded as paid; surface the mismatch for a
            // human instead of retrying.
            tracing::warn!(
                appointment_id = payload.appointment_id,
                external_id = %payload.external_id,
                "Payment succeeded but appointment was no longer pending payment",
            );
            EventRepo::insert(
                &ctx.pool,
                task.org_id,
                "payment_succeeded_late",
                Some(task.lead_id),
                &json!({
                    "appointment_id": payload.appointment_id,
                    "external_id": payload.external_id,
                }),
            )
            .await?;
            return Ok(());
        }

        LeadRepo::set_status(&ctx.pool, task.lead_id, lead_status::BOOKED).await?;

        EventRepo::insert(
            &ctx.pool,
            task.org_id,
            "payment_succeeded",
            Some(task.lead_id),
            &json!({
                "appointment_id": payload.appointment_id,
                "external_id": payload.external_id,
            }),
        )
        .await?;

        // Saga chaining: both tasks are due immediately and picked up on
        // the runner's next poll.
        TaskRepo::enqueue(
            &ctx.pool,
            &NewTask {
                org_id: task.org_id,
                lead_id: task.lead_id,
                task_type: task_type::CREATE_CALENDAR_EVENT.to_string(),
                payload: serde_json::to_value(CreateCalendarEventPayload {
                    appointment_id: payload.appointment_id,
                })?,
                run_at: None,
            },
        )
        .await?;

        TaskRepo::enqueue(
            &ctx.pool,
            &NewTask {
                org_id: task.org_id,
                lead_id: task.lead_id,
                task_type: task_type::SCHEDULE_REMINDERS.to_string(),
                payload: serde_json::to_value(ScheduleRemindersPayload {
                    appointment_id: payload.appointment_id,
                })?,
                run_at: None,
            },
        )
        .await?;

        Ok(())
    }
}
