//! Calendar sync: mirror a confirmed appointment into the org's calendar.

use async_trait::async_trait;
use bookd_core::tasks::TaskPayload;
use bookd_db::models::status::AppointmentStatus;
use bookd_db::models::task::Task;
use bookd_db::repositories::{AppointmentRepo, EventRepo, LeadRepo};
use bookd_providers::EventDetails;
use serde_json::json;

use crate::context::HandlerContext;
use crate::registry::TaskHandler;

/// Creates the external calendar event and stores its id on the
/// appointment. Provider failures bubble up and are retried by the runner.
pub struct CreateCalendarEventHandler;

#[async_trait]
impl TaskHandler for CreateCalendarEventHandler {
    async fn run(
        &self,
        ctx: &HandlerContext,
        task: &Task,
        payload: &TaskPayload,
    ) -> anyhow::Result<()> {
        let TaskPayload::CreateCalendarEvent(payload) = payload else {
            anyhow::bail!("create_calendar_event dispatched with mismatched payload");
        };

        let Some(appointment) =
            AppointmentRepo::find_by_id(&ctx.pool, payload.appointment_id).await?
        else {
            anyhow::bail!("appointment {} not found", payload.appointment_id);
        };

        if appointment.status_id != AppointmentStatus::Confirmed.id() {
            // Cancelled between confirmation and this poll; nothing to sync.
            tracing::warn!(
                appointment_id = appointment.id,
                status_id = appointment.status_id,
                "Skipping calendar sync for non-confirmed appointment",
            );
            return Ok(());
        }

        let Some(lead) = LeadRepo::find_by_id(&ctx.pool, appointment.lead_id).await? else {
            anyhow::bail!("lead {} not found", appointment.lead_id);
        };

        let details = EventDetails {
            summary: format!("Appointment: {}", lead.name),
            description: format!(
                "Customer: {}\nPhone: {}",
                lead.name,
                lead.phone.as_deref().unwrap_or("N/A"),
            ),
            location: lead.address.clone().unwrap_or_default(),
            start: appointment.start_at,
            end: appointment.end_at,
        };

        let event_id = ctx.calendar.create_event(appointment.org_id, &details).await?;
        AppointmentRepo::set_calendar_event_id(&ctx.pool, appointment.id, &event_id).await?;

        EventRepo::insert(
            &ctx.pool,
            task.org_id,
            "calendar_event_created",
            Some(task.lead_id),
            &json!({
                "appointment_id": appointment.id,
                "calendar_event_id": event_id,
            }),
        )
        .await?;

        Ok(())
    }
}
