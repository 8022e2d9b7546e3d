//! Appointment reminders: scheduling and delivery.
//!
//! Customers get an SMS 24 hours and 2 hours before their appointment;
//! the org gets an internal email 24 hours before. Reminder times already
//! in the past are skipped rather than delivered late.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bookd_core::tasks::{task_type, ReminderKind, SendReminderPayload, TaskPayload};
use bookd_core::templates::render_template;
use bookd_db::models::appointment::Appointment;
use bookd_db::models::status::AppointmentStatus;
use bookd_db::models::task::{NewTask, Task};
use bookd_db::repositories::{AppointmentRepo, EventRepo, LeadRepo, MessageRepo, OrgRepo, TaskRepo};
use chrono::{Duration, Utc};
use serde_json::json;

use crate::context::HandlerContext;
use crate::registry::TaskHandler;

/// Template name for customer reminder SMS.
const REMINDER_TEMPLATE: &str = "booking_confirmed";

/// Enqueues the individual `send_reminder` tasks for a confirmed
/// appointment.
pub struct ScheduleRemindersHandler;

#[async_trait]
impl TaskHandler for ScheduleRemindersHandler {
    async fn run(
        &self,
        ctx: &HandlerContext,
        task: &Task,
        payload: &TaskPayload,
    ) -> anyhow::Result<()> {
        let TaskPayload::ScheduleReminders(payload) = payload else {
            anyhow::bail!("schedule_reminders dispatched with mismatched payload");
        };

        let Some(appointment) =
            AppointmentRepo::find_by_id(&ctx.pool, payload.appointment_id).await?
        else {
            anyhow::bail!("appointment {} not found", payload.appointment_id);
        };

        if appointment.status_id != AppointmentStatus::Confirmed.id() {
            return Ok(());
        }

        let now = Utc::now();
        let reminders = [
            (
                ReminderKind::Customer24h,
                appointment.start_at - Duration::hours(24),
            ),
            (
                ReminderKind::Customer2h,
                appointment.start_at - Duration::hours(2),
            ),
            (
                ReminderKind::Internal24h,
                appointment.start_at - Duration::hours(24),
            ),
        ];

        let mut scheduled = 0;
        for (reminder, run_at) in reminders {
            if run_at <= now {
                continue;
            }
            TaskRepo::enqueue(
                &ctx.pool,
                &NewTask {
                    org_id: task.org_id,
                    lead_id: task.lead_id,
                    task_type: task_type::SEND_REMINDER.to_string(),
                    payload: serde_json::to_value(SendReminderPayload {
                        appointment_id: appointment.id,
                        reminder,
                    })?,
                    run_at: Some(run_at),
                },
            )
            .await?;
            scheduled += 1;
        }

        EventRepo::insert(
            &ctx.pool,
            task.org_id,
            "reminders_scheduled",
            Some(task.lead_id),
            &json!({
                "appointment_id": appointment.id,
                "scheduled": scheduled,
            }),
        )
        .await?;

        Ok(())
    }
}

/// Delivers one reminder, re-checking the appointment is still on.
pub struct SendReminderHandler;

#[async_trait]
impl TaskHandler for SendReminderHandler {
    async fn run(
        &self,
        ctx: &HandlerContext,
        task: &Task,
        payload: &TaskPayload,
    ) -> anyhow::Result<()> {
        let TaskPayload::SendReminder(payload) = payload else {
            anyhow::bail!("send_reminder dispatched with mismatched payload");
        };

        let Some(appointment) =
            AppointmentRepo::find_by_id(&ctx.pool, payload.appointment_id).await?
        else {
            anyhow::bail!("appointment {} not found", payload.appointment_id);
        };

        // Cancelled since scheduling: drop the reminder silently.
        if appointment.status_id != AppointmentStatus::Confirmed.id() {
            return Ok(());
        }

        let Some(lead) = LeadRepo::find_by_id(&ctx.pool, task.lead_id).await? else {
            anyhow::bail!("lead {} not found", task.lead_id);
        };
        let Some(org) = OrgRepo::find_by_id(&ctx.pool, task.org_id).await? else {
            anyhow::bail!("org {} not found", task.org_id);
        };

        match payload.reminder {
            ReminderKind::Customer24h | ReminderKind::Customer2h => {
                send_customer_sms(ctx, task, &appointment, &lead.phone, &lead.name, &org.name)
                    .await?;
            }
            ReminderKind::Internal24h => {
                send_internal_email(ctx, &org, &lead.name, lead.phone.as_deref(), &appointment)
                    .await?;
            }
        }

        EventRepo::insert(
            &ctx.pool,
            task.org_id,
            "reminder_sent",
            Some(task.lead_id),
            &json!({
                "appointment_id": appointment.id,
                "reminder_type": payload.reminder,
            }),
        )
        .await?;

        Ok(())
    }
}

async fn send_customer_sms(
    ctx: &HandlerContext,
    task: &Task,
    appointment: &Appointment,
    phone: &Option<String>,
    lead_name: &str,
    org_name: &str,
) -> anyhow::Result<()> {
    let Some(phone) = phone else {
        tracing::warn!(lead_id = task.lead_id, "Lead has no phone, skipping reminder SMS");
        return Ok(());
    };
    let Some(template) =
        MessageRepo::find_template(&ctx.pool, task.org_id, "sms", REMINDER_TEMPLATE).await?
    else {
        tracing::warn!(
            org_id = task.org_id,
            template = REMINDER_TEMPLATE,
            "No SMS template configured, skipping reminder",
        );
        return Ok(());
    };

    let vars: BTreeMap<String, String> = [
        ("name", lead_name.to_string()),
        ("company", org_name.to_string()),
        ("date", format_date(appointment)),
        ("time", format_time(appointment)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let body = render_template(&template.body, &vars);
    let sid = ctx.sms.send(task.org_id, phone, &body).await?;
    MessageRepo::insert_outbound(&ctx.pool, task.org_id, task.lead_id, "sms", &body, Some(&sid))
        .await?;
    Ok(())
}

async fn send_internal_email(
    ctx: &HandlerContext,
    org: &bookd_db::models::org::Org,
    lead_name: &str,
    lead_phone: Option<&str>,
    appointment: &Appointment,
) -> anyhow::Result<()> {
    let Some(to) = org.notification_email() else {
        tracing::warn!(org_id = org.id, "No notification email configured, skipping internal reminder");
        return Ok(());
    };

    let date = format_date(appointment);
    let time = format_time(appointment);
    let subject = format!("Tomorrow: {lead_name} - {date}");
    let html = format!(
        "<h2>Appointment Reminder</h2>\
         <p><strong>Customer:</strong> {lead_name}</p>\
         <p><strong>Phone:</strong> {}</p>\
         <p><strong>Date:</strong> {date} at {time}</p>",
        lead_phone.unwrap_or("N/A"),
    );
    ctx.email.send(to, &subject, &html).await?;
    Ok(())
}

fn format_date(appointment: &Appointment) -> String {
    appointment.start_at.format("%A, %B %-d").to_string()
}

fn format_time(appointment: &Appointment) -> String {
    appointment.start_at.format("%-I:%M %p").to_string()
}
