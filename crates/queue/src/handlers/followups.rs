//! Follow-up sequences: scheduling from rules and delivery with stop
//! conditions.
//!
//! A follow-up rule maps a trigger (e.g. `payment_failed`) to a sequence
//! of delayed message steps. Stop conditions are checked both when
//! scheduling and again at send time, so a lead who books, pays, opts out,
//! or is marked lost never receives another follow-up.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bookd_core::tasks::{task_type, Channel, SendFollowupPayload, TaskPayload};
use bookd_core::templates::render_template;
use bookd_core::types::DbId;
use bookd_db::models::lead::lead_status;
use bookd_db::models::task::{NewTask, Task};
use bookd_db::repositories::{
    AppointmentRepo, EventRepo, FollowupRepo, LeadRepo, MessageRepo, OrgRepo, PaymentRepo,
    TaskRepo,
};
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;

use crate::context::HandlerContext;
use crate::registry::TaskHandler;

/// Why follow-ups were not (or are no longer) sent to a lead.
async fn stop_reason(
    pool: &PgPool,
    org_id: DbId,
    lead_id: DbId,
) -> Result<Option<&'static str>, sqlx::Error> {
    if AppointmentRepo::has_active_for_lead(pool, org_id, lead_id).await? {
        return Ok(Some("booking_exists"));
    }
    if PaymentRepo::has_paid_for_lead(pool, org_id, lead_id).await? {
        return Ok(Some("payment_received"));
    }
    if MessageRepo::has_inbound_stop(pool, org_id, lead_id).await? {
        return Ok(Some("opt_out"));
    }
    if let Some(lead) = LeadRepo::find_by_id(pool, lead_id).await? {
        if lead.status == lead_status::LOST {
            return Ok(Some("lead_lost"));
        }
    }
    Ok(None)
}

/// Evaluate the org's rules for `trigger` and enqueue one `send_followup`
/// task per step. Emits `followups_scheduled`, or `followup_stopped` when
/// a stop condition already holds.
pub async fn schedule_followups(
    pool: &PgPool,
    org_id: DbId,
    lead_id: DbId,
    trigger: &str,
    context: &BTreeMap<String, String>,
) -> Result<(), sqlx::Error> {
    if let Some(reason) = stop_reason(pool, org_id, lead_id).await? {
        EventRepo::insert(
            pool,
            org_id,
            "followup_stopped",
            Some(lead_id),
            &json!({ "trigger": trigger, "reason": reason }),
        )
        .await?;
        return Ok(());
    }

    let rules = FollowupRepo::list_enabled_for_trigger(pool, org_id, trigger).await?;
    if rules.is_empty() {
        return Ok(());
    }

    let now = Utc::now();
    for rule in &rules {
        let steps = match rule.steps() {
            Ok(steps) => steps,
            Err(e) => {
                // A broken rule must not sink the whole workflow.
                tracing::warn!(rule_id = rule.id, error = %e, "Skipping malformed follow-up rule");
                continue;
            }
        };
        for step in steps {
            TaskRepo::enqueue(
                pool,
                &NewTask {
                    org_id,
                    lead_id,
                    task_type: task_type::SEND_FOLLOWUP.to_string(),
                    payload: json!(SendFollowupPayload {
                        channel: step.channel,
                        template_name: step.template_name,
                        context: context.clone(),
                    }),
                    run_at: Some(now + Duration::hours(step.delay_hours)),
                },
            )
            .await?;
        }
    }

    EventRepo::insert(
        pool,
        org_id,
        "followups_scheduled",
        Some(lead_id),
        &json!({ "trigger": trigger, "rule_count": rules.len() }),
    )
    .await?;

    Ok(())
}

/// Delivers one follow-up step, re-checking stop conditions first.
pub struct SendFollowupHandler;

#[async_trait]
impl TaskHandler for SendFollowupHandler {
    async fn run(
        &self,
        ctx: &HandlerContext,
        task: &Task,
        payload: &TaskPayload,
    ) -> anyhow::Result<()> {
        let TaskPayload::SendFollowup(payload) = payload else {
            anyhow::bail!("send_followup dispatched with mismatched payload");
        };

        let Some(lead) = LeadRepo::find_by_id(&ctx.pool, task.lead_id).await? else {
            anyhow::bail!("lead {} not found", task.lead_id);
        };

        // Stop conditions at send time: the lead may have converted or
        // opted out since the step was scheduled.
        if lead.status == lead_status::BOOKED || lead.status == lead_status::LOST {
            return Ok(());
        }
        if MessageRepo::has_inbound_stop(&ctx.pool, task.org_id, task.lead_id).await? {
            return Ok(());
        }

        let Some(template) = MessageRepo::find_template(
            &ctx.pool,
            task.org_id,
            payload.channel.as_str(),
            &payload.template_name,
        )
        .await?
        else {
            tracing::warn!(
                org_id = task.org_id,
                template = %payload.template_name,
                channel = payload.channel.as_str(),
                "No template for follow-up, skipping",
            );
            return Ok(());
        };

        let body = render_template(&template.body, &payload.context);

        match payload.channel {
            Channel::Sms => {
                let Some(phone) = &lead.phone else {
                    return Ok(());
                };
                let sid = ctx.sms.send(task.org_id, phone, &body).await?;
                MessageRepo::insert_outbound(
                    &ctx.pool,
                    task.org_id,
                    task.lead_id,
                    "sms",
                    &body,
                    Some(&sid),
                )
                .await?;
            }
            Channel::Email => {
                let Some(email) = &lead.email else {
                    return Ok(());
                };
                let Some(org) = OrgRepo::find_by_id(&ctx.pool, task.org_id).await? else {
                    anyhow::bail!("org {} not found", task.org_id);
                };
                let subject = format!("Message from {}", org.name);
                ctx.email
                    .send(email, &subject, &body.replace('\n', "<br>"))
                    .await?;
                MessageRepo::insert_outbound(
                    &ctx.pool,
                    task.org_id,
                    task.lead_id,
                    "email",
                    &body,
                    None,
                )
                .await?;
            }
        }

        EventRepo::insert(
            &ctx.pool,
            task.org_id,
            "followup_sent",
            Some(task.lead_id),
            &json!({
                "channel": payload.channel.as_str(),
                "template_name": payload.template_name,
            }),
        )
        .await?;

        Ok(())
    }
}
