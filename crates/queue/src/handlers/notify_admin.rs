//! Internal notification: email the org about a lead that needs attention.

use async_trait::async_trait;
use bookd_core::tasks::TaskPayload;
use bookd_db::models::task::Task;
use bookd_db::repositories::{EventRepo, LeadRepo, OrgRepo};
use serde_json::json;

use crate::context::HandlerContext;
use crate::registry::TaskHandler;

pub struct NotifyAdminHandler;

#[async_trait]
impl TaskHandler for NotifyAdminHandler {
    async fn run(
        &self,
        ctx: &HandlerContext,
        task: &Task,
        payload: &TaskPayload,
    ) -> anyhow::Result<()> {
        let TaskPayload::NotifyAdmin(payload) = payload else {
            anyhow::bail!("notify_admin dispatched with mismatched payload");
        };

        let Some(org) = OrgRepo::find_by_id(&ctx.pool, task.org_id).await? else {
            anyhow::bail!("org {} not found", task.org_id);
        };
        let Some(lead) = LeadRepo::find_by_id(&ctx.pool, task.lead_id).await? else {
            anyhow::bail!("lead {} not found", task.lead_id);
        };

        let notification_email = org.notification_email().map(str::to_string);

        if let Some(to) = &notification_email {
            let html = format!(
                "<h2>Lead Needs Your Attention</h2>\
                 <p><strong>Customer:</strong> {}</p>\
                 <p><strong>Phone:</strong> {}</p>\
                 <p><strong>Email:</strong> {}</p>\
                 <p><strong>Address:</strong> {}</p>\
                 <p><strong>Reason:</strong> {}</p>",
                lead.name,
                lead.phone.as_deref().unwrap_or("N/A"),
                lead.email.as_deref().unwrap_or("N/A"),
                lead.address.as_deref().unwrap_or("N/A"),
                payload.reason,
            );
            let subject = format!("Lead needs attention - {}", lead.name);
            ctx.email.send(to, &subject, &html).await?;
        } else {
            tracing::warn!(org_id = org.id, "No notification email configured");
        }

        EventRepo::insert(
            &ctx.pool,
            task.org_id,
            "admin_notified",
            Some(task.lead_id),
            &json!({
                "reason": payload.reason,
                "notification_email": notification_email.as_deref().unwrap_or("none"),
            }),
        )
        .await?;

        Ok(())
    }
}
