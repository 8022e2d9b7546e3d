//! Task queue domain: task types, typed payloads, and the retry policy.
//!
//! Payloads are a tagged union keyed by the task's `task_type` column and
//! validated at dequeue time, before any handler runs. A payload that does
//! not match its type's schema can never succeed on a retry, so both
//! unknown types and malformed payloads are terminal.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Maximum number of retry attempts before a task is failed permanently.
pub const MAX_RETRIES: i32 = 3;

/// Exponential backoff base, in minutes.
pub const BACKOFF_BASE_MINUTES: i64 = 4;

/// Number of due tasks a single runner invocation will process.
pub const BATCH_SIZE: i64 = 20;

/// Backoff before the `retry`-th re-attempt (1-based): `4^(retry-1)`
/// minutes, i.e. 1, 4, 16.
pub fn backoff_minutes(retry: i32) -> i64 {
    BACKOFF_BASE_MINUTES.pow(retry.saturating_sub(1).max(0) as u32)
}

/// Well-known task type names (the `tasks.task_type` column).
pub mod task_type {
    pub const CONFIRM_PAYMENT: &str = "confirm_payment";
    pub const CREATE_CALENDAR_EVENT: &str = "create_calendar_event";
    pub const SCHEDULE_REMINDERS: &str = "schedule_reminders";
    pub const SEND_REMINDER: &str = "send_reminder";
    pub const SEND_FOLLOWUP: &str = "send_followup";
    pub const NOTIFY_ADMIN: &str = "notify_admin";
}

/// Outbound message channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Email,
}

impl Channel {
    /// The channel name as stored in `messages.channel` and
    /// `message_templates.channel`.
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Email => "email",
        }
    }
}

/// Which reminder a `send_reminder` task delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Customer24h,
    Customer2h,
    Internal24h,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmPaymentPayload {
    /// The payment provider's intent/charge id.
    pub external_id: String,
    pub appointment_id: DbId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCalendarEventPayload {
    pub appointment_id: DbId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRemindersPayload {
    pub appointment_id: DbId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendReminderPayload {
    pub appointment_id: DbId,
    pub reminder: ReminderKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendFollowupPayload {
    pub channel: Channel,
    pub template_name: String,
    /// Template variables captured when the follow-up was scheduled.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyAdminPayload {
    pub reason: String,
}

/// The typed payload union, one variant per task type.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskPayload {
    ConfirmPayment(ConfirmPaymentPayload),
    CreateCalendarEvent(CreateCalendarEventPayload),
    ScheduleReminders(ScheduleRemindersPayload),
    SendReminder(SendReminderPayload),
    SendFollowup(SendFollowupPayload),
    NotifyAdmin(NotifyAdminPayload),
}

impl TaskPayload {
    /// Parse and validate a raw payload against its task type.
    ///
    /// Returns `CoreError::Configuration` for an unknown task type and
    /// `CoreError::Validation` for a payload that does not match the
    /// type's schema.
    pub fn parse(task_type: &str, payload: &serde_json::Value) -> Result<Self, CoreError> {
        let parsed = match task_type {
            task_type::CONFIRM_PAYMENT => Self::ConfirmPayment(from_value(task_type, payload)?),
            task_type::CREATE_CALENDAR_EVENT => {
                Self::CreateCalendarEvent(from_value(task_type, payload)?)
            }
            task_type::SCHEDULE_REMINDERS => {
                Self::ScheduleReminders(from_value(task_type, payload)?)
            }
            task_type::SEND_REMINDER => Self::SendReminder(from_value(task_type, payload)?),
            task_type::SEND_FOLLOWUP => Self::SendFollowup(from_value(task_type, payload)?),
            task_type::NOTIFY_ADMIN => Self::NotifyAdmin(from_value(task_type, payload)?),
            other => {
                return Err(CoreError::Configuration(format!(
                    "unknown task type: {other}"
                )))
            }
        };
        Ok(parsed)
    }
}

fn from_value<T: DeserializeOwned>(
    task_type: &str,
    payload: &serde_json::Value,
) -> Result<T, CoreError> {
    serde_json::from_value(payload.clone())
        .map_err(|e| CoreError::Validation(format!("invalid {task_type} payload: {e}")))
}
