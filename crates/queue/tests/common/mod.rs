//! Shared fixtures and mock collaborators for queue integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bookd_core::availability::BusyInterval;
use bookd_core::tasks::TaskPayload;
use bookd_core::types::{DbId, Timestamp};
use bookd_db::models::task::Task;
use bookd_providers::{Calendar, Email, EventDetails, ProviderError, Sms};
use bookd_queue::{HandlerContext, TaskHandler};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert an org with the given config JSON and return its id.
pub async fn insert_org(pool: &PgPool, config: serde_json::Value) -> DbId {
    sqlx::query_scalar("INSERT INTO orgs (name, config) VALUES ('Test Org', $1) RETURNING id")
        .bind(config)
        .fetch_one(pool)
        .await
        .expect("insert org")
}

/// Insert a lead for the org and return its id.
pub async fn insert_lead(pool: &PgPool, org_id: DbId) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO leads (org_id, name, phone, email) \
         VALUES ($1, 'Dana Fixture', '+15550100', 'dana@example.test') \
         RETURNING id",
    )
    .bind(org_id)
    .fetch_one(pool)
    .await
    .expect("insert lead")
}

/// Insert a message template and return its id.
pub async fn insert_template(
    pool: &PgPool,
    org_id: DbId,
    channel: &str,
    name: &str,
    body: &str,
) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO message_templates (org_id, channel, name, body) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id",
    )
    .bind(org_id)
    .bind(channel)
    .bind(name)
    .bind(body)
    .fetch_one(pool)
    .await
    .expect("insert template")
}

/// Insert a confirmed appointment directly (as if booked earlier).
pub async fn insert_confirmed_appointment(
    pool: &PgPool,
    org_id: DbId,
    lead_id: DbId,
    start_at: Timestamp,
    end_at: Timestamp,
) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO appointments (org_id, lead_id, start_at, end_at, status_id) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id",
    )
    .bind(org_id)
    .bind(lead_id)
    .bind(start_at)
    .bind(end_at)
    .bind(bookd_db::models::status::AppointmentStatus::Confirmed.id())
    .fetch_one(pool)
    .await
    .expect("insert appointment")
}

/// Count events of a type for an org.
pub async fn count_events(pool: &PgPool, org_id: DbId, event_type: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE org_id = $1 AND event_type = $2")
        .bind(org_id)
        .bind(event_type)
        .fetch_one(pool)
        .await
        .expect("count events")
}

/// Make every queued task due immediately.
pub async fn make_all_due(pool: &PgPool) {
    sqlx::query("UPDATE tasks SET run_at = NOW()")
        .execute(pool)
        .await
        .expect("force run_at");
}

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

/// Calendar that reports no busy time and returns a fixed event id.
pub struct MockCalendar;

#[async_trait]
impl Calendar for MockCalendar {
    async fn free_busy(
        &self,
        _org_id: DbId,
        _time_min: Timestamp,
        _time_max: Timestamp,
    ) -> Result<Vec<BusyInterval>, ProviderError> {
        Ok(Vec::new())
    }

    async fn create_event(
        &self,
        _org_id: DbId,
        _details: &EventDetails,
    ) -> Result<String, ProviderError> {
        Ok("evt_mock_1".to_string())
    }
}

/// SMS sender that records every message instead of delivering it.
#[derive(Default)]
pub struct MockSms {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Sms for MockSms {
    async fn send(&self, _org_id: DbId, to: &str, body: &str) -> Result<String, ProviderError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok("SM_mock".to_string())
    }
}

/// Email sender that records every message instead of delivering it.
#[derive(Default)]
pub struct MockEmail {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Email for MockEmail {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<(), ProviderError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

/// Build a handler context wired to the mock collaborators.
pub fn mock_context(pool: PgPool) -> (HandlerContext, Arc<MockSms>, Arc<MockEmail>) {
    let sms = Arc::new(MockSms::default());
    let email = Arc::new(MockEmail::default());
    let ctx = HandlerContext::new(
        pool,
        Arc::new(MockCalendar),
        Arc::clone(&sms) as Arc<dyn Sms>,
        Arc::clone(&email) as Arc<dyn Email>,
    );
    (ctx, sms, email)
}

// ---------------------------------------------------------------------------
// Test handlers
// ---------------------------------------------------------------------------

/// Fails its first `fail_times` attempts, then succeeds.
pub struct FlakyHandler {
    fail_times: usize,
    calls: AtomicUsize,
}

impl FlakyHandler {
    pub fn new(fail_times: usize) -> Self {
        Self {
            fail_times,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TaskHandler for FlakyHandler {
    async fn run(
        &self,
        _ctx: &HandlerContext,
        _task: &Task,
        _payload: &TaskPayload,
    ) -> anyhow::Result<()> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_times {
            anyhow::bail!("simulated failure on attempt {}", attempt + 1);
        }
        Ok(())
    }
}

/// Records the id of every task it runs, in order.
pub struct RecordingHandler {
    pub seen: Arc<Mutex<Vec<DbId>>>,
}

#[async_trait]
impl TaskHandler for RecordingHandler {
    async fn run(
        &self,
        _ctx: &HandlerContext,
        task: &Task,
        _payload: &TaskPayload,
    ) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(task.id);
        Ok(())
    }
}
