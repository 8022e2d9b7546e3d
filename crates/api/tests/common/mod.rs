//! Shared fixtures for API integration tests: a full app router wired to
//! mock collaborators, plus HTTP helpers.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use bookd_api::config::ServerConfig;
use bookd_api::routes;
use bookd_api::state::AppState;
use bookd_core::availability::BusyInterval;
use bookd_core::types::{DbId, Timestamp};
use bookd_providers::{
    Calendar, Email, EventDetails, PaymentIntent, Payments, ProviderError, Sms,
};
use bookd_queue::{HandlerContext, HandlerRegistry, TaskRunner};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Bearer secret the test config requires on the cron endpoint.
pub const TEST_CRON_SECRET: &str = "test-cron-secret";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        cron_secret: Some(TEST_CRON_SECRET.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

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
        Ok("evt_mock_api".to_string())
    }
}

pub struct MockPayments;

#[async_trait]
impl Payments for MockPayments {
    async fn create_payment_intent(
        &self,
        _org_id: DbId,
        _amount_cents: i64,
        _description: &str,
        _metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, ProviderError> {
        Ok(PaymentIntent {
            client_secret: "cs_test_secret".to_string(),
            external_id: "pi_test_intent".to_string(),
        })
    }
}

pub struct MockSms;

#[async_trait]
impl Sms for MockSms {
    async fn send(&self, _org_id: DbId, _to: &str, _body: &str) -> Result<String, ProviderError> {
        Ok("SM_mock".to_string())
    }
}

pub struct MockEmail;

#[async_trait]
impl Email for MockEmail {
    async fn send(&self, _to: &str, _subject: &str, _html: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App builder
// ---------------------------------------------------------------------------

/// Build the full application router with all middleware layers, using the
/// given database pool and mock collaborators.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();

    let calendar: Arc<dyn Calendar> = Arc::new(MockCalendar);
    let payments: Arc<dyn Payments> = Arc::new(MockPayments);
    let sms: Arc<dyn Sms> = Arc::new(MockSms);
    let email: Arc<dyn Email> = Arc::new(MockEmail);

    let ctx = HandlerContext::new(pool.clone(), Arc::clone(&calendar), sms, email);
    let runner = Arc::new(TaskRunner::new(ctx, HandlerRegistry::with_default_handlers()));

    let state = AppState {
        pool,
        config: Arc::new(config),
        calendar,
        payments,
        runner,
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("build request"),
    )
    .await
    .expect("infallible")
}

/// Issue a GET request with a bearer token.
pub async fn get_with_bearer(app: Router, uri: &str, token: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .expect("build request"),
    )
    .await
    .expect("infallible")
}

/// Issue a JSON POST request against the app.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request"),
    )
    .await
    .expect("infallible")
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}

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
