//! Calendar capability: free-busy lookup and event creation.
//!
//! [`ConnectedCalendar`] reads the org's active calendar connection and
//! dispatches to the Google or Microsoft client. OAuth tokens live in the
//! encrypted connection row and are refreshed transparently.

mod google;
mod microsoft;

use std::sync::Arc;

use async_trait::async_trait;
use bookd_core::availability::BusyInterval;
use bookd_core::crypto::CredentialCipher;
use bookd_core::types::{DbId, Timestamp};
use bookd_db::models::connection::{kind, provider};
use bookd_db::repositories::ConnectionRepo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::ProviderError;

/// Details of an event to create in the org's calendar.
#[derive(Debug, Clone)]
pub struct EventDetails {
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Calendar collaborator consumed by the booking core.
#[async_trait]
pub trait Calendar: Send + Sync {
    /// Busy intervals in the org's calendar over `[time_min, time_max)`.
    async fn free_busy(
        &self,
        org_id: DbId,
        time_min: Timestamp,
        time_max: Timestamp,
    ) -> Result<Vec<BusyInterval>, ProviderError>;

    /// Create an event in the org's calendar, returning the provider's
    /// event id.
    async fn create_event(
        &self,
        org_id: DbId,
        details: &EventDetails,
    ) -> Result<String, ProviderError>;
}

/// OAuth token set stored (encrypted) in `org_connections.config_encrypted`
/// for calendar providers.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CalendarTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_expiry: Timestamp,
}

/// Production [`Calendar`] implementation backed by the org's connection row.
pub struct ConnectedCalendar {
    pool: PgPool,
    cipher: Arc<CredentialCipher>,
    http: reqwest::Client,
}

impl ConnectedCalendar {
    pub fn new(pool: PgPool, cipher: Arc<CredentialCipher>) -> Self {
        Self {
            pool,
            cipher,
            http: crate::http_client(),
        }
    }

    async fn connection(
        &self,
        org_id: DbId,
    ) -> Result<bookd_db::models::connection::OrgConnection, ProviderError> {
        ConnectionRepo::find_active(&self.pool, org_id, kind::CALENDAR)
            .await?
            .ok_or(ProviderError::NotConnected {
                kind: "calendar",
                org_id,
            })
    }
}

#[async_trait]
impl Calendar for ConnectedCalendar {
    async fn free_busy(
        &self,
        org_id: DbId,
        time_min: Timestamp,
        time_max: Timestamp,
    ) -> Result<Vec<BusyInterval>, ProviderError> {
        let conn = self.connection(org_id).await?;
        match conn.provider.as_str() {
            provider::GOOGLE => google::free_busy(self, &conn, time_min, time_max).await,
            provider::MICROSOFT => microsoft::free_busy(self, &conn, time_min, time_max).await,
            other => Err(ProviderError::UnsupportedProvider {
                kind: "calendar",
                provider: other.to_string(),
            }),
        }
    }

    async fn create_event(
        &self,
        org_id: DbId,
        details: &EventDetails,
    ) -> Result<String, ProviderError> {
        let conn = self.connection(org_id).await?;
        let event_id = match conn.provider.as_str() {
            provider::GOOGLE => google::create_event(self, &conn, details).await?,
            provider::MICROSOFT => microsoft::create_event(self, &conn, details).await?,
            other => {
                return Err(ProviderError::UnsupportedProvider {
                    kind: "calendar",
                    provider: other.to_string(),
                })
            }
        };
        tracing::info!(org_id, event_id = %event_id, "Calendar event created");
        Ok(event_id)
    }
}

/// Decrypt the connection's token set.
pub(crate) fn decrypt_tokens(
    cal: &ConnectedCalendar,
    conn: &bookd_db::models::connection::OrgConnection,
) -> Result<CalendarTokens, ProviderError> {
    cal.cipher
        .decrypt_json(&conn.config_encrypted)
        .map_err(|e| ProviderError::Credentials(e.to_string()))
}

/// Re-encrypt and persist a refreshed token set.
pub(crate) async fn store_tokens(
    cal: &ConnectedCalendar,
    conn_id: DbId,
    tokens: &CalendarTokens,
) -> Result<(), ProviderError> {
    let blob = cal
        .cipher
        .encrypt_json(tokens)
        .map_err(|e| ProviderError::Credentials(e.to_string()))?;
    ConnectionRepo::update_config(&cal.pool, conn_id, &blob).await?;
    Ok(())
}

pub(crate) fn http(cal: &ConnectedCalendar) -> &reqwest::Client {
    &cal.http
}

/// Shape of an OAuth token-endpoint response (Google and Microsoft agree
/// on these fields).
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

/// Parse a provider timestamp: RFC 3339, or a naive datetime that the
/// request pinned to UTC (Microsoft Graph omits the offset).
pub(crate) fn parse_provider_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
