//! SMS capability over the Twilio REST API.

use std::sync::Arc;

use async_trait::async_trait;
use bookd_core::crypto::CredentialCipher;
use bookd_core::types::DbId;
use bookd_db::models::connection::{kind, provider};
use bookd_db::repositories::ConnectionRepo;
use serde::Deserialize;
use sqlx::PgPool;

use crate::ProviderError;

/// SMS collaborator consumed by the booking core.
#[async_trait]
pub trait Sms: Send + Sync {
    /// Send a text message from the org's number. Returns the provider's
    /// message id.
    async fn send(&self, org_id: DbId, to: &str, body: &str) -> Result<String, ProviderError>;
}

/// Twilio credentials stored (encrypted) in the org's sms connection.
#[derive(Debug, Deserialize)]
struct TwilioConfig {
    account_sid: String,
    auth_token: String,
    phone_number: String,
}

/// Production [`Sms`] implementation over the Twilio REST API.
pub struct TwilioSms {
    pool: PgPool,
    cipher: Arc<CredentialCipher>,
    http: reqwest::Client,
}

impl TwilioSms {
    pub fn new(pool: PgPool, cipher: Arc<CredentialCipher>) -> Self {
        Self {
            pool,
            cipher,
            http: crate::http_client(),
        }
    }

    async fn config(&self, org_id: DbId) -> Result<TwilioConfig, ProviderError> {
        let conn = ConnectionRepo::find_active(&self.pool, org_id, kind::SMS)
            .await?
            .ok_or(ProviderError::NotConnected { kind: "sms", org_id })?;
        if conn.provider != provider::TWILIO {
            return Err(ProviderError::UnsupportedProvider {
                kind: "sms",
                provider: conn.provider,
            });
        }
        self.cipher
            .decrypt_json(&conn.config_encrypted)
            .map_err(|e| ProviderError::Credentials(e.to_string()))
    }
}

#[async_trait]
impl Sms for TwilioSms {
    async fn send(&self, org_id: DbId, to: &str, body: &str) -> Result<String, ProviderError> {
        let config = self.config(org_id).await?;
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            config.account_sid
        );

        let response = self
            .http
            .post(&url)
            .basic_auth(&config.account_sid, Some(&config.auth_token))
            .form(&[
                ("To", to),
                ("From", config.phone_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::HttpStatus {
                provider: "twilio",
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let data: serde_json::Value = response.json().await?;
        let sid = data["sid"]
            .as_str()
            .map(str::to_string)
            .ok_or(ProviderError::Decode("twilio message"))?;

        tracing::info!(org_id, sid = %sid, "SMS sent");
        Ok(sid)
    }
}
