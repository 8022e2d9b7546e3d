//! Payment capability: payment intent creation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bookd_core::crypto::CredentialCipher;
use bookd_core::types::DbId;
use bookd_db::models::connection::{kind, provider};
use bookd_db::repositories::ConnectionRepo;
use serde::Deserialize;
use sqlx::PgPool;

use crate::ProviderError;

const PAYMENT_INTENTS_URL: &str = "https://api.stripe.com/v1/payment_intents";

/// A freshly created payment intent.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    /// Client-side secret handed to the payment form.
    pub client_secret: String,
    /// The provider's intent id, used to correlate the webhook.
    pub external_id: String,
}

/// Payment collaborator consumed by the booking core.
#[async_trait]
pub trait Payments: Send + Sync {
    /// Create a payment intent for `amount_cents` against the org's
    /// payment connection.
    async fn create_payment_intent(
        &self,
        org_id: DbId,
        amount_cents: i64,
        description: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, ProviderError>;
}

/// Stripe credentials stored (encrypted) in the org's payment connection.
#[derive(Debug, Deserialize)]
struct StripeConfig {
    secret_key: String,
    #[allow(dead_code)]
    publishable_key: String,
}

/// Production [`Payments`] implementation over the Stripe REST API.
pub struct StripePayments {
    pool: PgPool,
    cipher: Arc<CredentialCipher>,
    http: reqwest::Client,
}

impl StripePayments {
    pub fn new(pool: PgPool, cipher: Arc<CredentialCipher>) -> Self {
        Self {
            pool,
            cipher,
            http: crate::http_client(),
        }
    }

    async fn config(&self, org_id: DbId) -> Result<StripeConfig, ProviderError> {
        let conn = ConnectionRepo::find_active(&self.pool, org_id, kind::PAYMENT)
            .await?
            .ok_or(ProviderError::NotConnected {
                kind: "payment",
                org_id,
            })?;
        if conn.provider != provider::STRIPE {
            return Err(ProviderError::UnsupportedProvider {
                kind: "payment",
                provider: conn.provider,
            });
        }
        self.cipher
            .decrypt_json(&conn.config_encrypted)
            .map_err(|e| ProviderError::Credentials(e.to_string()))
    }
}

#[async_trait]
impl Payments for StripePayments {
    async fn create_payment_intent(
        &self,
        org_id: DbId,
        amount_cents: i64,
        description: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, ProviderError> {
        let config = self.config(org_id).await?;

        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), amount_cents.to_string()),
            ("currency".to_string(), "usd".to_string()),
            ("description".to_string(), description.to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        for (key, value) in metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }

        let response = self
            .http
            .post(PAYMENT_INTENTS_URL)
            .bearer_auth(&config.secret_key)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::HttpStatus {
                provider: "stripe",
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let data: serde_json::Value = response.json().await?;
        let client_secret = data["client_secret"].as_str();
        let external_id = data["id"].as_str();
        match (client_secret, external_id) {
            (Some(client_secret), Some(external_id)) => {
                tracing::info!(org_id, intent = %external_id, "Payment intent created");
                Ok(PaymentIntent {
                    client_secret: client_secret.to_string(),
                    external_id: external_id.to_string(),
                })
            }
            _ => Err(ProviderError::Decode("stripe payment intent")),
        }
    }
}
