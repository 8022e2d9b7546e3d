//! External collaborator clients behind capability traits.
//!
//! The core treats each collaborator as a single capability: [`Calendar`]
//! (free-busy + event creation), [`Payments`] (intent creation), [`Sms`],
//! and [`Email`]. Provider selection (Google vs Microsoft, etc.) and OAuth
//! token refresh are this crate's responsibility; callers never see them.

pub mod calendar;
pub mod messaging;
pub mod payments;

use std::time::Duration;

use bookd_core::types::DbId;

pub use calendar::{Calendar, ConnectedCalendar, EventDetails};
pub use messaging::email::{Email, EmailConfig, SmtpEmail};
pub use messaging::sms::{Sms, TwilioSms};
pub use payments::{PaymentIntent, Payments, StripePayments};

/// HTTP request timeout for a single provider call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type shared by every provider client.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote service returned a non-2xx status code.
    #[error("{provider} returned HTTP {status}: {body}")]
    HttpStatus {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The org has no active connection of the required kind.
    #[error("No active {kind} connection for org {org_id}")]
    NotConnected { kind: &'static str, org_id: DbId },

    /// The connection names a provider this build does not support.
    #[error("Unsupported {kind} provider: {provider}")]
    UnsupportedProvider { kind: &'static str, provider: String },

    /// Stored credentials could not be decrypted or deserialized.
    #[error("Credential error: {0}")]
    Credentials(String),

    /// Reading or updating the connection row failed.
    #[error("Connection lookup failed: {0}")]
    Db(#[from] sqlx::Error),

    /// The remote response did not have the expected shape.
    #[error("Unexpected {0} response shape")]
    Decode(&'static str),

    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The capability is not configured in this deployment.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// Build the shared HTTP client used by all REST providers.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to build reqwest HTTP client")
}
