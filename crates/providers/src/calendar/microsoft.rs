//! Microsoft 365 calendar client: getSchedule queries and event creation
//! via Microsoft Graph, with OAuth refresh against the stored connection.

use bookd_core::availability::BusyInterval;
use bookd_core::types::Timestamp;
use bookd_db::models::connection::OrgConnection;
use chrono::{Duration, Utc};
use serde_json::json;

use super::{
    decrypt_tokens, http, parse_provider_datetime, store_tokens, CalendarTokens,
    ConnectedCalendar, EventDetails, TokenResponse,
};
use crate::ProviderError;

const TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
const GET_SCHEDULE_URL: &str = "https://graph.microsoft.com/v1.0/me/calendar/getSchedule";
const EVENTS_URL: &str = "https://graph.microsoft.com/v1.0/me/events";

async fn ensure_access_token(
    cal: &ConnectedCalendar,
    conn: &OrgConnection,
) -> Result<String, ProviderError> {
    let tokens = decrypt_tokens(cal, conn)?;
    if tokens.token_expiry > Utc::now() {
        return Ok(tokens.access_token);
    }

    let client_id = std::env::var("MICROSOFT_CLIENT_ID").unwrap_or_default();
    let client_secret = std::env::var("MICROSOFT_CLIENT_SECRET").unwrap_or_default();

    let response = http(cal)
        .post(TOKEN_URL)
        .form(&[
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("refresh_token", tokens.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
            ("scope", "Calendars.ReadWrite offline_access"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::HttpStatus {
            provider: "microsoft",
            status: response.status().as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    let token: TokenResponse = response.json().await?;
    let refreshed = CalendarTokens {
        access_token: token.access_token,
        refresh_token: token.refresh_token.unwrap_or(tokens.refresh_token),
        token_expiry: Utc::now() + Duration::seconds(token.expires_in),
    };
    store_tokens(cal, conn.id, &refreshed).await?;

    tracing::debug!(conn_id = conn.id, "Refreshed Microsoft access token");
    Ok(refreshed.access_token)
}

pub(super) async fn free_busy(
    cal: &ConnectedCalendar,
    conn: &OrgConnection,
    time_min: Timestamp,
    time_max: Timestamp,
) -> Result<Vec<BusyInterval>, ProviderError> {
    let access_token = ensure_access_token(cal, conn).await?;

    let response = http(cal)
        .post(GET_SCHEDULE_URL)
        .bearer_auth(&access_token)
        .json(&json!({
            "schedules": ["me"],
            "startTime": { "dateTime": time_min.to_rfc3339(), "timeZone": "UTC" },
            "endTime": { "dateTime": time_max.to_rfc3339(), "timeZone": "UTC" },
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::HttpStatus {
            provider: "microsoft",
            status: response.status().as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    let data: serde_json::Value = response.json().await?;
    let items = data["value"][0]["scheduleItems"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    items
        .iter()
        .map(|item| {
            let start = item["start"]["dateTime"]
                .as_str()
                .and_then(parse_provider_datetime);
            let end = item["end"]["dateTime"]
                .as_str()
                .and_then(parse_provider_datetime);
            match (start, end) {
                (Some(start), Some(end)) => Ok(BusyInterval { start, end }),
                _ => Err(ProviderError::Decode("microsoft getSchedule")),
            }
        })
        .collect()
}

pub(super) async fn create_event(
    cal: &ConnectedCalendar,
    conn: &OrgConnection,
    details: &EventDetails,
) -> Result<String, ProviderError> {
    let access_token = ensure_access_token(cal, conn).await?;

    let response = http(cal)
        .post(EVENTS_URL)
        .bearer_auth(&access_token)
        .json(&json!({
            "subject": details.summary,
            "body": { "contentType": "text", "content": details.description },
            "location": { "displayName": details.location },
            "start": { "dateTime": details.start.to_rfc3339(), "timeZone": "UTC" },
            "end": { "dateTime": details.end.to_rfc3339(), "timeZone": "UTC" },
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::HttpStatus {
            provider: "microsoft",
            status: response.status().as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    let data: serde_json::Value = response.json().await?;
    data["id"]
        .as_str()
        .map(str::to_string)
        .ok_or(ProviderError::Decode("microsoft event"))
}
