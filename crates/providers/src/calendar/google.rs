//! Google Calendar client: freeBusy queries and event creation via the
//! Calendar v3 REST API, with OAuth refresh against the stored connection.

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

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const FREEBUSY_URL: &str = "https://www.googleapis.com/calendar/v3/freeBusy";

fn calendar_id(conn: &OrgConnection) -> &str {
    conn.calendar_id.as_deref().unwrap_or("primary")
}

/// Return a currently valid access token, refreshing and re-persisting the
/// stored credentials when the cached one has expired.
async fn ensure_access_token(
    cal: &ConnectedCalendar,
    conn: &OrgConnection,
) -> Result<String, ProviderError> {
    let tokens = decrypt_tokens(cal, conn)?;
    if tokens.token_expiry > Utc::now() {
        return Ok(tokens.access_token);
    }

    let client_id = std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default();
    let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default();

    let response = http(cal)
        .post(TOKEN_URL)
        .form(&[
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("refresh_token", tokens.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::HttpStatus {
            provider: "google",
            status: response.status().as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    let token: TokenResponse = response.json().await?;
    let refreshed = CalendarTokens {
        access_token: token.access_token,
        // Google only returns a refresh token on first authorization.
        refresh_token: token.refresh_token.unwrap_or(tokens.refresh_token),
        token_expiry: Utc::now() + Duration::seconds(token.expires_in),
    };
    store_tokens(cal, conn.id, &refreshed).await?;

    tracing::debug!(conn_id = conn.id, "Refreshed Google access token");
    Ok(refreshed.access_token)
}

pub(super) async fn free_busy(
    cal: &ConnectedCalendar,
    conn: &OrgConnection,
    time_min: Timestamp,
    time_max: Timestamp,
) -> Result<Vec<BusyInterval>, ProviderError> {
    let access_token = ensure_access_token(cal, conn).await?;
    let id = calendar_id(conn);

    let response = http(cal)
        .post(FREEBUSY_URL)
        .bearer_auth(&access_token)
        .json(&json!({
            "timeMin": time_min.to_rfc3339(),
            "timeMax": time_max.to_rfc3339(),
            "items": [{ "id": id }],
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::HttpStatus {
            provider: "google",
            status: response.status().as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    let data: serde_json::Value = response.json().await?;
    let busy = data["calendars"][id]["busy"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    busy.iter()
        .map(|slot| {
            let start = slot["start"].as_str().and_then(parse_provider_datetime);
            let end = slot["end"].as_str().and_then(parse_provider_datetime);
            match (start, end) {
                (Some(start), Some(end)) => Ok(BusyInterval { start, end }),
                _ => Err(ProviderError::Decode("google freeBusy")),
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
    let id = calendar_id(conn);
    let url = format!(
        "https://www.googleapis.com/calendar/v3/calendars/{}/events",
        urlencode(id)
    );

    let response = http(cal)
        .post(&url)
        .bearer_auth(&access_token)
        .json(&json!({
            "summary": details.summary,
            "description": details.description,
            "location": details.location,
            "start": { "dateTime": details.start.to_rfc3339() },
            "end": { "dateTime": details.end.to_rfc3339() },
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::HttpStatus {
            provider: "google",
            status: response.status().as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    let data: serde_json::Value = response.json().await?;
    data["id"]
        .as_str()
        .map(str::to_string)
        .ok_or(ProviderError::Decode("google event"))
}

/// Percent-encode a calendar id for use as a path segment.
fn urlencode(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            other => format!("%{other:02X}"),
        })
        .collect()
}
