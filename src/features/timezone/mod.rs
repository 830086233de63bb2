//! # Timezone Detection Feature
//!
//! Best-effort IANA zone lookup from the caller's public IP, used to seed a
//! user's timezone on first contact. Any failure (network, bad payload,
//! unknown zone) falls back to the stored or default zone.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.6.0
//! - **Toggleable**: true

use log::debug;
use serde::Deserialize;
use std::time::Duration;

use crate::features::reminders::timing;

const LOOKUP_URL: &str = "https://ipapi.co/json";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    timezone: Option<String>,
}

/// Detect the local IANA zone via `ipapi.co`. Returns `None` on any failure;
/// callers always have a fallback zone.
pub async fn detect_timezone_by_ip() -> Option<String> {
    let client = reqwest::Client::builder()
        .timeout(LOOKUP_TIMEOUT)
        .build()
        .ok()?;
    let response = match client.get(LOOKUP_URL).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!("IP timezone lookup failed: {e}");
            return None;
        }
    };
    if !response.status().is_success() {
        debug!("IP timezone lookup returned {}", response.status());
        return None;
    }
    let payload: IpApiResponse = response.json().await.ok()?;
    let zone = payload.timezone?;
    if timing::resolve_timezone(&zone).is_err() {
        debug!("IP timezone lookup produced unknown zone {zone:?}");
        return None;
    }
    Some(zone)
}
