use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::GatewayError;

/// Fixed retry budget for the one-shot discovery call. There is no backoff
/// state machine here; exhaustion is fatal to the caller.
const DISCOVERY_ATTEMPTS: u32 = 3;
const RETRY_PAUSE: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    url: String,
}

/// Fetches the base gateway endpoint from the discovery API.
pub async fn fetch_endpoint(http: &Client, discovery_url: &str) -> Result<String, GatewayError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match try_fetch(http, discovery_url).await {
            Ok(base) => {
                debug!(endpoint = %base, "gateway endpoint discovered");
                return Ok(base);
            }
            Err(e) if attempt < DISCOVERY_ATTEMPTS => {
                warn!(attempt, error = %e, "gateway discovery failed, retrying");
                tokio::time::sleep(RETRY_PAUSE).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn try_fetch(http: &Client, discovery_url: &str) -> Result<String, GatewayError> {
    let resp = http
        .get(discovery_url)
        .header(
            "User-Agent",
            format!("{} (v{})", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        )
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GatewayError::DiscoveryStatus {
            status: status.as_u16(),
            body,
        });
    }

    let body: DiscoveryResponse = resp.json().await?;
    Ok(body.url)
}
