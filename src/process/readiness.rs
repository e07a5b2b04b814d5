// src/process/readiness.rs

use std::time::Duration;

use tracing::{debug, trace};

use crate::errors::{DevloopError, Result};

/// Health-check URL of the app on the loopback interface.
pub fn health_url(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{port}{path}")
}

/// GET `url` up to `attempts` times, `interval` apart, until it answers 200.
pub async fn wait_until_ready(url: &str, attempts: u32, interval: Duration) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .map_err(|e| DevloopError::Other(e.into()))?;

    for attempt in 1..=attempts {
        match client.get(url).send().await {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => {
                debug!(url = %url, attempt, "app is ready");
                return Ok(());
            }
            Ok(resp) => trace!(url = %url, attempt, status = %resp.status(), "not ready yet"),
            Err(e) => trace!(url = %url, attempt, error = %e, "not ready yet"),
        }
        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }

    Err(DevloopError::Readiness {
        url: url.to_string(),
        attempts,
    })
}
