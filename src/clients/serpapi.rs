// SerpApi google_lens client.
//
// SerpApi proxies Google Lens and returns structured JSON with an optional
// knowledge graph and a list of visual matches. It only accepts a public image
// URL. Errors are reported in an `error` field, sometimes alongside a 2xx
// status, so the raw document is handed back unparsed.
//
// API docs: https://serpapi.com/google-lens-api

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::traits::AggregatorBackend;

pub const DEFAULT_SERPAPI_URL: &str = "https://serpapi.com";

/// SerpApi search client for the google_lens engine.
pub struct SerpApiClient {
    client: Client,
    base_url: String,
}

impl SerpApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AggregatorBackend for SerpApiClient {
    async fn search_by_url(&self, image_url: &str, api_key: &str) -> Result<serde_json::Value> {
        let url = format!("{}/search.json", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("engine", "google_lens"),
                ("url", image_url),
                ("api_key", api_key),
            ])
            .send()
            .await
            .context("Failed to call SerpApi")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read SerpApi response")?;

        // Error responses (invalid key, out of searches) still carry JSON with
        // an `error` field; let the caller surface that message.
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(json) => {
                debug!(status = %status, "SerpApi search complete");
                Ok(json)
            }
            Err(_) if !status.is_success() => {
                anyhow::bail!("SerpApi returned {}: {}", status, body)
            }
            Err(e) => Err(e).context("Failed to parse SerpApi response"),
        }
    }
}
