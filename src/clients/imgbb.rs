// ImgBB image hosting client.
//
// SerpApi and Google Lens both need a publicly reachable image URL, so the
// submitted bytes are uploaded to ImgBB first. The image is sent base64
// encoded in a form field, which the upload endpoint accepts alongside
// multipart files.
//
// API docs: https://api.imgbb.com/

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::traits::ImageHost;

pub const DEFAULT_IMGBB_URL: &str = "https://api.imgbb.com";

/// Uploads images to ImgBB.
pub struct ImgbbClient {
    client: Client,
    base_url: String,
}

impl ImgbbClient {
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
impl ImageHost for ImgbbClient {
    async fn upload(&self, image: &[u8], api_key: &str) -> Result<Option<String>> {
        let url = format!("{}/1/upload", self.base_url);
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .form(&[("image", encoded.as_str())])
            .send()
            .await
            .context("Failed to reach ImgBB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "ImgBB rejected the upload");
            return Ok(None);
        }

        let body: UploadResponse = response
            .json()
            .await
            .context("Failed to parse ImgBB response")?;

        if !body.success {
            warn!("ImgBB reported an unsuccessful upload");
            return Ok(None);
        }

        let public_url = body.data.and_then(|d| d.url).filter(|u| !u.is_empty());
        debug!(url = ?public_url, bytes = image.len(), "Uploaded image to ImgBB");
        Ok(public_url)
    }
}

// --- ImgBB response types ---

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    data: Option<UploadData>,
}

#[derive(Deserialize)]
struct UploadData {
    url: Option<String>,
}
