// Google Cloud Vision web-detection client.
//
// Calls the REST `images:annotate` endpoint with the WEB_DETECTION feature.
// The API reports errors in two places: a top-level `error` object on a
// non-2xx response (bad key, quota), and a per-image `error` inside
// `responses[0]`. Both are surfaced as `VisionResponse::error_message` so the
// adapter can pass the message through verbatim.
//
// API docs: https://cloud.google.com/vision/docs/detecting-web

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{VisionBackend, VisionResponse};
use crate::payload::{BestGuessLabel, CloudVisionPayload, MatchingPage, WebEntity};

pub const DEFAULT_VISION_URL: &str = "https://vision.googleapis.com";

/// Cloud Vision REST client authenticated with an API key.
pub struct CloudVisionClient {
    client: Client,
    base_url: String,
}

impl CloudVisionClient {
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
impl VisionBackend for CloudVisionClient {
    async fn web_detection(&self, image: &[u8], api_key: &str) -> Result<VisionResponse> {
        let url = format!("{}/v1/images:annotate", self.base_url);

        let request = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: base64::engine::general_purpose::STANDARD.encode(image),
                },
                features: vec![Feature {
                    kind: "WEB_DETECTION",
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .context("Failed to call Cloud Vision API")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read Cloud Vision response")?;

        let parsed: AnnotateResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                anyhow::bail!("Cloud Vision API returned {}: {}", status, body)
            }
            Err(e) => return Err(e).context("Failed to parse Cloud Vision response"),
        };

        if let Some(error) = parsed.error {
            return Ok(VisionResponse {
                error_message: Some(error.message),
                payload: CloudVisionPayload::default(),
            });
        }
        if !status.is_success() {
            anyhow::bail!("Cloud Vision API returned {}: {}", status, body);
        }

        let first = parsed.responses.into_iter().next().unwrap_or_default();
        if let Some(error) = first.error.filter(|e| !e.message.is_empty()) {
            return Ok(VisionResponse {
                error_message: Some(error.message),
                payload: CloudVisionPayload::default(),
            });
        }

        let detection = first.web_detection.unwrap_or_default();
        debug!(
            labels = detection.best_guess_labels.len(),
            pages = detection.pages_with_matching_images.len(),
            entities = detection.web_entities.len(),
            "Cloud Vision web detection complete"
        );

        Ok(VisionResponse {
            error_message: None,
            payload: detection.into_payload(),
        })
    }
}

/// Page titles come back as HTML snippets: `<b>` highlighting around matched
/// terms and escaped entities. Keep only the decoded text.
pub fn strip_markup(title: &str) -> String {
    Html::parse_fragment(title)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}

// --- Cloud Vision request/response types ---

#[derive(Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Serialize)]
struct AnnotateImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    web_detection: Option<WebDetection>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WebDetection {
    #[serde(default)]
    best_guess_labels: Vec<WireLabel>,
    #[serde(default)]
    pages_with_matching_images: Vec<WirePage>,
    #[serde(default)]
    web_entities: Vec<WireEntity>,
}

#[derive(Deserialize)]
struct WireLabel {
    #[serde(default)]
    label: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePage {
    #[serde(default)]
    url: String,
    #[serde(default)]
    page_title: String,
    score: Option<f64>,
}

#[derive(Deserialize)]
struct WireEntity {
    #[serde(default)]
    description: String,
    #[serde(default)]
    score: f64,
}

impl WebDetection {
    fn into_payload(self) -> CloudVisionPayload {
        CloudVisionPayload {
            best_guess_labels: self
                .best_guess_labels
                .into_iter()
                .map(|l| BestGuessLabel {
                    label: l.label,
                    confidence: None,
                })
                .collect(),
            pages_with_matching_images: self
                .pages_with_matching_images
                .into_iter()
                .map(|p| MatchingPage {
                    page_title: strip_markup(&p.page_title),
                    url: p.url,
                    score: p.score,
                })
                .collect(),
            // Entities without a description carry only an opaque id.
            web_entities: self
                .web_entities
                .into_iter()
                .filter(|e| !e.description.is_empty())
                .map(|e| WebEntity {
                    description: e.description,
                    score: e.score,
                })
                .collect(),
        }
    }
}
