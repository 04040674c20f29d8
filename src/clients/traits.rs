// Collaborator traits — the swap-ready seams around each external service.
//
// The adapters only talk to these traits. Production code plugs in the HTTP
// clients from this module; tests plug in stubs that record whether they were
// called. Credentials are passed per call because they arrive with each
// request rather than at construction time.

use anyhow::Result;
use async_trait::async_trait;

use crate::payload::CloudVisionPayload;

/// Hosts an image and returns a public URL for backends that need one.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload image bytes.
    ///
    /// `Ok(None)` means the host answered but reported failure. `Err` means
    /// the host could not be reached or answered with garbage.
    async fn upload(&self, image: &[u8], api_key: &str) -> Result<Option<String>>;
}

/// What the vision backend returned for a web-detection request.
#[derive(Debug, Clone, Default)]
pub struct VisionResponse {
    /// Set when the backend reports an error instead of results.
    pub error_message: Option<String>,
    pub payload: CloudVisionPayload,
}

/// Cloud vision "web detection" capability.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    async fn web_detection(&self, image: &[u8], api_key: &str) -> Result<VisionResponse>;
}

/// Reverse-image search aggregator queried by public image URL.
#[async_trait]
pub trait AggregatorBackend: Send + Sync {
    /// Returns the raw JSON document so the caller can check for an `error`
    /// field before attempting to parse anything else.
    async fn search_by_url(&self, image_url: &str, api_key: &str) -> Result<serde_json::Value>;
}

/// A page after client-side rendering.
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    pub html: String,
    /// PNG screenshot, when the renderer could take one.
    pub screenshot_png: Option<Vec<u8>>,
}

/// Drives a browser to a URL and returns the rendered document.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<RenderedPage>;
}
