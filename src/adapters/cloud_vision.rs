// Cloud Vision adapter.
//
// Sends the image bytes straight to web detection; no hosting step needed.
// Matching pages become visual matches, best-guess labels pass through
// untouched. An error reported by the API fails the scan with its message.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::traits::{FailurePolicy, ScanAdapter};
use crate::clients::traits::VisionBackend;
use crate::dispatch::{Credentials, Method};
use crate::error::ScanError;
use crate::keywords::KeywordExtractor;
use crate::payload::{
    normalize, normalize_legacy_vision, CloudVisionPayload, RawUpstreamPayload,
    CLOUD_VISION_METHOD,
};
use crate::result::{CommonResult, LegacyVisionResult};

pub struct CloudVisionAdapter {
    backend: Arc<dyn VisionBackend>,
    extractor: Arc<KeywordExtractor>,
}

impl CloudVisionAdapter {
    pub fn new(backend: Arc<dyn VisionBackend>, extractor: Arc<KeywordExtractor>) -> Self {
        Self { backend, extractor }
    }

    async fn fetch(&self, image: &[u8], api_key: &str) -> Result<CloudVisionPayload, ScanError> {
        info!(bytes = image.len(), "Sending image to Cloud Vision");

        let response = self
            .backend
            .web_detection(image, api_key)
            .await
            .map_err(|e| ScanError::Upstream(format!("{e:#}")))?;

        if let Some(message) = response.error_message {
            return Err(ScanError::Upstream(message));
        }
        Ok(response.payload)
    }

    /// Scan and return the original single-backend response shape.
    pub async fn scan_legacy(
        &self,
        image: &[u8],
        credentials: &Credentials,
    ) -> Result<LegacyVisionResult, ScanError> {
        let api_key = credentials.require_google()?;
        let payload = self.fetch(image, api_key).await?;
        Ok(normalize_legacy_vision(payload, &self.extractor))
    }
}

#[async_trait]
impl ScanAdapter for CloudVisionAdapter {
    fn method(&self) -> Method {
        Method::CloudVision
    }

    fn display_name(&self) -> &'static str {
        CLOUD_VISION_METHOD
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::FailFast
    }

    async fn scan(&self, image: &[u8], credentials: &Credentials) -> Result<CommonResult, ScanError> {
        let api_key = credentials.require_google()?;
        let payload = self.fetch(image, api_key).await?;
        Ok(normalize(
            RawUpstreamPayload::CloudVision(payload),
            &self.extractor,
        ))
    }
}
