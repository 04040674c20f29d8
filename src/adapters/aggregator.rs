// SerpApi (Google Lens) adapter.
//
// Two steps: host the image to get a public URL, then ask SerpApi about that
// URL. A response with an `error` field fails the scan outright; nothing else
// in it is read.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::traits::{FailurePolicy, ScanAdapter};
use super::upload_image;
use crate::clients::traits::{AggregatorBackend, ImageHost};
use crate::dispatch::{Credentials, Method};
use crate::error::ScanError;
use crate::keywords::KeywordExtractor;
use crate::payload::{normalize, AggregatorPayload, RawUpstreamPayload, AGGREGATOR_METHOD};
use crate::result::CommonResult;

pub struct AggregatorAdapter {
    host: Arc<dyn ImageHost>,
    backend: Arc<dyn AggregatorBackend>,
    extractor: Arc<KeywordExtractor>,
}

impl AggregatorAdapter {
    pub fn new(
        host: Arc<dyn ImageHost>,
        backend: Arc<dyn AggregatorBackend>,
        extractor: Arc<KeywordExtractor>,
    ) -> Self {
        Self {
            host,
            backend,
            extractor,
        }
    }
}

/// Check for an `error` field first, then parse the rest.
pub fn parse_aggregator_response(json: serde_json::Value) -> Result<AggregatorPayload, ScanError> {
    if let Some(error) = json.get("error") {
        let message = match error.as_str() {
            Some(s) => s.to_string(),
            None => error.to_string(),
        };
        return Err(ScanError::Upstream(message));
    }

    serde_json::from_value(json)
        .map_err(|e| ScanError::Upstream(format!("unexpected SerpApi response: {e}")))
}

#[async_trait]
impl ScanAdapter for AggregatorAdapter {
    fn method(&self) -> Method {
        Method::SerpApi
    }

    fn display_name(&self) -> &'static str {
        AGGREGATOR_METHOD
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::FailFast
    }

    async fn scan(&self, image: &[u8], credentials: &Credentials) -> Result<CommonResult, ScanError> {
        let (serpapi_key, imgbb_key) = credentials.require_aggregator()?;

        let public_url = upload_image(self.host.as_ref(), image, imgbb_key).await?;

        info!(url = %public_url, "Querying SerpApi google_lens");
        let json = self
            .backend
            .search_by_url(&public_url, serpapi_key)
            .await
            .map_err(|e| ScanError::Upstream(format!("{e:#}")))?;

        let payload = parse_aggregator_response(json)?;
        debug!(
            visual_matches = payload.visual_matches.len(),
            knowledge_graph = payload.knowledge_graph.is_some(),
            "SerpApi response parsed"
        );

        Ok(normalize(
            RawUpstreamPayload::Aggregator(payload),
            &self.extractor,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_field_short_circuits() {
        let json = json!({
            "error": "Invalid API key.",
            "visual_matches": [{"title": "ignored"}]
        });
        assert_eq!(
            parse_aggregator_response(json),
            Err(ScanError::Upstream("Invalid API key.".into()))
        );
    }

    #[test]
    fn non_string_error_is_stringified() {
        let json = json!({ "error": {"code": 429} });
        assert_eq!(
            parse_aggregator_response(json),
            Err(ScanError::Upstream(r#"{"code":429}"#.into()))
        );
    }

    #[test]
    fn drifted_match_does_not_fail_the_scan() {
        let json = json!({
            "visual_matches": [
                {"title": 5, "link": "https://a.example"},
                {"title": "Charmander", "thumbnail": {"url": "x"}}
            ]
        });
        let payload = parse_aggregator_response(json).unwrap();
        assert_eq!(payload.visual_matches.len(), 2);
        assert_eq!(payload.visual_matches[0].title, None);
        assert_eq!(payload.visual_matches[1].thumbnail, None);

        let empty = parse_aggregator_response(json!({ "visual_matches": null })).unwrap();
        assert!(empty.visual_matches.is_empty());
    }

    #[test]
    fn success_parses_matches() {
        let json = json!({
            "knowledge_graph": {"title": "Charmander", "subtitle": "Pokémon"},
            "visual_matches": [{"title": "a", "link": "b", "source": "c", "thumbnail": "d"}]
        });
        let payload = parse_aggregator_response(json).unwrap();
        assert_eq!(payload.visual_matches.len(), 1);
        assert_eq!(payload.visual_matches[0].thumbnail.as_deref(), Some("d"));
    }
}
