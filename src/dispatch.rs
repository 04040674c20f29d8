// Dispatcher — the seam external callers hit.
//
// Resolves a method key to its adapter, checks that the credentials that
// adapter needs are present, runs it under the request deadline and applies
// the adapter's failure policy. There is no fallback from one backend to
// another: a failed scan is reported, not retried elsewhere.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::adapters::aggregator::AggregatorAdapter;
use crate::adapters::cloud_vision::CloudVisionAdapter;
use crate::adapters::scraped::{ScrapeOptions, ScrapedLensAdapter};
use crate::adapters::selector::SelectorRegistry;
use crate::adapters::traits::ScanAdapter;
use crate::clients::imgbb::ImgbbClient;
use crate::clients::serpapi::SerpApiClient;
use crate::clients::traits::{AggregatorBackend, ImageHost, PageRenderer, VisionBackend};
use crate::clients::vision::CloudVisionClient;
use crate::clients::webdriver::{WebDriverConfig, WebDriverRenderer};
use crate::config::Config;
use crate::error::ScanError;
use crate::keywords::KeywordExtractor;
use crate::result::{CommonResult, LegacyVisionResult};

/// Which backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Google Cloud Vision web detection.
    CloudVision,
    /// SerpApi google_lens aggregator.
    SerpApi,
    /// Browser-scraped Google Lens.
    Selenium,
}

impl Method {
    /// Parse a method key. Absent or blank keys select Cloud Vision.
    pub fn parse(key: Option<&str>) -> Result<Self, ScanError> {
        match key.map(str::trim).unwrap_or("") {
            "" | "cloud_vision" => Ok(Self::CloudVision),
            "serpapi" | "aggregator" => Ok(Self::SerpApi),
            "selenium" | "scraped" => Ok(Self::Selenium),
            other => Err(ScanError::InvalidMethod(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CloudVision => "cloud_vision",
            Self::SerpApi => "serpapi",
            Self::Selenium => "selenium",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request credentials. Empty strings count as missing.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub google_api_key: Option<String>,
    pub serpapi_key: Option<String>,
    pub imgbb_key: Option<String>,
}

impl Credentials {
    pub fn from_config(config: &Config) -> Self {
        Self {
            google_api_key: Some(config.google_vision_api_key.clone()),
            serpapi_key: Some(config.serpapi_key.clone()),
            imgbb_key: Some(config.imgbb_key.clone()),
        }
    }

    pub fn require_google(&self) -> Result<&str, ScanError> {
        present(&self.google_api_key, "GOOGLE_VISION_API_KEY")
    }

    pub fn require_image_host(&self) -> Result<&str, ScanError> {
        present(&self.imgbb_key, "IMGBB_KEY")
    }

    /// SerpApi needs both its own key and the image host key.
    pub fn require_aggregator(&self) -> Result<(&str, &str), ScanError> {
        let serpapi = present(&self.serpapi_key, "SERPAPI_KEY")?;
        let imgbb = self.require_image_host()?;
        Ok((serpapi, imgbb))
    }

    /// Check everything `method` needs, before any network call.
    pub fn check(&self, method: Method) -> Result<(), ScanError> {
        match method {
            Method::CloudVision => self.require_google().map(|_| ()),
            Method::SerpApi => self.require_aggregator().map(|_| ()),
            Method::Selenium => self.require_image_host().map(|_| ()),
        }
    }
}

fn present<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ScanError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ScanError::Configuration(format!("{name} not set")))
}

/// The external services a Scanner talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub image_host: Arc<dyn ImageHost>,
    pub vision: Arc<dyn VisionBackend>,
    pub aggregator: Arc<dyn AggregatorBackend>,
    pub renderer: Arc<dyn PageRenderer>,
}

/// Everything else a Scanner needs.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub extractor: Arc<KeywordExtractor>,
    pub selectors: SelectorRegistry,
    pub scrape: ScrapeOptions,
    /// Deadline for a whole scan, upload included.
    pub request_timeout: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            extractor: Arc::new(KeywordExtractor::default()),
            selectors: SelectorRegistry::default(),
            scrape: ScrapeOptions::default(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// The requested render deadline if it fits inside the request deadline,
/// otherwise three quarters of the request deadline.
fn render_deadline(requested: Option<Duration>, request_timeout: Duration) -> Duration {
    requested
        .filter(|t| *t < request_timeout)
        .unwrap_or(request_timeout * 3 / 4)
}

/// Owns one adapter per backend and routes scans to them.
pub struct Scanner {
    cloud_vision: CloudVisionAdapter,
    aggregator: AggregatorAdapter,
    scraped: ScrapedLensAdapter,
    request_timeout: Duration,
}

impl Scanner {
    pub fn new(collaborators: Collaborators, settings: ScanSettings) -> Self {
        let Collaborators {
            image_host,
            vision,
            aggregator,
            renderer,
        } = collaborators;
        let ScanSettings {
            extractor,
            selectors,
            mut scrape,
            request_timeout,
        } = settings;

        // The page render must give up before the request deadline does, so a
        // hung browser degrades to an empty result instead of a timeout.
        scrape.render_timeout = Some(render_deadline(scrape.render_timeout, request_timeout));

        Self {
            cloud_vision: CloudVisionAdapter::new(vision, extractor.clone()),
            aggregator: AggregatorAdapter::new(image_host.clone(), aggregator, extractor.clone()),
            scraped: ScrapedLensAdapter::new(image_host, renderer, selectors, extractor, scrape),
            request_timeout,
        }
    }

    /// Build a Scanner wired to the real HTTP clients.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.request_timeout;
        let collaborators = Collaborators {
            image_host: Arc::new(ImgbbClient::new(&config.imgbb_url, timeout)?),
            vision: Arc::new(CloudVisionClient::new(&config.vision_url, timeout)?),
            aggregator: Arc::new(SerpApiClient::new(&config.serpapi_url, timeout)?),
            renderer: Arc::new(WebDriverRenderer::new(WebDriverConfig {
                base_url: config.webdriver_url.clone(),
                headless: config.headless,
                settle_delay: config.settle_delay,
                capture_screenshot: config.debug_dir.is_some(),
                command_timeout: timeout,
            })?),
        };

        let settings = ScanSettings {
            extractor: Arc::new(config.keyword_extractor()),
            selectors: SelectorRegistry::new(&config.title_selector),
            scrape: ScrapeOptions {
                calibration_probe: config.calibration_probe.clone(),
                debug_dir: config.debug_dir.as_ref().map(PathBuf::from),
                lens_url: None,
                render_timeout: config.render_timeout,
            },
            request_timeout: timeout,
        };

        Ok(Self::new(collaborators, settings))
    }

    fn adapter(&self, method: Method) -> &dyn ScanAdapter {
        match method {
            Method::CloudVision => &self.cloud_vision,
            Method::SerpApi => &self.aggregator,
            Method::Selenium => &self.scraped,
        }
    }

    /// The selector registry shared by every scraped scan on this Scanner.
    pub fn selectors(&self) -> &SelectorRegistry {
        self.scraped.selectors()
    }

    /// Scan `image` with the backend named by `method` (Cloud Vision when None).
    pub async fn dispatch(
        &self,
        image: &[u8],
        method: Option<&str>,
        credentials: &Credentials,
    ) -> Result<CommonResult, ScanError> {
        let method = Method::parse(method)?;
        credentials.check(method)?;

        let adapter = self.adapter(method);
        info!(method = %method, bytes = image.len(), "Dispatching scan");

        let outcome = self.with_deadline(adapter.scan(image, credentials)).await;
        let result = adapter.failure_policy().apply(adapter.display_name(), outcome);

        match &result {
            Ok(r) => info!(
                method = %method,
                best_guesses = r.best_guesses.len(),
                visual_matches = r.visual_matches.len(),
                "Scan complete"
            ),
            Err(e) => warn!(method = %method, error = %e, "Scan failed"),
        }
        result
    }

    /// Cloud Vision scan in the legacy single-backend shape.
    pub async fn dispatch_legacy(
        &self,
        image: &[u8],
        credentials: &Credentials,
    ) -> Result<LegacyVisionResult, ScanError> {
        credentials.check(Method::CloudVision)?;
        self.with_deadline(self.cloud_vision.scan_legacy(image, credentials))
            .await
    }

    async fn with_deadline<T>(
        &self,
        scan: impl std::future::Future<Output = Result<T, ScanError>>,
    ) -> Result<T, ScanError> {
        tokio::time::timeout(self.request_timeout, scan)
            .await
            .map_err(|_| ScanError::Timeout(self.request_timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults_to_cloud_vision() {
        assert_eq!(Method::parse(None), Ok(Method::CloudVision));
        assert_eq!(Method::parse(Some("")), Ok(Method::CloudVision));
        assert_eq!(Method::parse(Some("cloud_vision")), Ok(Method::CloudVision));
    }

    #[test]
    fn parse_known_keys() {
        assert_eq!(Method::parse(Some("serpapi")), Ok(Method::SerpApi));
        assert_eq!(Method::parse(Some("selenium")), Ok(Method::Selenium));
        assert_eq!(Method::parse(Some(" selenium ")), Ok(Method::Selenium));
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(
            Method::parse(Some("not_a_method")),
            Err(ScanError::InvalidMethod("not_a_method".into()))
        );
    }

    #[test]
    fn aggregator_needs_both_keys() {
        let creds = Credentials {
            serpapi_key: Some("serp".into()),
            ..Default::default()
        };
        assert!(matches!(
            creds.check(Method::SerpApi),
            Err(ScanError::Configuration(msg)) if msg.contains("IMGBB_KEY")
        ));

        let creds = Credentials {
            imgbb_key: Some("img".into()),
            ..Default::default()
        };
        assert!(matches!(
            creds.check(Method::SerpApi),
            Err(ScanError::Configuration(msg)) if msg.contains("SERPAPI_KEY")
        ));
    }

    #[test]
    fn scraped_needs_only_image_host() {
        let creds = Credentials {
            imgbb_key: Some("img".into()),
            ..Default::default()
        };
        assert!(creds.check(Method::Selenium).is_ok());
        assert!(creds.check(Method::CloudVision).is_err());
    }

    #[test]
    fn render_deadline_stays_inside_request_deadline() {
        let request = Duration::from_secs(60);
        assert_eq!(render_deadline(None, request), Duration::from_secs(45));
        assert_eq!(
            render_deadline(Some(Duration::from_secs(20)), request),
            Duration::from_secs(20)
        );
        assert_eq!(
            render_deadline(Some(Duration::from_secs(90)), request),
            Duration::from_secs(45)
        );
        assert_eq!(
            render_deadline(None, Duration::from_millis(400)),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let creds = Credentials {
            google_api_key: Some("   ".into()),
            ..Default::default()
        };
        assert!(matches!(
            creds.check(Method::CloudVision),
            Err(ScanError::Configuration(_))
        ));
    }
}
