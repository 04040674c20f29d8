use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::adapters::selector::DEFAULT_TITLE_SELECTOR;
use crate::clients::imgbb::DEFAULT_IMGBB_URL;
use crate::clients::serpapi::DEFAULT_SERPAPI_URL;
use crate::clients::vision::DEFAULT_VISION_URL;
use crate::clients::webdriver::DEFAULT_WEBDRIVER_URL;
use crate::keywords::KeywordExtractor;

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cloud Vision API key (GOOGLE_VISION_API_KEY)
    pub google_vision_api_key: String,
    /// SerpApi key (each google_lens search costs one credit)
    pub serpapi_key: String,
    /// ImgBB key, needed by every method that requires a public image URL
    pub imgbb_key: String,
    pub vision_url: String,
    pub serpapi_url: String,
    pub imgbb_url: String,
    /// WebDriver server (chromedriver) used for scraping Lens
    pub webdriver_url: String,
    pub headless: bool,
    /// Pause after navigation before reading the rendered page
    pub settle_delay: Duration,
    /// Deadline for a whole scan, and for each outbound HTTP call
    pub request_timeout: Duration,
    /// How long the browser may take to render Lens (unset = 3/4 of request_timeout)
    pub render_timeout: Option<Duration>,
    /// Text expected in Lens result titles, used to recalibrate the title selector
    pub calibration_probe: Option<String>,
    /// Directory for screenshots and failing HTML (unset = no artifacts)
    pub debug_dir: Option<String>,
    /// Initial Lens title selector
    pub title_selector: String,
    /// Extra comma-separated stop words for keyword extraction
    pub extra_stop_words: Vec<String>,
    /// Also ignore the full English stop-word list (SCANLENS_ENGLISH_STOP_WORDS)
    pub english_stop_words: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every key is optional at load time; which ones are required depends on
    /// the scan method and is checked per request.
    pub fn load() -> Result<Self> {
        Ok(Self {
            google_vision_api_key: env::var("GOOGLE_VISION_API_KEY").unwrap_or_default(),
            serpapi_key: env::var("SERPAPI_KEY").unwrap_or_default(),
            imgbb_key: env::var("IMGBB_KEY").unwrap_or_default(),
            vision_url: env::var("GOOGLE_VISION_URL")
                .unwrap_or_else(|_| DEFAULT_VISION_URL.to_string()),
            serpapi_url: env::var("SERPAPI_URL").unwrap_or_else(|_| DEFAULT_SERPAPI_URL.to_string()),
            imgbb_url: env::var("IMGBB_URL").unwrap_or_else(|_| DEFAULT_IMGBB_URL.to_string()),
            webdriver_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| DEFAULT_WEBDRIVER_URL.to_string()),
            headless: parse_bool(env::var("SCANLENS_HEADLESS").ok().as_deref(), true),
            settle_delay: Duration::from_secs(parse_secs("SCANLENS_SETTLE_SECS", 5)?),
            request_timeout: Duration::from_secs(parse_secs("SCANLENS_REQUEST_TIMEOUT_SECS", 60)?),
            render_timeout: match parse_secs("SCANLENS_RENDER_TIMEOUT_SECS", 0)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            calibration_probe: non_empty(env::var("SCANLENS_CALIBRATION_PROBE").ok()),
            debug_dir: non_empty(env::var("SCANLENS_DEBUG_DIR").ok()),
            title_selector: non_empty(env::var("SCANLENS_TITLE_SELECTOR").ok())
                .unwrap_or_else(|| DEFAULT_TITLE_SELECTOR.to_string()),
            extra_stop_words: env::var("SCANLENS_EXTRA_STOP_WORDS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            english_stop_words: parse_bool(
                env::var("SCANLENS_ENGLISH_STOP_WORDS").ok().as_deref(),
                false,
            ),
        })
    }

    /// The keyword extractor configured with any extra stop words.
    pub fn keyword_extractor(&self) -> KeywordExtractor {
        build_extractor(&self.extra_stop_words, self.english_stop_words)
    }

    /// Check that the Cloud Vision key is configured.
    pub fn require_google(&self) -> Result<()> {
        if self.google_vision_api_key.is_empty() {
            anyhow::bail!(
                "GOOGLE_VISION_API_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }

    /// Check that the ImgBB key is configured.
    /// Call this before any operation that needs a public image URL.
    pub fn require_imgbb(&self) -> Result<()> {
        if self.imgbb_key.is_empty() {
            anyhow::bail!(
                "IMGBB_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }
}

fn build_extractor(extra: &[String], english: bool) -> KeywordExtractor {
    let extractor = KeywordExtractor::default().with_stop_words(extra.iter().cloned());
    if english {
        extractor.with_english_stop_words()
    } else {
        extractor
    }
}

fn parse_secs(var: &str, default: u64) -> Result<u64> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .with_context(|| format!("{var} must be a whole number of seconds, got {v:?}")),
        _ => Ok(default),
    }
}

fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}
