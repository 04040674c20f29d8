// Scraped Google Lens adapter.
//
// The zero-cost backend: host the image, open Lens's upload-by-url page in a
// real browser, and pull result titles out of the rendered HTML. Lens markup
// uses obfuscated class names that change without notice, so the title
// selector lives in a shared SelectorRegistry and is re-derived by
// calibration whenever it stops matching.
//
// Scraping has no SLA. Browser failures and empty pages produce an empty
// result rather than an error; only a failed upload is fatal.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use super::calibration::{class_selector, detect_title_class};
use super::selector::SelectorRegistry;
use super::traits::{FailurePolicy, ScanAdapter};
use super::upload_image;
use crate::clients::traits::{ImageHost, PageRenderer, RenderedPage};
use crate::dispatch::{Credentials, Method};
use crate::error::ScanError;
use crate::keywords::KeywordExtractor;
use crate::payload::{
    normalize, Fragment, RawUpstreamPayload, ScrapedPayload, PLACEHOLDER_LINK, SCRAPED_METHOD,
};
use crate::result::CommonResult;

pub const DEFAULT_LENS_URL: &str = "https://lens.google.com";

/// Scraper settings that are not collaborators.
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    /// Text expected in result titles for the image being scanned. Without
    /// it, a stale selector cannot be recalibrated.
    pub calibration_probe: Option<String>,
    /// Where to write the screenshot and failing HTML for inspection.
    pub debug_dir: Option<PathBuf>,
    /// Lens base URL; overridable for tests.
    pub lens_url: Option<String>,
    /// Give up on the browser after this long. A render that runs out of time
    /// is an automation failure, not a request timeout.
    pub render_timeout: Option<Duration>,
}

pub struct ScrapedLensAdapter {
    host: Arc<dyn ImageHost>,
    renderer: Arc<dyn PageRenderer>,
    selectors: SelectorRegistry,
    extractor: Arc<KeywordExtractor>,
    options: ScrapeOptions,
}

impl ScrapedLensAdapter {
    pub fn new(
        host: Arc<dyn ImageHost>,
        renderer: Arc<dyn PageRenderer>,
        selectors: SelectorRegistry,
        extractor: Arc<KeywordExtractor>,
        options: ScrapeOptions,
    ) -> Self {
        Self {
            host,
            renderer,
            selectors,
            extractor,
            options,
        }
    }

    pub fn selectors(&self) -> &SelectorRegistry {
        &self.selectors
    }

    /// The Lens entry point for an already-hosted image.
    pub fn lens_url_for(&self, public_url: &str) -> String {
        let base = self
            .options
            .lens_url
            .as_deref()
            .unwrap_or(DEFAULT_LENS_URL)
            .trim_end_matches('/');
        format!(
            "{}/uploadbyurl?url={}",
            base,
            utf8_percent_encode(public_url, NON_ALPHANUMERIC)
        )
    }

    /// Render the Lens page for `public_url` and extract title fragments.
    pub async fn scrape(&self, public_url: &str) -> Result<ScrapedPayload, ScanError> {
        let lens_url = self.lens_url_for(public_url);
        info!(url = %lens_url, "Rendering Lens results");

        let render = self.renderer.render(&lens_url);
        let rendered = match self.options.render_timeout {
            Some(limit) => tokio::time::timeout(limit, render).await.map_err(|_| {
                ScanError::Automation(format!("Lens page did not render within {limit:?}"))
            })?,
            None => render.await,
        };
        let page = rendered.map_err(|e| ScanError::Automation(format!("{e:#}")))?;

        self.save_screenshot(&page);
        Ok(self.extract_fragments(&page.html))
    }

    /// Find title fragments with the cached selector, recalibrating once if
    /// it matches nothing.
    pub fn extract_fragments(&self, html: &str) -> ScrapedPayload {
        let document = Html::parse_document(html);
        let cached = self.selectors.current();

        let fragments = select_fragments(&document, &cached);
        if !fragments.is_empty() {
            debug!(selector = %cached, count = fragments.len(), "Cached selector matched");
            return ScrapedPayload {
                fragments,
                selector: cached,
            };
        }

        warn!(selector = %cached, "No title elements found with cached selector");
        self.save_debug_file("lens_failed.html", html.as_bytes());

        let Some(probe) = self.options.calibration_probe.as_deref() else {
            warn!("No calibration probe configured, skipping recalibration");
            return ScrapedPayload {
                fragments,
                selector: cached,
            };
        };

        let Some(class) = detect_title_class(&document, probe) else {
            warn!(probe, "Calibration found no candidate title class");
            return ScrapedPayload {
                fragments,
                selector: cached,
            };
        };

        let Some(candidate) = class_selector(&class) else {
            warn!(class = %class, "Calibrated class cannot be used as a selector");
            return ScrapedPayload {
                fragments,
                selector: cached,
            };
        };
        if self.selectors.compare_and_swap(&cached, &candidate) {
            info!(from = %cached, to = %candidate, "Calibrated new title selector");
        } else {
            debug!("Selector was recalibrated concurrently, using the current value");
        }

        let selector = self.selectors.current();
        ScrapedPayload {
            fragments: select_fragments(&document, &selector),
            selector,
        }
    }

    fn save_screenshot(&self, page: &RenderedPage) {
        if let Some(png) = &page.screenshot_png {
            self.save_debug_file("lens_screenshot.png", png);
        }
    }

    fn save_debug_file(&self, name: &str, contents: &[u8]) {
        let Some(dir) = self.options.debug_dir.as_deref() else {
            return;
        };
        let path = dir.join(name);
        match write_debug_file(&path, contents) {
            Ok(()) => debug!(path = %path.display(), "Saved debug artifact"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to save debug artifact"),
        }
    }
}

fn write_debug_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}

/// Every element matched by `selector`, reduced to its text and nearest link.
pub fn select_fragments(document: &Html, selector: &str) -> Vec<Fragment> {
    let parsed = match Selector::parse(selector) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(selector, error = ?e, "Invalid title selector");
            return Vec::new();
        }
    };

    document
        .select(&parsed)
        .filter_map(|element| {
            let title = element
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if title.is_empty() {
                return None;
            }
            Some(Fragment {
                title,
                link: enclosing_link(element),
            })
        })
        .collect()
}

/// href of the element itself or its nearest `<a>` ancestor.
fn enclosing_link(element: ElementRef<'_>) -> String {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find(|e| e.value().name() == "a")
        .and_then(|a| a.value().attr("href"))
        .unwrap_or(PLACEHOLDER_LINK)
        .to_string()
}

#[async_trait]
impl ScanAdapter for ScrapedLensAdapter {
    fn method(&self) -> Method {
        Method::Selenium
    }

    fn display_name(&self) -> &'static str {
        SCRAPED_METHOD
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::BestEffort
    }

    async fn scan(&self, image: &[u8], credentials: &Credentials) -> Result<CommonResult, ScanError> {
        let imgbb_key = credentials.require_image_host()?;
        let public_url = upload_image(self.host.as_ref(), image, imgbb_key).await?;

        let payload = self.scrape(&public_url).await?;
        info!(
            matches = payload.fragments.len(),
            selector = %payload.selector,
            "Lens scrape complete"
        );

        Ok(normalize(RawUpstreamPayload::Scraped(payload), &self.extractor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_take_text_and_enclosing_link() {
        let html = Html::parse_document(
            r#"<a href="https://shop.example/charmander"><div><span class="t"> Charmander <b>Plush</b> </span></div></a>
               <span class="t">No link</span>
               <span class="t">   </span>"#,
        );
        let fragments = select_fragments(&html, ".t");
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].title, "Charmander Plush");
        assert_eq!(fragments[0].link, "https://shop.example/charmander");
        assert_eq!(fragments[1].link, PLACEHOLDER_LINK);
    }

    #[test]
    fn invalid_selector_yields_nothing() {
        let html = Html::parse_document(r#"<span class="t">x</span>"#);
        assert!(select_fragments(&html, "div[").is_empty());
    }
}
