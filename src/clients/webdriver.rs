// Minimal W3C WebDriver client for rendering JavaScript-heavy pages.
//
// Talks the plain HTTP/JSON WebDriver protocol to a running chromedriver (or
// any compatible driver). One session per render: create, navigate, wait for
// client-side rendering to settle, read the page source, then delete the
// session. The session is deleted on every path once it exists, so a failed
// navigation never leaks a browser process. That includes the render future
// being dropped mid-flight (request deadline, client disconnect): a guard
// then spawns the DELETE onto the runtime.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::traits::{PageRenderer, RenderedPage};

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Browser session settings.
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub base_url: String,
    pub headless: bool,
    /// Fixed pause after navigation so client-side rendering can finish.
    pub settle_delay: Duration,
    /// Also grab a PNG screenshot after the settle delay.
    pub capture_screenshot: bool,
    /// Timeout for each individual WebDriver command.
    pub command_timeout: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEBDRIVER_URL.to_string(),
            headless: true,
            settle_delay: Duration::from_secs(5),
            capture_screenshot: false,
            command_timeout: Duration::from_secs(30),
        }
    }
}

/// Renders pages through a WebDriver server.
pub struct WebDriverRenderer {
    client: Client,
    config: WebDriverConfig,
}

impl WebDriverRenderer {
    pub fn new(config: WebDriverConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.command_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            config: WebDriverConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    fn chrome_args(&self) -> Vec<&'static str> {
        let mut args = vec![
            "--window-size=1920,1080",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--lang=en-US",
        ];
        if self.config.headless {
            args.push("--headless=new");
        }
        args
    }

    async fn create_session(&self) -> Result<String> {
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": self.chrome_args() }
                }
            }
        });

        let value = self
            .command(
                self.client
                    .post(format!("{}/session", self.config.base_url))
                    .json(&capabilities),
                "new session",
            )
            .await?;

        let session: NewSession =
            serde_json::from_value(value).context("WebDriver returned no session id")?;
        Ok(session.session_id)
    }

    /// Everything that happens inside an open session.
    async fn drive(&self, session_id: &str, url: &str) -> Result<RenderedPage> {
        let base = format!("{}/session/{}", self.config.base_url, session_id);

        self.command(
            self.client
                .post(format!("{base}/url"))
                .json(&json!({ "url": url })),
            "navigate",
        )
        .await?;

        tokio::time::sleep(self.config.settle_delay).await;

        let source = self
            .command(self.client.get(format!("{base}/source")), "page source")
            .await?;
        let html = source
            .as_str()
            .context("WebDriver page source was not a string")?
            .to_string();

        let screenshot_png = if self.config.capture_screenshot {
            match self.screenshot(&base).await {
                Ok(png) => Some(png),
                Err(e) => {
                    warn!(error = %e, "Failed to capture screenshot");
                    None
                }
            }
        } else {
            None
        };

        Ok(RenderedPage {
            html,
            screenshot_png,
        })
    }

    async fn screenshot(&self, session_base: &str) -> Result<Vec<u8>> {
        let value = self
            .command(
                self.client.get(format!("{session_base}/screenshot")),
                "screenshot",
            )
            .await?;
        let encoded = value.as_str().context("Screenshot was not a string")?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .context("Screenshot was not valid base64")
    }

    fn session_url(&self, session_id: &str) -> String {
        format!("{}/session/{}", self.config.base_url, session_id)
    }

    async fn delete_session(&self, session_id: &str) {
        let url = self.session_url(session_id);
        match self.command(self.client.delete(url), "delete session").await {
            Ok(_) => debug!(session_id, "WebDriver session closed"),
            Err(e) => warn!(session_id, error = %e, "Failed to close WebDriver session"),
        }
    }

    /// Send a WebDriver command and unwrap the `value` envelope.
    async fn command(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<serde_json::Value> {
        let response = request
            .send()
            .await
            .with_context(|| format!("WebDriver {what} request failed"))?;

        let status = response.status();
        let envelope: Envelope = response
            .json()
            .await
            .with_context(|| format!("Failed to parse WebDriver {what} response"))?;

        if !status.is_success() {
            let error: WireError = serde_json::from_value(envelope.value).unwrap_or_default();
            anyhow::bail!(
                "WebDriver {} returned {}: {} {}",
                what,
                status,
                error.error,
                error.message
            );
        }

        Ok(envelope.value)
    }
}

#[async_trait]
impl PageRenderer for WebDriverRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        let session_id = self.create_session().await?;
        info!(session_id = %session_id, headless = self.config.headless, "Opened WebDriver session");

        let mut guard = SessionGuard {
            request: Some(self.client.delete(self.session_url(&session_id))),
            session_id: session_id.clone(),
        };

        let result = self.drive(&session_id, url).await;
        self.delete_session(&session_id).await;
        guard.disarm();
        result
    }
}

/// Closes the session from `Drop` if `render` never reached its own cleanup.
struct SessionGuard {
    request: Option<reqwest::RequestBuilder>,
    session_id: String,
}

impl SessionGuard {
    fn disarm(&mut self) {
        self.request = None;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(request) = self.request.take() else {
            return;
        };
        let session_id = std::mem::take(&mut self.session_id);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(session_id = %session_id, "No runtime left to close abandoned WebDriver session");
            return;
        };

        warn!(session_id = %session_id, "Render cancelled, closing WebDriver session");
        handle.spawn(async move {
            match request.send().await {
                Ok(_) => debug!(session_id = %session_id, "Abandoned WebDriver session closed"),
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Failed to close abandoned WebDriver session")
                }
            }
        });
    }
}

// --- WebDriver wire types ---

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewSession {
    session_id: String,
}

#[derive(Deserialize, Default)]
struct WireError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}
