use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::results::FetchTarget;
use fantoccini::wd::Capabilities;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::time::Duration;
use tokio::time::{Instant, timeout, timeout_at};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Headless rendering backend, if one is configured
#[derive(Debug, Clone)]
pub enum RenderBackend {
    /// No WebDriver configured; the strategy is skipped
    Absent,
    /// Render through a WebDriver endpoint
    WebDriver(WebDriverRenderer),
}

impl RenderBackend {
    /// Select the backend from configuration
    pub fn from_config(config: &RelayConfig) -> Self {
        match &config.webdriver_url {
            Some(url) => RenderBackend::WebDriver(WebDriverRenderer::new(
                url,
                config.timings.render_timeout(),
                config.timings.render_settle(),
            )),
            None => RenderBackend::Absent,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, RenderBackend::WebDriver(_))
    }

    /// Render the target, swallowing every failure.
    ///
    /// `None` means "no result"; the caller moves on to the next strategy.
    pub async fn render(&self, target: &FetchTarget) -> Option<String> {
        let renderer = match self {
            RenderBackend::Absent => return None,
            RenderBackend::WebDriver(renderer) => renderer,
        };

        match renderer.render(target).await {
            Ok(markup) if !markup.trim().is_empty() => Some(markup),
            Ok(_) => {
                ::log::warn!("Renderer returned empty markup for {}", target.url());
                None
            }
            Err(e) => {
                ::log::warn!("Rendering failed for {}: {}", target.url(), e);
                None
            }
        }
    }
}

/// Opens one WebDriver session per render and closes it afterwards
#[derive(Debug, Clone)]
pub struct WebDriverRenderer {
    webdriver_url: String,
    navigation_timeout: Duration,
    settle: Duration,
}

impl WebDriverRenderer {
    pub fn new(webdriver_url: &str, navigation_timeout: Duration, settle: Duration) -> Self {
        Self {
            webdriver_url: webdriver_url.to_string(),
            navigation_timeout,
            settle,
        }
    }

    /// Load the page and capture its materialized markup.
    ///
    /// Connect, navigation, settle and capture share one deadline.
    pub async fn render(&self, target: &FetchTarget) -> Result<String> {
        let started = Instant::now();
        let deadline = started + self.session_budget();

        let client = match timeout_at(deadline, self.connect(target.user_agent())).await {
            Ok(client) => client?,
            Err(_) => {
                return Err(RelayError::Render(format!(
                    "timed out connecting to WebDriver at {}",
                    self.webdriver_url
                )));
            }
        };

        let result = match timeout_at(deadline, self.capture(&client, target)).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::Render(format!(
                "rendering {} exceeded {:?}",
                target.url(),
                self.session_budget()
            ))),
        };

        release(client);

        if let Ok(markup) = &result {
            ::log::debug!(
                "Rendered {} ({} bytes) in {:.2} seconds",
                target.url(),
                markup.len(),
                started.elapsed().as_secs_f64()
            );
        }
        result
    }

    /// Navigation bound plus the settle delay
    fn session_budget(&self) -> Duration {
        self.navigation_timeout + self.settle
    }

    /// Connects to the WebDriver instance
    async fn connect(&self, user_agent: &str) -> Result<Client> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(session_capabilities(user_agent, self.navigation_timeout));

        match builder.connect(&self.webdriver_url).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", self.webdriver_url);
                Ok(client)
            }
            Err(e) => Err(RelayError::Render(format!(
                "failed to connect to WebDriver at {}: {}",
                self.webdriver_url, e
            ))),
        }
    }

    async fn capture(&self, client: &Client, target: &FetchTarget) -> Result<String> {
        // Eager page load strategy makes goto return at DOMContentLoaded
        client
            .goto(target.url().as_str())
            .await
            .map_err(|e| navigation_error(e, "accessing", target))?;

        tokio::time::sleep(self.settle).await;

        client
            .source()
            .await
            .map_err(|e| navigation_error(e, "getting source for", target))
    }
}

/// Close the session in the background; a hung close only costs its own task
fn release(client: Client) {
    tokio::spawn(async move {
        match timeout(CLOSE_TIMEOUT, client.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => ::log::warn!("Failed to close WebDriver session: {}", e),
            Err(_) => ::log::warn!("Closing WebDriver session timed out"),
        }
    });
}

/// Session capabilities: eager load, fixed identity, no heavy subresources
fn session_capabilities(user_agent: &str, navigation_timeout: Duration) -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert("pageLoadStrategy".to_string(), json!("eager"));
    caps.insert(
        "timeouts".to_string(),
        json!({ "pageLoad": navigation_timeout.as_millis() as u64 }),
    );
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({
            "args": [
                "--headless=new",
                "--disable-gpu",
                "--blink-settings=imagesEnabled=false",
                "--autoplay-policy=user-gesture-required",
                format!("--user-agent={}", user_agent),
            ],
            "prefs": {
                "profile.managed_default_content_settings.images": 2,
                "profile.managed_default_content_settings.stylesheets": 2,
                "profile.managed_default_content_settings.fonts": 2,
                "profile.managed_default_content_settings.media_stream": 2,
            },
        }),
    );
    caps.insert(
        "moz:firefoxOptions".to_string(),
        json!({
            "args": ["-headless"],
            "prefs": {
                "general.useragent.override": user_agent,
                "permissions.default.image": 2,
                "permissions.default.stylesheet": 2,
                "browser.display.use_document_fonts": 0,
                "media.autoplay.default": 5,
            },
        }),
    );
    caps
}

/// Turns a WebDriver command error into a render error
fn navigation_error(
    error: fantoccini::error::CmdError,
    context: &str,
    target: &FetchTarget,
) -> RelayError {
    if error.to_string().contains("Unable to find session") {
        ::log::warn!("Lost WebDriver session while {} {}", context, target.url());
    }
    RelayError::Render(format!("failed {} {}: {}", context, target.url(), error))
}
