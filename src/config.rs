use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// How preview requests are answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Open the body at once and drip filler until metadata is ready
    #[default]
    Streaming,
    /// Wait for metadata and send the whole document in one body
    Buffered,
}

/// Timers used while acquiring metadata and streaming the response.
///
/// The render timeout, the drip deadline and the grace period are independent.
/// Exceeding the first only disables rendering for one request, exceeding the
/// second stops filler, exceeding the third forces the default metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timings {
    /// Navigation bound for the rendering session
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// Pause after DOM-ready so scripts can populate meta tags
    #[serde(default = "default_render_settle_ms")]
    pub render_settle_ms: u64,

    /// Gap between two filler tokens
    #[serde(default = "default_drip_interval_ms")]
    pub drip_interval_ms: u64,

    /// How long filler may be emitted, measured from stream open
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    /// Extra wait for the acquisition task once the deadline has passed
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,

    /// Per-request timeout of the direct HTTP client
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl Timings {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    pub fn render_settle(&self) -> Duration {
        Duration::from_millis(self.render_settle_ms)
    }

    pub fn drip_interval(&self) -> Duration {
        Duration::from_millis(self.drip_interval_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            render_timeout_ms: default_render_timeout_ms(),
            render_settle_ms: default_render_settle_ms(),
            drip_interval_ms: default_drip_interval_ms(),
            deadline_ms: default_deadline_ms(),
            grace_ms: default_grace_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

/// Configuration for the relay service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Scheme and host that canonical product URLs are built on
    #[serde(default = "default_canonical_base")]
    pub canonical_base: String,

    /// Identity header sent on every outbound fetch
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Substring of the inbound user agent that marks a preview client
    #[serde(default = "default_preview_marker")]
    pub preview_marker: String,

    /// WebDriver endpoint for the rendering strategy; rendering is off when unset
    #[serde(default)]
    pub webdriver_url: Option<String>,

    /// Webhook endpoint notified after each preview; notifications are off when unset
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Maximum direct retrieval attempts per request
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_title")]
    pub default_title: String,

    #[serde(default = "default_image")]
    pub default_image: String,

    #[serde(default = "default_theme_color")]
    pub theme_color: String,

    #[serde(default = "default_site_name")]
    pub site_name: String,

    #[serde(default)]
    pub response_mode: ResponseMode,

    #[serde(default)]
    pub timings: Timings,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            canonical_base: default_canonical_base(),
            user_agent: default_user_agent(),
            preview_marker: default_preview_marker(),
            webdriver_url: None,
            webhook_url: None,
            max_attempts: default_max_attempts(),
            default_title: default_title(),
            default_image: default_image(),
            theme_color: default_theme_color(),
            site_name: default_site_name(),
            response_mode: ResponseMode::default(),
            timings: Timings::default(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `WEBDRIVER_URL` and `WEBHOOK_URL` from the environment.
    ///
    /// An empty variable leaves the current value untouched.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = non_empty_env("WEBDRIVER_URL") {
            self.webdriver_url = Some(url);
        }
        if let Some(url) = non_empty_env("WEBHOOK_URL") {
            self.webhook_url = Some(url);
        }
        self
    }

    /// Reject values the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(RelayError::Config("max_attempts must be at least 1".into()));
        }
        if self.timings.drip_interval_ms == 0 {
            return Err(RelayError::Config(
                "timings.drip_interval_ms must be positive".into(),
            ));
        }
        if self.preview_marker.is_empty() {
            return Err(RelayError::Config("preview_marker must not be empty".into()));
        }
        url::Url::parse(&self.canonical_base)?;
        Ok(())
    }

    /// Webhook color as the integer Discord expects, red when unparsable
    pub fn theme_color_value(&self) -> u32 {
        u32::from_str_radix(self.theme_color.trim_start_matches('#'), 16).unwrap_or(0xFF0000)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn default_bind_addr() -> String {
    "0.0.0.0:8787".to_string()
}

fn default_canonical_base() -> String {
    "https://www.aliexpress.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; Discordbot/2.0; +https://discordapp.com)".to_string()
}

fn default_preview_marker() -> String {
    "Discord".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_title() -> String {
    "AliExpress Product".to_string()
}

fn default_image() -> String {
    "https://ae01.alicdn.com/kf/Sb900db0ad7604a83b297a51d9222905bm/624x160.png".to_string()
}

fn default_theme_color() -> String {
    "#FF0000".to_string()
}

fn default_site_name() -> String {
    "AliExpress".to_string()
}

fn default_render_timeout_ms() -> u64 {
    8_000
}

fn default_render_settle_ms() -> u64 {
    500
}

fn default_drip_interval_ms() -> u64 {
    500
}

fn default_deadline_ms() -> u64 {
    25_000
}

fn default_grace_ms() -> u64 {
    2_000
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}
