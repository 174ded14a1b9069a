// Re-export modules
pub mod config;
pub mod document;
pub mod error;
pub mod fetchers;
pub mod filter;
pub mod notify;
pub mod parsers;
pub mod responder;
pub mod results;
pub mod server;

// Re-export commonly used types for convenience
pub use config::{RelayConfig, ResponseMode};
pub use error::{RelayError, Result};
pub use results::{FetchOutcome, FetchTarget, PageMetadata};

use std::path::Path;

/// Main builder for the relay service
pub struct Relay {
    config: RelayConfig,
}

impl Relay {
    /// Create a new Relay builder with default configuration
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
        }
    }

    /// Set the configuration
    pub fn with_config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a file
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let config = RelayConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a string
    pub fn with_config_str(self, config_str: &str) -> Result<Self> {
        let config = RelayConfig::from_json(config_str)?;
        Ok(self.with_config(config))
    }

    /// Apply `WEBDRIVER_URL` and `WEBHOOK_URL` from the environment
    pub fn with_env(mut self) -> Self {
        self.config = self.config.with_env_overrides();
        self
    }

    /// Set the address to listen on
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    /// Enable the rendering strategy through a WebDriver endpoint
    pub fn with_webdriver(mut self, url: impl Into<String>) -> Self {
        self.config.webdriver_url = Some(url.into());
        self
    }

    /// Notify a webhook after every preview
    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.config.webhook_url = Some(url.into());
        self
    }

    /// Choose between streamed and buffered previews
    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.config.response_mode = mode;
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Build the HTTP router without binding a socket
    pub fn router(self) -> Result<axum::Router> {
        let state = server::AppState::new(self.config)?;
        Ok(server::router(std::sync::Arc::new(state)))
    }

    /// Start serving requests
    pub async fn serve(self) -> Result<()> {
        let state = server::AppState::new(self.config)?;
        server::serve(state).await
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}
