use crate::config::RelayConfig;
use serde::{Deserialize, Serialize};
use url::Url;

/// Metadata shown in a preview card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Title of the product
    pub title: String,

    /// Short description
    pub description: String,

    /// Locator of the preview image
    pub image: String,
}

impl PageMetadata {
    /// Create a new metadata instance
    pub fn new(title: String, description: String, image: String) -> Self {
        Self {
            title,
            description,
            image,
        }
    }

    /// Fallback metadata for an item, used whenever nothing better is known
    pub fn defaults_for(item_id: &str, config: &RelayConfig) -> Self {
        Self {
            title: config.default_title.clone(),
            description: format!("Item ID: {}", item_id),
            image: config.default_image.clone(),
        }
    }
}

/// What the fetcher should retrieve, and as whom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    url: Url,
    user_agent: String,
}

impl FetchTarget {
    pub fn new(url: Url, user_agent: impl Into<String>) -> Self {
        Self {
            url,
            user_agent: user_agent.into(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

/// Result of running every retrieval strategy against a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Raw markup from the first strategy that produced any
    Success(String),
    /// No strategy produced markup
    Exhausted,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}
