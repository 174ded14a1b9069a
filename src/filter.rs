use crate::error::{RelayError, Result};
use regex::Regex;
use url::Url;

/// Path shape carrying a product identifier, searched anywhere in the path
const ITEM_PATH_PATTERN: &str = r"/(item|i)/(\d+)\.html";

/// A validated product request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRequest {
    /// Numeric product identifier taken from the path
    pub item_id: String,

    /// Fully-qualified product page rebuilt from the identifier
    pub canonical_url: Url,
}

/// Matches inbound paths and rebuilds canonical product URLs
#[derive(Debug, Clone)]
pub struct ItemFilter {
    pattern: Regex,
    canonical_base: Url,
}

impl ItemFilter {
    /// Create a filter that builds canonical URLs on `canonical_base`
    pub fn new(canonical_base: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(ITEM_PATH_PATTERN)?,
            canonical_base: Url::parse(canonical_base)?,
        })
    }

    /// Extract the item from a request path.
    ///
    /// Fails with [`RelayError::MalformedRequest`] when the path has no
    /// `/item/<digits>.html` or `/i/<digits>.html` segment.
    pub fn parse(&self, path: &str) -> Result<ItemRequest> {
        let item_id = self
            .pattern
            .captures(path)
            .and_then(|caps| caps.get(2))
            .map(|m| m.as_str().to_string())
            .ok_or(RelayError::MalformedRequest)?;

        let canonical_url = self.canonical_url(&item_id)?;
        ::log::debug!("Matched item {} -> {}", item_id, canonical_url);

        Ok(ItemRequest {
            item_id,
            canonical_url,
        })
    }

    /// Canonical product page for an identifier
    pub fn canonical_url(&self, item_id: &str) -> Result<Url> {
        Ok(self.canonical_base.join(&format!("/item/{}.html", item_id))?)
    }
}

impl Default for ItemFilter {
    fn default() -> Self {
        Self::new("https://www.aliexpress.com").expect("Default item pattern should be valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_path() {
        let filter = ItemFilter::default();
        let item = filter.parse("/item/1005006234567890.html").unwrap();
        assert_eq!(item.item_id, "1005006234567890");
        assert_eq!(
            item.canonical_url.as_str(),
            "https://www.aliexpress.com/item/1005006234567890.html"
        );
    }

    #[test]
    fn test_short_path_maps_to_item_url() {
        let filter = ItemFilter::default();
        let item = filter.parse("/i/42.html").unwrap();
        assert_eq!(item.item_id, "42");
        assert_eq!(
            item.canonical_url.as_str(),
            "https://www.aliexpress.com/item/42.html"
        );
    }

    #[test]
    fn test_pattern_found_inside_longer_path() {
        let filter = ItemFilter::default();
        let item = filter.parse("/de/item/777.html").unwrap();
        assert_eq!(item.item_id, "777");
    }

    #[test]
    fn test_rejected_paths() {
        let filter = ItemFilter::default();
        for path in ["/badpath", "/", "/item/abc.html", "/item/123", "/x/123.html"] {
            assert!(
                matches!(filter.parse(path), Err(RelayError::MalformedRequest)),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_custom_canonical_base() {
        let filter = ItemFilter::new("http://127.0.0.1:9000").unwrap();
        let item = filter.parse("/i/5.html").unwrap();
        assert_eq!(item.canonical_url.as_str(), "http://127.0.0.1:9000/item/5.html");
    }

    #[test]
    fn test_malformed_message() {
        assert_eq!(RelayError::MalformedRequest.to_string(), "Invalid URL format");
    }
}
