use crate::error::Result;
use crate::parsers::MetaField;
use crate::results::PageMetadata;
use regex::Regex;

/// Quoted attribute value, double or single quotes
const QUOTED_CONTENT: &str = r#"(?:"([^"]*)"|'([^']*)')"#;

/// Compiled patterns for one field, covering both attribute orders
#[derive(Debug, Clone)]
struct FieldPattern {
    field: MetaField,
    property_first: Regex,
    content_first: Regex,
}

impl FieldPattern {
    fn new(field: MetaField) -> Result<Self> {
        let property = regex::escape(field.property());
        let property_attr = format!(r#"\bproperty\s*=\s*["']{}["']"#, property);
        let content_attr = format!(r#"\bcontent\s*=\s*{}"#, QUOTED_CONTENT);

        Ok(Self {
            field,
            property_first: Regex::new(&format!(
                r"(?i)<meta\s[^>]*?{}[^>]*?{}",
                property_attr, content_attr
            ))?,
            content_first: Regex::new(&format!(
                r"(?i)<meta\s[^>]*?{}[^>]*?{}",
                content_attr, property_attr
            ))?,
        })
    }

    /// Value of the earliest matching tag in the markup
    fn find<'a>(&self, markup: &'a str) -> Option<&'a str> {
        let first = [&self.property_first, &self.content_first]
            .into_iter()
            .filter_map(|regex| regex.captures(markup))
            .min_by_key(|caps| caps.get(0).map(|m| m.start()).unwrap_or(usize::MAX))?;

        first.get(1).or_else(|| first.get(2)).map(|m| m.as_str())
    }
}

/// Pulls preview metadata out of raw markup.
///
/// Each field is searched independently; a missing or empty tag leaves the
/// caller's default for that field alone. Extraction does no I/O and returns
/// the same result for the same input.
#[derive(Debug, Clone)]
pub struct MetaExtractor {
    patterns: Vec<FieldPattern>,
}

impl MetaExtractor {
    pub fn new() -> Result<Self> {
        let patterns = MetaField::ALL
            .into_iter()
            .map(FieldPattern::new)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Look up a single field
    pub fn find(&self, markup: &str, field: MetaField) -> Option<String> {
        self.patterns
            .iter()
            .find(|pattern| pattern.field == field)
            .and_then(|pattern| pattern.find(markup))
            .filter(|value| !value.trim().is_empty())
            .map(|value| value.to_string())
    }

    /// Overlay every field found in `markup` onto `defaults`
    pub fn extract(&self, markup: &str, defaults: &PageMetadata) -> PageMetadata {
        let mut meta = defaults.clone();

        for field in MetaField::ALL {
            let value = self.find(markup, field);
            ::log::debug!(
                "Extracting {}: {}",
                field.property(),
                value.as_deref().unwrap_or("Not found")
            );

            if let Some(value) = value {
                match field {
                    MetaField::Title => meta.title = value,
                    MetaField::Description => meta.description = value,
                    MetaField::Image => meta.image = value,
                }
            }
        }

        meta
    }
}

impl Default for MetaExtractor {
    fn default() -> Self {
        Self::new().expect("Meta tag patterns should be valid")
    }
}
