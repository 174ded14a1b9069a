pub mod meta;

#[cfg(test)]
mod tests;

pub use meta::MetaExtractor;

/// The embedded metadata fields a preview needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaField {
    /// `og:title`
    Title,
    /// `og:description`
    Description,
    /// `og:image`
    Image,
}

impl MetaField {
    pub const ALL: [MetaField; 3] = [MetaField::Title, MetaField::Description, MetaField::Image];

    /// Open Graph property carrying this field
    pub fn property(&self) -> &'static str {
        match self {
            MetaField::Title => "og:title",
            MetaField::Description => "og:description",
            MetaField::Image => "og:image",
        }
    }
}
