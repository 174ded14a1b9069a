use crate::parsers::{MetaExtractor, MetaField};

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_property_names() {
        assert_eq!(MetaField::Title.property(), "og:title");
        assert_eq!(MetaField::Description.property(), "og:description");
        assert_eq!(MetaField::Image.property(), "og:image");
    }

    #[test]
    fn test_find_double_quoted() {
        let extractor = MetaExtractor::default();
        let html = r#"<meta property="og:title" content="Hello">"#;
        assert_eq!(
            extractor.find(html, MetaField::Title),
            Some("Hello".to_string())
        );
    }

    #[test]
    fn test_find_single_quoted() {
        let extractor = MetaExtractor::default();
        let html = "<meta property='og:title' content='Single'>";
        assert_eq!(
            extractor.find(html, MetaField::Title),
            Some("Single".to_string())
        );
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let extractor = MetaExtractor::default();
        let html = r#"<META PROPERTY="OG:TITLE" CONTENT="Shouting">"#;
        assert_eq!(
            extractor.find(html, MetaField::Title),
            Some("Shouting".to_string())
        );
    }

    #[test]
    fn test_find_content_before_property() {
        let extractor = MetaExtractor::default();
        let html = r#"<meta content="Reversed" property="og:description" />"#;
        assert_eq!(
            extractor.find(html, MetaField::Description),
            Some("Reversed".to_string())
        );
    }

    #[test]
    fn test_find_with_extra_attributes() {
        let extractor = MetaExtractor::default();
        let html = r#"<meta data-rh="true" property="og:image" itemprop="image" content="https://img.example/a.jpg">"#;
        assert_eq!(
            extractor.find(html, MetaField::Image),
            Some("https://img.example/a.jpg".to_string())
        );
    }

    #[test]
    fn test_image_does_not_match_image_width() {
        let extractor = MetaExtractor::default();
        let html = r#"<meta property="og:image:width" content="800">"#;
        assert_eq!(extractor.find(html, MetaField::Image), None);
    }

    #[test]
    fn test_empty_value_is_not_found() {
        let extractor = MetaExtractor::default();
        let html = r#"<meta property="og:title" content="   ">"#;
        assert_eq!(extractor.find(html, MetaField::Title), None);
    }
}
