//! HTML pieces that make up a preview document.
//!
//! A streamed response is `PREAMBLE`, any number of `FILLER` tokens, then
//! [`head_tail`]. A buffered response is [`full_document`] in one piece.

use crate::config::RelayConfig;
use crate::filter::ItemRequest;
use crate::results::PageMetadata;

/// Opens the document and declares the charset, sent before anything is known
pub const PREAMBLE: &str = "<html>\n<head>\n  <meta content=\"text/html; charset=UTF-8\" http-equiv=\"Content-Type\" />\n";

/// Inert token that keeps the connection busy while metadata is pending
pub const FILLER: &str = "<!-- -->\n";

/// Everything after the preamble: the card tags, `</head>` and a visible body.
///
/// Metadata comes from an untrusted page and is escaped before it is placed
/// in attributes or elements.
pub fn head_tail(meta: &PageMetadata, item: &ItemRequest, config: &RelayConfig) -> String {
    let title = escape_html(&meta.title);
    let description = escape_html(&meta.description);
    let image = escape_html(&meta.image);

    format!(
        r#"  <title>{title}</title>
  <meta name="twitter:card" content="summary_large_image" />
  <meta name="theme-color" content="{color}">
  <meta property="og:site_name" content="{site}">
  <meta name="twitter:title" content="{site} - {item_id}" />
  <meta name="twitter:image" content="{image}" />
  <meta name="twitter:creator" content="@aliexpress" />
  <meta property="og:description" content="{title}" />
</head>
<body>
  <h1>{title}</h1>
  <p>{description}</p>
  <p><a href="{url}">Click to view on {site}</a></p>
  <img src="{image}" alt="{title}">
</body>
</html>"#,
        color = config.theme_color,
        site = config.site_name,
        item_id = item.item_id,
        url = item.canonical_url,
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// The complete document in one string
pub fn full_document(meta: &PageMetadata, item: &ItemRequest, config: &RelayConfig) -> String {
    format!("{}{}", PREAMBLE, head_tail(meta, item, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ItemFilter;

    #[test]
    fn test_full_document_carries_metadata() {
        let config = RelayConfig::default();
        let item = ItemFilter::default().parse("/item/77.html").unwrap();
        let meta = PageMetadata::new(
            "Lamp".to_string(),
            "Warm light".to_string(),
            "https://img.example/lamp.jpg".to_string(),
        );

        let html = full_document(&meta, &item, &config);

        assert!(html.starts_with(PREAMBLE));
        assert!(html.contains("<title>Lamp</title>"));
        assert!(html.contains(r#"<meta name="twitter:title" content="AliExpress - 77" />"#));
        assert!(html.contains(r#"<meta name="twitter:image" content="https://img.example/lamp.jpg" />"#));
        assert!(html.contains(r##"<meta name="theme-color" content="#FF0000">"##));
        assert!(html.contains("<p>Warm light</p>"));
        assert!(html.contains("https://www.aliexpress.com/item/77.html"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_quoted_values_stay_inside_their_attributes() {
        let config = RelayConfig::default();
        let item = ItemFilter::default().parse("/item/5.html").unwrap();
        let meta = crate::parsers::MetaExtractor::default().extract(
            r#"<meta property='og:title' content='24" Monitor" onmouseover="alert(1)'>"#,
            &PageMetadata::defaults_for("5", &config),
        );
        assert_eq!(meta.title, r#"24" Monitor" onmouseover="alert(1)"#);

        let html = head_tail(&meta, &item, &config);

        assert!(html.contains(
            r#"<meta property="og:description" content="24&quot; Monitor&quot; onmouseover=&quot;alert(1)" />"#
        ));
        assert!(html.contains(
            r#"<title>24&quot; Monitor&quot; onmouseover=&quot;alert(1)</title>"#
        ));
        assert!(!html.contains("onmouseover=\""));
    }

    #[test]
    fn test_markup_in_values_is_escaped() {
        let config = RelayConfig::default();
        let item = ItemFilter::default().parse("/item/6.html").unwrap();
        let meta = PageMetadata::new(
            "<script>x</script>".to_string(),
            "Tom & Jerry's".to_string(),
            "https://img.example/a.jpg?w=1&h=2".to_string(),
        );

        let html = head_tail(&meta, &item, &config);

        assert!(!html.contains("<script>"));
        assert!(html.contains("<h1>&lt;script&gt;x&lt;/script&gt;</h1>"));
        assert!(html.contains("<p>Tom &amp; Jerry&#39;s</p>"));
        assert!(html.contains(r#"<img src="https://img.example/a.jpg?w=1&amp;h=2""#));
    }

    #[test]
    fn test_filler_is_a_comment() {
        assert!(FILLER.starts_with("<!--"));
        assert!(FILLER.trim_end().ends_with("-->"));
    }
}
