use crate::config::{RelayConfig, ResponseMode};
use crate::error::{RelayError, Result};
use crate::fetchers::{MarkupSource, PageFetcher};
use crate::filter::{ItemFilter, ItemRequest};
use crate::notify::Notifier;
use crate::responder::StreamingResponder;
use crate::results::PageMetadata;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// How an inbound request is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// A chat client unfurling the link
    Preview,
    /// Anyone else, redirected to the product page
    Standard,
}

/// Classify a request by its user agent.
///
/// Preview iff the user agent contains `marker`.
pub fn classify(headers: &HeaderMap, marker: &str) -> RequestKind {
    let is_preview = headers
        .get(header::USER_AGENT)
        .map(|value| String::from_utf8_lossy(value.as_bytes()))
        .is_some_and(|agent| agent.contains(marker));

    if is_preview {
        RequestKind::Preview
    } else {
        RequestKind::Standard
    }
}

/// Everything a request handler needs
pub struct AppState<S = PageFetcher> {
    pub config: Arc<RelayConfig>,
    pub items: ItemFilter,
    pub responder: StreamingResponder<S>,
}

impl AppState<PageFetcher> {
    /// Build the production state from configuration
    pub fn new(config: RelayConfig) -> Result<Self> {
        let fetcher = PageFetcher::new(&config)?;
        Self::with_source(config, fetcher)
    }
}

impl<S: MarkupSource> AppState<S> {
    pub fn with_source(config: RelayConfig, source: S) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let notifier = Notifier::from_config(&config)?;

        Ok(Self {
            items: ItemFilter::new(&config.canonical_base)?,
            responder: StreamingResponder::new(source, notifier, Arc::clone(&config))?,
            config,
        })
    }
}

/// Build the router; every method and path goes to one handler
pub fn router<S: MarkupSource>(state: Arc<AppState<S>>) -> Router {
    Router::new().fallback(handle::<S>).with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config.bind_addr.clone();
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    ::log::info!("Relay listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn handle<S: MarkupSource>(
    State(state): State<Arc<AppState<S>>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    ::log::info!("Request {} from user agent: {}", uri.path(), user_agent);

    let item = match state.items.parse(uri.path()) {
        Ok(item) => item,
        Err(e) => {
            ::log::info!("Invalid URL format: {}", uri.path());
            return malformed(e);
        }
    };

    match classify(&headers, &state.config.preview_marker) {
        RequestKind::Preview => preview(&state, item).await,
        RequestKind::Standard => {
            ::log::info!("Redirecting to {}", item.canonical_url);
            redirect(&item)
        }
    }
}

async fn preview<S: MarkupSource>(state: &AppState<S>, item: ItemRequest) -> Response {
    let defaults = PageMetadata::defaults_for(&item.item_id, &state.config);
    ::log::info!("Preparing preview for item {}", item.item_id);

    let body = match state.config.response_mode {
        ResponseMode::Streaming => state.responder.respond(item, defaults),
        ResponseMode::Buffered => state.responder.respond_buffered(item, defaults).await.into(),
    };

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=UTF-8")],
        body,
    )
        .into_response()
}

fn redirect(item: &ItemRequest) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, item.canonical_url.to_string())],
    )
        .into_response()
}

fn malformed(error: RelayError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        [(header::CONTENT_TYPE, "text/plain; charset=UTF-8")],
        error.to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(agent: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_str(agent).unwrap());
        headers
    }

    #[test]
    fn test_classify_preview_agent() {
        let agent = "Mozilla/5.0 (compatible; Discordbot/2.0; +https://discordapp.com)";
        assert_eq!(classify(&headers(agent), "Discord"), RequestKind::Preview);
    }

    #[test]
    fn test_classify_browser_agent() {
        let agent = "Mozilla/5.0 (X11; Linux x86_64) Firefox/130.0";
        assert_eq!(classify(&headers(agent), "Discord"), RequestKind::Standard);
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        assert_eq!(classify(&headers("discordbot"), "Discord"), RequestKind::Standard);
    }

    #[test]
    fn test_classify_agent_with_non_ascii_bytes() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_bytes(b"Discordbot/2.0 (caf\xe9)").unwrap(),
        );
        assert!(headers[header::USER_AGENT].to_str().is_err());
        assert_eq!(classify(&headers, "Discord"), RequestKind::Preview);
    }

    #[test]
    fn test_classify_without_agent() {
        assert_eq!(classify(&HeaderMap::new(), "Discord"), RequestKind::Standard);
    }

    #[test]
    fn test_redirect_response() {
        let item = ItemFilter::default().parse("/i/8.html").unwrap();
        let response = redirect(&item);
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://www.aliexpress.com/item/8.html"
        );
    }
}
