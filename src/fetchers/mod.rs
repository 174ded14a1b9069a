pub mod direct;
pub mod render;

use crate::config::RelayConfig;
use crate::error::Result;
use crate::results::{FetchOutcome, FetchTarget};
use std::future::Future;

pub use direct::DirectFetcher;
pub use render::{RenderBackend, WebDriverRenderer};

/// Anything that can turn a target into raw markup.
///
/// Implementations must never fail loudly: every problem collapses into
/// [`FetchOutcome::Exhausted`].
pub trait MarkupSource: Send + Sync + 'static {
    fn fetch(&self, target: &FetchTarget) -> impl Future<Output = FetchOutcome> + Send;
}

/// Tries the rendering backend first, then direct retrieval
#[derive(Debug, Clone)]
pub struct PageFetcher {
    renderer: RenderBackend,
    direct: DirectFetcher,
}

impl PageFetcher {
    /// Build both strategies from configuration
    pub fn new(config: &RelayConfig) -> Result<Self> {
        Ok(Self::with_strategies(
            RenderBackend::from_config(config),
            DirectFetcher::new(config)?,
        ))
    }

    pub fn with_strategies(renderer: RenderBackend, direct: DirectFetcher) -> Self {
        Self { renderer, direct }
    }
}

impl MarkupSource for PageFetcher {
    async fn fetch(&self, target: &FetchTarget) -> FetchOutcome {
        if self.renderer.is_available() {
            ::log::debug!("Rendering {}", target.url());
            if let Some(markup) = self.renderer.render(target).await {
                ::log::info!("Rendered markup length: {}", markup.len());
                return FetchOutcome::Success(markup);
            }
            ::log::info!("Rendering gave no result, falling back to direct fetch");
        }

        match self.direct.fetch(target).await {
            Some(markup) => FetchOutcome::Success(markup),
            None => FetchOutcome::Exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(renderer: RenderBackend) -> PageFetcher {
        let config = RelayConfig::default();
        PageFetcher::with_strategies(renderer, DirectFetcher::new(&config).unwrap())
    }

    fn target(server: &MockServer) -> FetchTarget {
        let url = Url::parse(&format!("{}/item/9.html", server.uri())).unwrap();
        FetchTarget::new(url, "TestAgent/1.0")
    }

    /// Responds with 503 for the first `failures` requests, 200 afterwards
    async fn mount_flaky(server: &MockServer, failures: u64) {
        if failures > 0 {
            Mock::given(method("GET"))
                .and(path("/item/9.html"))
                .respond_with(ResponseTemplate::new(503))
                .up_to_n_times(failures)
                .with_priority(1)
                .mount(server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/item/9.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .with_priority(2)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_direct_success_on_first_attempt() {
        let server = MockServer::start().await;
        mount_flaky(&server, 0).await;

        let outcome = fetcher(RenderBackend::Absent).fetch(&target(&server)).await;

        assert_eq!(outcome, FetchOutcome::Success("<html>ok</html>".to_string()));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_direct_stops_at_first_success() {
        for k in 2..=5u64 {
            let server = MockServer::start().await;
            mount_flaky(&server, k - 1).await;

            let outcome = fetcher(RenderBackend::Absent).fetch(&target(&server)).await;

            assert!(outcome.is_success(), "success expected on attempt {}", k);
            assert_eq!(
                server.received_requests().await.unwrap().len() as u64,
                k,
                "expected exactly {} attempts",
                k
            );
        }
    }

    #[tokio::test]
    async fn test_direct_exhausted_after_five_failures() {
        let server = MockServer::start().await;
        mount_flaky(&server, 5).await;

        let outcome = fetcher(RenderBackend::Absent).fetch(&target(&server)).await;

        assert_eq!(outcome, FetchOutcome::Exhausted);
        assert_eq!(server.received_requests().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_redirect_is_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/item/9.html"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", "/elsewhere"),
            )
            .expect(5)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/elsewhere"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = fetcher(RenderBackend::Absent).fetch(&target(&server)).await;

        assert_eq!(outcome, FetchOutcome::Exhausted);
    }

    #[tokio::test]
    async fn test_identity_header_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", "TestAgent/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ua ok"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher(RenderBackend::Absent).fetch(&target(&server)).await;

        assert_eq!(outcome, FetchOutcome::Success("ua ok".to_string()));
    }

    #[tokio::test]
    async fn test_failed_render_falls_back_to_direct() {
        let server = MockServer::start().await;
        mount_flaky(&server, 0).await;
        let renderer = RenderBackend::WebDriver(WebDriverRenderer::new(
            "http://127.0.0.1:1",
            Duration::from_secs(2),
            Duration::from_millis(10),
        ));

        let outcome = fetcher(renderer).fetch(&target(&server)).await;

        assert_eq!(outcome, FetchOutcome::Success("<html>ok</html>".to_string()));
    }

    #[tokio::test]
    async fn test_transport_error_is_exhausted() {
        let config = RelayConfig::default();
        let fetcher = PageFetcher::new(&config).unwrap();
        let target = FetchTarget::new(
            Url::parse("http://127.0.0.1:1/item/9.html").unwrap(),
            "TestAgent/1.0",
        );

        assert_eq!(fetcher.fetch(&target).await, FetchOutcome::Exhausted);
    }
}
