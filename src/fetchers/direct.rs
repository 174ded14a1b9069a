use crate::config::RelayConfig;
use crate::error::Result;
use crate::results::FetchTarget;
use reqwest::header::USER_AGENT;
use reqwest::redirect::Policy;

/// Plain HTTP retrieval with immediate retries.
///
/// Redirects are not followed, so a redirect status counts as a failed
/// attempt. Attempts follow each other without delay.
#[derive(Debug, Clone)]
pub struct DirectFetcher {
    client: reqwest::Client,
    max_attempts: u32,
}

impl DirectFetcher {
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(config.timings.fetch_timeout())
            .build()?;

        Ok(Self {
            client,
            max_attempts: config.max_attempts,
        })
    }

    /// GET the target until a success status or the attempts run out.
    ///
    /// A transport error ends retrieval immediately.
    pub async fn fetch(&self, target: &FetchTarget) -> Option<String> {
        for attempt in 1..=self.max_attempts {
            let response = match self
                .client
                .get(target.url().clone())
                .header(USER_AGENT, target.user_agent())
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    ::log::error!("Error fetching {}: {}", target.url(), e);
                    return None;
                }
            };

            let status = response.status();
            ::log::info!(
                "Direct fetch status (attempt {}/{}): {}",
                attempt,
                self.max_attempts,
                status
            );

            if status.is_success() {
                return match response.text().await {
                    Ok(html) => {
                        ::log::debug!("Fetched {} bytes from {}", html.len(), target.url());
                        Some(html)
                    }
                    Err(e) => {
                        ::log::error!("Failed to read body of {}: {}", target.url(), e);
                        None
                    }
                };
            }
        }

        ::log::warn!(
            "Direct fetch of {} gave up after {} attempts",
            target.url(),
            self.max_attempts
        );
        None
    }
}
