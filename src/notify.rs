use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::filter::ItemRequest;
use crate::results::PageMetadata;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::time::Duration;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Webhook body in the Discord embed shape
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub url: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub image: EmbedImage,
    /// RFC 3339 UTC timestamp
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

impl WebhookPayload {
    pub fn new(meta: &PageMetadata, item: &ItemRequest, color: u32) -> Self {
        Self {
            embeds: vec![Embed {
                title: meta.title.clone(),
                description: meta.description.clone(),
                url: item.canonical_url.to_string(),
                color,
                fields: vec![EmbedField {
                    name: "Item ID".to_string(),
                    value: item.item_id.clone(),
                    inline: true,
                }],
                image: EmbedImage {
                    url: meta.image.clone(),
                },
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }],
        }
    }
}

/// Post-response notification target
#[derive(Debug, Clone)]
pub enum Notifier {
    /// No webhook configured
    Absent,
    /// POST a JSON payload to the webhook
    Webhook {
        client: reqwest::Client,
        url: String,
        color: u32,
    },
}

impl Notifier {
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        match &config.webhook_url {
            Some(url) => Ok(Notifier::Webhook {
                client: reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?,
                url: url.clone(),
                color: config.theme_color_value(),
            }),
            None => Ok(Notifier::Absent),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Notifier::Webhook { .. })
    }

    /// Send one notification
    pub async fn send(&self, meta: &PageMetadata, item: &ItemRequest) -> Result<()> {
        let (client, url, color) = match self {
            Notifier::Absent => return Ok(()),
            Notifier::Webhook { client, url, color } => (client, url, *color),
        };

        let payload = WebhookPayload::new(meta, item, color);
        let response = client.post(url).json(&payload).send().await?;

        if response.status().is_success() {
            ::log::info!("Webhook notified for item {}", item.item_id);
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(RelayError::Notification(format!("{}: {}", status, body)))
        }
    }

    /// Send from a detached task; failures are logged and dropped
    pub fn spawn(&self, meta: PageMetadata, item: ItemRequest) {
        if !self.is_enabled() {
            return;
        }

        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&meta, &item).await {
                ::log::warn!("Webhook for item {} failed: {}", item.item_id, e);
            }
        });
    }
}
