//! Slack response_url notifier: POST the payload as JSON to the callback URL.

use super::payload::NotificationPayload;
use super::Notifier;
use crate::image::ImageReference;
use async_trait::async_trait;
use reqwest::Url;

pub const DEFAULT_NOTIFICATION_BASE_URL: &str = "https://hooks.slack.com/commands/";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid callback url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("notification request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Resolve a callback URL against the notification base.
/// Absolute URLs are used as-is, scheme-relative ones (`//host/path`) take the base's scheme,
/// and bare paths (`1234/5678`) are joined onto the base. Only http and https are accepted.
pub fn resolve_callback_url(base: &Url, callback_url: &str) -> Result<Url, NotifyError> {
    let invalid = |reason: String| NotifyError::InvalidUrl {
        url: callback_url.to_string(),
        reason,
    };
    let trimmed = callback_url.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty".to_string()));
    }
    let url = base.join(trimmed).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {}", other))),
    }
}

/// Posts Slack messages through the shared HTTP client.
#[derive(Clone)]
pub struct SlackNotifier {
    base_url: Url,
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self, NotifyError> {
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&base).map_err(|e| NotifyError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// POST one message to the resolved callback URL.
    pub async fn post(&self, payload: &NotificationPayload, callback_url: &str) -> Result<(), NotifyError> {
        let url = resolve_callback_url(&self.base_url, callback_url)?;
        let res = self.client.post(url).json(payload).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!("{} {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, image: &ImageReference, callback_url: &str) -> Result<(), NotifyError> {
        self.post(&NotificationPayload::from(image), callback_url).await
    }
}
