//! Outbound notifications: deliver a fetched image to the chat platform's callback URL.
//!
//! `Notifier` is the seam the gateway dispatches through; `SlackNotifier` posts
//! a Slack slash-command response message.

mod payload;
mod slack;

pub use payload::{Attachment, NotificationPayload};
pub use slack::{resolve_callback_url, NotifyError, SlackNotifier, DEFAULT_NOTIFICATION_BASE_URL};

use crate::image::ImageReference;
use async_trait::async_trait;

/// Delivers one image to a caller-supplied callback URL.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, image: &ImageReference, callback_url: &str) -> Result<(), NotifyError>;
}
