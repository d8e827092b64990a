//! Slack slash-command webhook: validate, acknowledge, and dispatch the image pipeline in the background.

use super::server::GatewayState;
use crate::image::{FetchError, ImageSource};
use crate::notify::{Notifier, NotifyError};
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Form fields we read from the webhook; anything else Slack sends is ignored.
#[derive(Debug, Deserialize)]
pub struct WebhookForm {
    pub response_url: String,
}

/// A validated webhook: where to deliver the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookCommand {
    pub callback_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("malformed webhook form: {0}")]
    Form(String),
    #[error("response_url is empty")]
    EmptyCallbackUrl,
}

/// Failure of one background pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("fetching image failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("delivering notification failed: {0}")]
    Notify(#[from] NotifyError),
}

impl TryFrom<WebhookForm> for WebhookCommand {
    type Error = ValidationError;

    fn try_from(form: WebhookForm) -> Result<Self, Self::Error> {
        let url = form.response_url.trim();
        if url.is_empty() {
            return Err(ValidationError::EmptyCallbackUrl);
        }
        Ok(Self {
            callback_url: url.to_string(),
        })
    }
}

/// Decode the extractor result strictly: a rejected form or blank URL fails the whole parse.
pub fn parse_webhook(
    form: Result<Form<WebhookForm>, FormRejection>,
) -> Result<WebhookCommand, ValidationError> {
    let Form(form) = form.map_err(|e| ValidationError::Form(e.body_text()))?;
    WebhookCommand::try_from(form)
}

/// POST /hook/slack/dog — 400 on a bad form, otherwise 200 right away with the pipeline running detached.
pub(crate) async fn slack_dog_hook(
    State(state): State<GatewayState>,
    form: Result<Form<WebhookForm>, FormRejection>,
) -> StatusCode {
    let cmd = match parse_webhook(form) {
        Ok(cmd) => cmd,
        Err(e) => {
            log::debug!("rejecting webhook: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    spawn_dispatch(state.images.clone(), state.notifier.clone(), cmd);
    StatusCode::OK
}

/// Start the fetch → notify pipeline for one webhook without waiting on it.
/// Failures are logged inside the task and go no further.
pub fn spawn_dispatch(
    images: Arc<dyn ImageSource>,
    notifier: Arc<dyn Notifier>,
    cmd: WebhookCommand,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match run_pipeline(images.as_ref(), notifier.as_ref(), &cmd).await {
            Ok(()) => log::info!("delivered image to {}", cmd.callback_url),
            Err(e) => log::error!("webhook execution failed: {}", e),
        }
    })
}

/// Fetch strictly before notify; the notification carries exactly the fetched image.
pub async fn run_pipeline(
    images: &dyn ImageSource,
    notifier: &dyn Notifier,
    cmd: &WebhookCommand,
) -> Result<(), DispatchError> {
    let image = images.fetch_image().await?;
    notifier.notify(&image, &cmd.callback_url).await?;
    Ok(())
}
