//! The fetch service: `requestPhoto` backed by an image source.

use super::protocol::{FetchRequest, FetchResponse};
use crate::image::{FetchError, ImageSource};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Single-shot reply for one `requestPhoto` call: exactly one response or one error.
pub type PhotoReply = oneshot::Receiver<Result<FetchResponse, FetchError>>;

#[derive(Clone)]
pub struct FetchService {
    source: Arc<dyn ImageSource>,
}

impl FetchService {
    pub fn new(source: Arc<dyn ImageSource>) -> Self {
        Self { source }
    }

    /// Start the fetch on its own task and return immediately. The outcome arrives on the returned receiver.
    pub fn request_photo(&self, _request: FetchRequest) -> PhotoReply {
        let (tx, rx) = oneshot::channel();
        let source = self.source.clone();
        tokio::spawn(async move {
            let outcome = source.fetch_image().await.map(FetchResponse::from);
            if let Err(ref e) = outcome {
                log::warn!("requestPhoto failed: {}", e);
            }
            if tx.send(outcome).is_err() {
                log::debug!("requestPhoto caller went away before the reply");
            }
        });
        rx
    }
}
