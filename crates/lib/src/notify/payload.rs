//! Slack response message built from an image reference.

use crate::image::ImageReference;
use serde::{Deserialize, Serialize};

const RESPONSE_TYPE_IN_CHANNEL: &str = "in_channel";
const MESSAGE_TEXT: &str = "Here's your dog!";
const ATTACHMENT_TEXT: &str = "Dog!";

/// Wire body: `{ "response_type", "text", "attachments": [{ "text", "image_url" }] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub response_type: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub text: String,
    pub image_url: String,
}

impl From<&ImageReference> for NotificationPayload {
    fn from(image: &ImageReference) -> Self {
        Self {
            response_type: RESPONSE_TYPE_IN_CHANNEL.to_string(),
            text: MESSAGE_TEXT.to_string(),
            attachments: vec![Attachment {
                text: ATTACHMENT_TEXT.to_string(),
                image_url: image.url.clone(),
            }],
        }
    }
}
