//! Gateway: HTTP webhook intake and diagnostics.
//!
//! A Slack slash-command POST is validated and acknowledged at once; the image is
//! fetched over RPC and posted back to the command's `response_url` by a detached task.

mod diagnostic;
mod server;
mod webhook;

pub use server::{router, run_gateway, GatewayState};
pub use webhook::{
    parse_webhook, run_pipeline, spawn_dispatch, DispatchError, ValidationError, WebhookCommand,
    WebhookForm,
};
