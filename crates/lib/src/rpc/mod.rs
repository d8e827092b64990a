//! Fetch RPC: the gateway asks the fetcher for one image per call.
//!
//! Frames are JSON over a WebSocket (`GET /rpc`): `req` frames carry a method and
//! params, `res` frames carry either a payload or an error for the same id. The only
//! method is `requestPhoto`.

mod client;
mod protocol;
mod server;
mod service;

pub use client::{FetchClient, RpcError};
pub use protocol::{FetchRequest, FetchResponse, RpcRequest, RpcResponse, METHOD_REQUEST_PHOTO};
pub use server::{router, run_fetcher};
pub use service::{FetchService, PhotoReply};
