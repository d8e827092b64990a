//! Fetcher HTTP + WebSocket server: `GET /rpc` carries fetch RPC frames, `GET /` is a health probe.

use super::protocol::{FetchRequest, RpcRequest, RpcResponse, METHOD_REQUEST_PHOTO};
use super::service::FetchService;
use crate::config::{build_http_client, Config};
use crate::provider::DogApiClient;
use crate::shutdown::shutdown_signal;
use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

const REPLY_QUEUE: usize = 64;

#[derive(Clone)]
struct FetcherState {
    service: FetchService,
    port: u16,
}

/// Routes for the fetch service. `port` is only reported by the health probe.
pub fn router(service: FetchService, port: u16) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/rpc", get(rpc_handler))
        .with_state(FetcherState { service, port })
}

/// Run the fetch service; binds to config.fetcher.bind:config.fetcher.port.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_fetcher(config: Config) -> Result<()> {
    let client = build_http_client(&config.http)?;
    let provider = DogApiClient::new(client, &config.provider.base_url)
        .context("configuring image provider")?;
    log::info!("image provider endpoint {}", provider.endpoint());
    let service = FetchService::new(Arc::new(provider));

    let bind_addr = format!("{}:{}", config.fetcher.bind.trim(), config.fetcher.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("fetcher listening on {}", bind_addr);

    axum::serve(listener, router(service, config.fetcher.port))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("fetcher server exited")?;
    log::info!("fetcher stopped");
    Ok(())
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<FetcherState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "service": "fetcher",
        "port": state.port,
    }))
}

async fn rpc_handler(State(state): State<FetcherState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.service))
}

/// Reads request frames and writes replies as they complete, possibly out of order.
async fn handle_socket(mut socket: WebSocket, service: FetchService) {
    let (reply_tx, mut reply_rx) = mpsc::channel::<RpcResponse>(REPLY_QUEUE);

    loop {
        tokio::select! {
            reply = reply_rx.recv() => {
                let Some(reply) = reply else { break };
                let text = match serde_json::to_string(&reply) {
                    Ok(t) => t,
                    Err(e) => {
                        log::warn!("rpc: failed to encode reply {}: {}", reply.id, e);
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let Message::Text(text) = msg else { continue };
                let Ok(req): Result<RpcRequest, _> = serde_json::from_str(&text) else {
                    log::debug!("rpc: skipping undecodable frame");
                    continue;
                };
                if !req.is_request() {
                    continue;
                }
                dispatch(&service, req, reply_tx.clone());
            }
        }
    }
    log::debug!("rpc socket closed");
}

/// Route one request. Replies go through `replies`; nothing here waits on the fetch.
fn dispatch(service: &FetchService, req: RpcRequest, replies: mpsc::Sender<RpcResponse>) {
    let RpcRequest { id, method, params, .. } = req;
    match method.as_str() {
        METHOD_REQUEST_PHOTO => {
            let request = match FetchRequest::from_params(params) {
                Ok(r) => r,
                Err(e) => {
                    queue_reply(&replies, RpcResponse::err(id, format!("invalid requestPhoto params: {}", e)));
                    return;
                }
            };
            let pending = service.request_photo(request);
            tokio::spawn(async move {
                let reply = match pending.await {
                    Ok(Ok(photo)) => match serde_json::to_value(&photo) {
                        Ok(payload) => RpcResponse::ok(id, payload),
                        Err(e) => RpcResponse::err(id, e.to_string()),
                    },
                    Ok(Err(e)) => RpcResponse::err(id, e.to_string()),
                    Err(_) => RpcResponse::err(id, "requestPhoto ended without a reply"),
                };
                if replies.send(reply).await.is_err() {
                    log::debug!("rpc: socket closed before reply was written");
                }
            });
        }
        other => queue_reply(&replies, RpcResponse::err(id, format!("unknown method: {}", other))),
    }
}

/// Queue a reply that is already known. Waits for room in the queue on its own task.
fn queue_reply(replies: &mpsc::Sender<RpcResponse>, reply: RpcResponse) {
    let replies = replies.clone();
    tokio::spawn(async move {
        if replies.send(reply).await.is_err() {
            log::debug!("rpc: socket closed before reply was written");
        }
    });
}
