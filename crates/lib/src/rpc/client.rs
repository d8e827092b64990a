//! Gateway-side fetch RPC client.
//!
//! One connection task owns the WebSocket. Callers hand it a request plus a oneshot
//! sender; replies are matched back by frame id, so many calls share one socket and
//! may complete out of order. The socket is opened on the first call and reopened on
//! the next call after it drops. Calls in flight on a dropped socket fail.

use super::protocol::{FetchRequest, FetchResponse, RpcRequest, RpcResponse, METHOD_REQUEST_PHOTO};
use crate::image::{FetchError, ImageReference, ImageSource};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

const CALL_QUEUE: usize = 64;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Reply = oneshot::Sender<Result<RpcResponse, RpcError>>;
type Pending = HashMap<String, Reply>;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("connect to {url} failed: {reason}")]
    Connect { url: String, reason: String },
    #[error("rpc connection lost: {0}")]
    ConnectionLost(String),
    #[error("rpc channel closed")]
    Closed,
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("remote error: {0}")]
    Remote(String),
    #[error("invalid rpc message: {0}")]
    Protocol(String),
}

struct Call {
    request: RpcRequest,
    reply: Reply,
}

/// Handle to the fetch service. Clones share one connection; the connection task
/// exits when the last handle is dropped.
#[derive(Clone)]
pub struct FetchClient {
    calls: mpsc::Sender<Call>,
    call_timeout: Duration,
}

impl FetchClient {
    /// Spawns the connection task; must be called inside a tokio runtime. Does not connect yet.
    pub fn new(url: impl Into<String>, connect_timeout: Duration, call_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(CALL_QUEUE);
        tokio::spawn(run_connection(url.into(), connect_timeout, rx));
        Self {
            calls: tx,
            call_timeout,
        }
    }

    /// `requestPhoto`: one image URL from the fetch service.
    pub async fn request_photo(&self, request: FetchRequest) -> Result<FetchResponse, RpcError> {
        let params = serde_json::to_value(&request).map_err(|e| RpcError::Protocol(e.to_string()))?;
        let payload = self.call(METHOD_REQUEST_PHOTO, params).await?;
        serde_json::from_value(payload).map_err(|e| RpcError::Protocol(e.to_string()))
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, RpcError> {
        let request = RpcRequest::new(uuid::Uuid::new_v4().to_string(), method, params);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.calls
            .send(Call {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RpcError::Closed)?;
        let response = tokio::time::timeout(self.call_timeout, reply_rx)
            .await
            .map_err(|_| RpcError::Timeout(self.call_timeout))?
            .map_err(|_| RpcError::Closed)??;
        response.into_result().map_err(RpcError::Remote)
    }
}

#[async_trait]
impl ImageSource for FetchClient {
    async fn fetch_image(&self) -> Result<ImageReference, FetchError> {
        let res = self.request_photo(FetchRequest::default()).await?;
        Ok(ImageReference::from(res))
    }
}

async fn connect(url: &str, timeout: Duration) -> Result<Socket, RpcError> {
    let failed = |reason: String| RpcError::Connect {
        url: url.to_string(),
        reason,
    };
    match tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url)).await {
        Ok(Ok((ws, _))) => Ok(ws),
        Ok(Err(e)) => Err(failed(e.to_string())),
        Err(_) => Err(failed(format!("timed out after {:?}", timeout))),
    }
}

async fn run_connection(url: String, connect_timeout: Duration, mut calls: mpsc::Receiver<Call>) {
    let mut socket: Option<Socket> = None;
    let mut pending: Pending = HashMap::new();

    loop {
        if socket.is_none() {
            let Some(call) = calls.recv().await else { break };
            match connect(&url, connect_timeout).await {
                Ok(mut ws) => {
                    log::info!("fetch rpc connected to {}", url);
                    if submit(&mut ws, call, &mut pending).await {
                        socket = Some(ws);
                    }
                }
                Err(e) => {
                    log::warn!("fetch rpc: {}", e);
                    let _ = call.reply.send(Err(e));
                }
            }
            continue;
        }
        let Some(ws) = socket.as_mut() else { continue };

        let alive = tokio::select! {
            call = calls.recv() => match call {
                Some(call) => submit(ws, call, &mut pending).await,
                None => break,
            },
            frame = ws.next() => read_frame(frame, &mut pending),
        };
        if !alive {
            fail_pending(&mut pending, "socket dropped before reply");
            socket = None;
        }
    }

    if let Some(mut ws) = socket {
        let _ = ws.close(None).await;
    }
    fail_pending(&mut pending, "client shut down");
    log::debug!("fetch rpc connection task stopped");
}

/// Write one request and park its reply sender. Returns false when the socket is unusable.
async fn submit(ws: &mut Socket, call: Call, pending: &mut Pending) -> bool {
    pending.retain(|_, reply| !reply.is_closed());
    let text = match serde_json::to_string(&call.request) {
        Ok(t) => t,
        Err(e) => {
            let _ = call.reply.send(Err(RpcError::Protocol(e.to_string())));
            return true;
        }
    };
    match ws.send(Message::Text(text)).await {
        Ok(()) => {
            pending.insert(call.request.id, call.reply);
            true
        }
        Err(e) => {
            let _ = call.reply.send(Err(RpcError::ConnectionLost(e.to_string())));
            false
        }
    }
}

fn read_frame(
    frame: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
    pending: &mut Pending,
) -> bool {
    match frame {
        Some(Ok(Message::Text(text))) => {
            deliver(&text, pending);
            true
        }
        Some(Ok(Message::Close(_))) | None => {
            log::info!("fetch rpc connection closed by server");
            false
        }
        Some(Ok(_)) => true,
        Some(Err(e)) => {
            log::warn!("fetch rpc connection error: {}", e);
            false
        }
    }
}

/// Hand a reply to its waiter. Waiters that already timed out are dropped here and in `submit`.
fn deliver(text: &str, pending: &mut Pending) {
    pending.retain(|_, reply| !reply.is_closed());
    let Ok(res) = serde_json::from_str::<RpcResponse>(text) else {
        log::debug!("fetch rpc: skipping undecodable frame");
        return;
    };
    if !res.is_response() {
        return;
    }
    match pending.remove(&res.id) {
        Some(reply) => {
            let _ = reply.send(Ok(res));
        }
        None => log::debug!("fetch rpc: reply for unknown or expired call {}", res.id),
    }
}

fn fail_pending(pending: &mut Pending, reason: &str) {
    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(RpcError::ConnectionLost(reason.to_string())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deliver_routes_reply_by_id() {
        let mut pending = Pending::new();
        let (tx_a, mut rx_a) = oneshot::channel();
        let (tx_b, mut rx_b) = oneshot::channel();
        pending.insert("a".to_string(), tx_a);
        pending.insert("b".to_string(), tx_b);

        let frame = serde_json::to_string(&RpcResponse::ok("b", json!({ "url": "u" }))).unwrap();
        deliver(&frame, &mut pending);

        let res = rx_b.try_recv().unwrap().unwrap();
        assert_eq!(res.id, "b");
        assert!(rx_a.try_recv().is_err());
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn deliver_drops_timed_out_waiters() {
        let mut pending = Pending::new();
        let (tx_gone, rx_gone) = oneshot::channel();
        let (tx_live, _rx_live) = oneshot::channel();
        pending.insert("gone".to_string(), tx_gone);
        pending.insert("live".to_string(), tx_live);
        drop(rx_gone);

        let frame = serde_json::to_string(&RpcResponse::ok("other", json!({ "url": "u" }))).unwrap();
        deliver(&frame, &mut pending);

        assert_eq!(pending.len(), 1);
        assert!(pending.contains_key("live"));
    }

    #[test]
    fn fail_pending_errors_every_waiter() {
        let mut pending = Pending::new();
        let (tx, mut rx) = oneshot::channel();
        pending.insert("a".to_string(), tx);
        fail_pending(&mut pending, "gone");
        assert!(pending.is_empty());
        assert!(matches!(rx.try_recv().unwrap(), Err(RpcError::ConnectionLost(_))));
    }

    #[tokio::test]
    async fn unreachable_server_is_connect_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = FetchClient::new(
            format!("ws://127.0.0.1:{}/rpc", port),
            Duration::from_secs(2),
            Duration::from_secs(5),
        );
        let err = client.request_photo(FetchRequest::default()).await.unwrap_err();
        assert!(matches!(err, RpcError::Connect { .. }));
    }
}
