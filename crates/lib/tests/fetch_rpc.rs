//! Integration test: fetch RPC over a real WebSocket between `FetchClient` and the fetcher router.

use async_trait::async_trait;
use dogcam::image::{FetchError, ImageReference, ImageSource};
use dogcam::provider::ProviderError;
use dogcam::rpc::{self, FetchClient, FetchRequest, FetchService, RpcError, RpcRequest, RpcResponse};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

struct Fixed(&'static str);

#[async_trait]
impl ImageSource for Fixed {
    async fn fetch_image(&self) -> Result<ImageReference, FetchError> {
        Ok(ImageReference::new(self.0))
    }
}

struct Failing;

#[async_trait]
impl ImageSource for Failing {
    async fn fetch_image(&self) -> Result<ImageReference, FetchError> {
        Err(ProviderError::Api("502 Bad Gateway upstream".to_string()).into())
    }
}

/// Each call gets its own URL; later calls finish sooner so replies come back out of order.
#[derive(Default)]
struct Numbered(AtomicUsize);

#[async_trait]
impl ImageSource for Numbered {
    async fn fetch_image(&self) -> Result<ImageReference, FetchError> {
        let n = self.0.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200u64.saturating_sub(n as u64 * 20))).await;
        Ok(ImageReference::new(format!("http://dogs.test/{}.jpg", n)))
    }
}

async fn serve_fetcher(source: Arc<dyn ImageSource>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    let app = rpc::router(FetchService::new(source), addr.port());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn client_for(addr: SocketAddr) -> FetchClient {
    FetchClient::new(
        format!("ws://{}/rpc", addr),
        Duration::from_secs(2),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn request_photo_round_trips_url() {
    let addr = serve_fetcher(Arc::new(Fixed("http://example.org/dog.jpg"))).await;
    let client = client_for(addr);

    let res = client.request_photo(FetchRequest::default()).await.expect("requestPhoto");
    assert_eq!(res.url, "http://example.org/dog.jpg");

    let image = client.fetch_image().await.expect("fetch_image");
    assert_eq!(image, ImageReference::new("http://example.org/dog.jpg"));
}

#[tokio::test]
async fn provider_failure_arrives_as_remote_error() {
    let addr = serve_fetcher(Arc::new(Failing)).await;
    let client = client_for(addr);

    let err = client.request_photo(FetchRequest::default()).await.unwrap_err();
    match err {
        RpcError::Remote(msg) => assert!(msg.contains("502 Bad Gateway upstream"), "{}", msg),
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn concurrent_calls_share_one_connection() {
    let addr = serve_fetcher(Arc::new(Numbered::default())).await;
    let client = client_for(addr);

    let calls = (0..8).map(|_| {
        let client = client.clone();
        async move { client.request_photo(FetchRequest::default()).await }
    });
    let mut urls: Vec<String> = futures_util::future::join_all(calls)
        .await
        .into_iter()
        .map(|r| r.expect("requestPhoto").url)
        .collect();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), 8);
}

#[tokio::test]
async fn unknown_method_gets_error_frame_with_same_id() {
    let addr = serve_fetcher(Arc::new(Fixed("http://example.org"))).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/rpc", addr))
        .await
        .expect("connect");

    let req = RpcRequest::new("abc", "deleteEverything", serde_json::json!({}));
    ws.send(Message::Text(serde_json::to_string(&req).unwrap()))
        .await
        .expect("send");

    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("reply in time")
        .expect("frame")
        .expect("ok frame");
    let Message::Text(text) = frame else {
        panic!("expected text frame");
    };
    let res: RpcResponse = serde_json::from_str(&text).expect("response frame");
    assert_eq!(res.id, "abc");
    assert!(!res.ok);
    assert!(res.error.unwrap_or_default().contains("unknown method"));
}

#[tokio::test]
async fn undecodable_params_get_error_frame_with_same_id() {
    let addr = serve_fetcher(Arc::new(Fixed("http://example.org"))).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/rpc", addr))
        .await
        .expect("connect");

    let req = RpcRequest::new("p1", "requestPhoto", serde_json::json!("x"));
    ws.send(Message::Text(serde_json::to_string(&req).unwrap()))
        .await
        .expect("send");

    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("reply in time")
        .expect("frame")
        .expect("ok frame");
    let Message::Text(text) = frame else {
        panic!("expected text frame");
    };
    let res: RpcResponse = serde_json::from_str(&text).expect("response frame");
    assert_eq!(res.id, "p1");
    assert!(!res.ok);
    assert!(res.error.unwrap_or_default().contains("invalid requestPhoto params"));
}

/// Raw WebSocket fetcher that misbehaves on purpose. Connection 0 answers one call and then
/// closes; connection 1 reads the call and closes without answering; later connections answer.
async fn serve_flaky_fetcher() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let mut n = 0usize;
        while let Ok((stream, _)) = listener.accept().await {
            let conn = n;
            n += 1;
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else { return };
                let Some(Ok(Message::Text(text))) = ws.next().await else { return };
                let req: RpcRequest = serde_json::from_str(&text).expect("request frame");
                if conn == 1 {
                    let _ = ws.close(None).await;
                    return;
                }
                let res = RpcResponse::ok(
                    req.id,
                    serde_json::json!({ "url": format!("http://dogs.test/{}.jpg", conn) }),
                );
                let _ = ws.send(Message::Text(serde_json::to_string(&res).unwrap())).await;
                if conn == 0 {
                    let _ = ws.close(None).await;
                } else {
                    while let Some(Ok(_)) = ws.next().await {}
                }
            });
        }
    });
    addr
}

#[tokio::test]
async fn dropped_socket_fails_pending_call_and_next_call_reconnects() {
    let addr = serve_flaky_fetcher().await;
    let client = client_for(addr);

    let first = client.request_photo(FetchRequest::default()).await.expect("first call");
    assert_eq!(first.url, "http://dogs.test/0.jpg");
    // let the connection task see the server's close before the next call
    tokio::time::sleep(Duration::from_millis(200)).await;

    let err = client.request_photo(FetchRequest::default()).await.unwrap_err();
    assert!(matches!(err, RpcError::ConnectionLost(_)), "{:?}", err);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let third = client.request_photo(FetchRequest::default()).await.expect("third call");
    assert_eq!(third.url, "http://dogs.test/2.jpg");
}
