//! Gateway HTTP server: webhook intake plus diagnostics on one port.

use super::diagnostic::{diagnostic_routes, health_http};
use super::webhook::slack_dog_hook;
use crate::config::{build_http_client, resolve_fetcher_url, resolve_version, Config};
use crate::image::ImageSource;
use crate::notify::{Notifier, SlackNotifier};
use crate::rpc::FetchClient;
use crate::shutdown::shutdown_signal;
use anyhow::{Context, Result};
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;

/// Shared state for the gateway. Clients are built once at startup and shared by every request.
#[derive(Clone)]
pub struct GatewayState {
    /// Where images come from (the fetch RPC client in production).
    pub images: Arc<dyn ImageSource>,
    /// Where images go (the Slack notifier in production).
    pub notifier: Arc<dyn Notifier>,
    pub version: Arc<str>,
    pub port: u16,
    /// When true, every request and response is logged.
    pub debug: bool,
}

impl GatewayState {
    pub fn new(config: &Config, images: Arc<dyn ImageSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            images,
            notifier,
            version: resolve_version(config).into(),
            port: config.gateway.port,
            debug: config.gateway.debug,
        }
    }
}

/// Gateway routes. Webhooks live at `/hook/slack/dog` and `/api/v1/hook/slack/dog`;
/// diagnostics at the root and under `/diagnostic`.
pub fn router(state: GatewayState) -> Router {
    let debug = state.debug;
    let hooks: Router<GatewayState> = Router::new().route("/hook/slack/dog", post(slack_dog_hook));
    let app = Router::new()
        .route("/", get(health_http))
        .merge(hooks.clone())
        .merge(diagnostic_routes())
        .nest("/api/v1", hooks)
        .nest("/diagnostic", diagnostic_routes())
        .with_state(state);
    if debug {
        app.layer(middleware::from_fn(log_exchange))
    } else {
        app
    }
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// The fetch RPC connection is opened lazily on the first webhook.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    let client = build_http_client(&config.http)?;
    let notifier = SlackNotifier::new(client, &config.notification.base_url)
        .context("configuring notifier")?;
    let fetcher_url = resolve_fetcher_url(&config);
    let images = FetchClient::new(
        fetcher_url.clone(),
        config.fetcher.connect_timeout(),
        config.fetcher.call_timeout(),
    );
    log::info!("fetch rpc target {}", fetcher_url);

    let state = GatewayState::new(&config, Arc::new(images), Arc::new(notifier));
    let app = router(state);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Debug mode: one line per exchange.
async fn log_exchange(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let started = Instant::now();
    let res = next.run(req).await;
    log::info!("{} {} -> {} ({:?})", method, uri, res.status(), started.elapsed());
    res
}
