//! Configuration types and loading.
//!
//! Config is loaded once at startup from a JSON file (e.g. `~/.dogcam/config.json`).
//! The gateway and the fetcher read the same file; each uses its own section.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::notify::DEFAULT_NOTIFICATION_BASE_URL;
use crate::provider::DEFAULT_PROVIDER_BASE_URL;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Webhook gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Fetch service settings (listen side for the fetcher, target side for the gateway).
    #[serde(default)]
    pub fetcher: FetcherConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub notification: NotificationConfig,

    /// Shared outbound HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Gateway bind, port, debug logging and reported version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// HTTP port for webhooks and diagnostics (default 8080).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Log every request and response.
    #[serde(default)]
    pub debug: bool,

    /// Reported by GET /version. Defaults to the crate version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Fetch service address and RPC timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetcherConfig {
    /// Port the fetcher listens on and the gateway connects to (default 9090).
    #[serde(default = "default_fetcher_port")]
    pub port: u16,

    /// Fetcher bind address (default "127.0.0.1").
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Host the gateway dials for RPC (default "127.0.0.1").
    #[serde(default = "default_bind")]
    pub host: String,

    /// Per-call RPC timeout in seconds, including connect (default 30).
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Image provider API root (default https://dog.ceo/api/).
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfig {
    /// Base that relative callback URLs are resolved against (default https://hooks.slack.com/commands/).
    #[serde(default = "default_notification_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    /// Whole-request timeout in seconds (default 10).
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_fetcher_port() -> u16 {
    9090
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_provider_base_url() -> String {
    DEFAULT_PROVIDER_BASE_URL.to_string()
}

fn default_notification_base_url() -> String {
    DEFAULT_NOTIFICATION_BASE_URL.to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_bind(),
            debug: false,
            version: None,
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            port: default_fetcher_port(),
            bind: default_bind(),
            host: default_bind(),
            call_timeout_secs: default_call_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            base_url: default_notification_base_url(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl FetcherConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Version reported by the gateway: configured value if non-empty, else the crate version.
pub fn resolve_version(config: &Config) -> String {
    config
        .gateway
        .version
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
}

/// WebSocket URL the gateway dials for the fetch RPC.
pub fn resolve_fetcher_url(config: &Config) -> String {
    format!("ws://{}:{}/rpc", config.fetcher.host.trim(), config.fetcher.port)
}

/// Build the one outbound HTTP client a process shares across all requests.
pub fn build_http_client(http: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(http.timeout_secs))
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .user_agent(concat!("dogcam/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building http client")
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("DOGCAM_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".dogcam").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, else the default path (or DOGCAM_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
