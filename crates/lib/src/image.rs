//! Image references and the seam the gateway fetches them through.

use crate::provider::ProviderError;
use crate::rpc::RpcError;
use async_trait::async_trait;

/// One fetched image. Identified by its URL only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub url: String,
}

impl ImageReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Why an image could not be obtained.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("image provider: {0}")]
    Upstream(#[from] ProviderError),
    #[error("fetch rpc: {0}")]
    Rpc(#[from] RpcError),
}

/// Anything that can produce one image per call: the provider client in the
/// fetcher, the RPC client in the gateway.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_image(&self) -> Result<ImageReference, FetchError>;
}
