//! Dog image provider client (https://dog.ceo/api/ by default).
//! One GET per call, no retry, no caching.

use crate::image::{FetchError, ImageReference, ImageSource};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://dog.ceo/api/";
const RANDOM_IMAGE_PATH: &str = "breeds/image/random";
const STATUS_SUCCESS: &str = "success";

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid provider url: {0}")]
    InvalidUrl(String),
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider api error: {0}")]
    Api(String),
    #[error("provider response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Provider body: `{ "status": "success", "message": "<image url>" }`.
#[derive(Debug, Deserialize)]
struct RandomImageResponse {
    status: String,
    message: String,
}

/// Client for the image provider. Cheap to clone; shares the underlying HTTP client.
#[derive(Clone)]
pub struct DogApiClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl DogApiClient {
    /// `base_url` must end in `/` for the endpoint path to be appended rather than replace the last segment;
    /// a missing trailing slash is added.
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self, ProviderError> {
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let endpoint = Url::parse(&base)
            .and_then(|b| b.join(RANDOM_IMAGE_PATH))
            .map_err(|e| ProviderError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// GET breeds/image/random and map `message` into an image reference.
    pub async fn random_image(&self) -> Result<ImageReference, ProviderError> {
        let res = self.client.get(self.endpoint.clone()).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("{} {}", status, body)));
        }
        let body = res.text().await?;
        let data: RandomImageResponse = serde_json::from_str(&body)?;
        if data.status != STATUS_SUCCESS {
            return Err(ProviderError::Api(format!(
                "status {:?}: {}",
                data.status, data.message
            )));
        }
        let url = data.message.trim();
        if url.is_empty() {
            return Err(ProviderError::Api("empty image url".to_string()));
        }
        Ok(ImageReference::new(url))
    }
}

#[async_trait]
impl ImageSource for DogApiClient {
    async fn fetch_image(&self) -> Result<ImageReference, FetchError> {
        Ok(self.random_image().await?)
    }
}
