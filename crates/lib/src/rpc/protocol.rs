//! Fetch RPC wire types: req/res frames and the `requestPhoto` messages.

use crate::image::ImageReference;
use serde::{Deserialize, Serialize};

pub const METHOD_REQUEST_PHOTO: &str = "requestPhoto";

const FRAME_REQ: &str = "req";
const FRAME_RES: &str = "res";

/// Wire request: `{ "type": "req", "id", "method", "params" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(rename = "type")]
    pub typ: String,
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Wire response: `{ "type": "res", "id", "ok", "payload" or "error" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(rename = "type")]
    pub typ: String,
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Params for `requestPhoto`. No fields today; missing or null params decode to the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {}

/// Payload for a successful `requestPhoto`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub url: String,
}

impl RpcRequest {
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            typ: FRAME_REQ.to_string(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    pub fn is_request(&self) -> bool {
        self.typ == FRAME_REQ
    }
}

impl RpcResponse {
    pub fn ok(id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            typ: FRAME_RES.to_string(),
            id: id.into(),
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            typ: FRAME_RES.to_string(),
            id: id.into(),
            ok: false,
            payload: None,
            error: Some(error.into()),
        }
    }

    pub fn is_response(&self) -> bool {
        self.typ == FRAME_RES
    }

    /// Split into the payload or the remote error message. An `ok` frame without a payload
    /// counts as an error: a success always carries exactly one value.
    pub fn into_result(self) -> Result<serde_json::Value, String> {
        match (self.ok, self.payload) {
            (true, Some(payload)) => Ok(payload),
            (true, None) => Err("response marked ok without payload".to_string()),
            (false, _) => Err(self.error.unwrap_or_else(|| "rpc failed".to_string())),
        }
    }
}

impl FetchRequest {
    /// Decode request params, treating null as the default request.
    pub fn from_params(params: serde_json::Value) -> Result<Self, serde_json::Error> {
        if params.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(params)
    }
}

impl From<ImageReference> for FetchResponse {
    fn from(image: ImageReference) -> Self {
        Self { url: image.url }
    }
}

impl From<FetchResponse> for ImageReference {
    fn from(res: FetchResponse) -> Self {
        ImageReference::new(res.url)
    }
}
