/// JSON-RPC
///
/// Encoding and decoding of the JSON-RPC 2.0 envelopes that travel inside
/// encryption envelopes. Requests may carry the non-standard `session`
/// hint some peers append; its `chainId` arrives as either a string or an
/// integer from legacy dApps.
///
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::constants::JSONRPC_VERSION;
use crate::error::{Error, Result};

/// Chain identifier. Decodes from a JSON string or integer, always
/// encodes as a string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainId(pub String);

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            String(String),
            Number(i64),
        }
        Ok(match Raw::deserialize(d)? {
            Raw::String(s) => ChainId(s),
            Raw::Number(n) => ChainId(n.to_string()),
        })
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChainId {
    fn from(value: &str) -> Self {
        ChainId(value.to_string())
    }
}

/// Non-standard request suffix: `"session":{"chainId":...,"account":...}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionHint {
    #[serde(rename = "chainId", default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<ChainId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonRpcRequest<P = Value> {
    pub id: i64,
    pub jsonrpc: String,
    pub method: String,
    pub params: P,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionHint>,
}

impl<P: Serialize> JsonRpcRequest<P> {
    pub fn new(id: i64, method: &str, params: P) -> JsonRpcRequest<P> {
        JsonRpcRequest {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
            session: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse<R = Value> {
    pub id: i64,
    pub jsonrpc: String,
    pub result: R,
}

impl<R: Serialize> JsonRpcResponse<R> {
    pub fn new(id: i64, result: R) -> JsonRpcResponse<R> {
        JsonRpcResponse {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            result,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonRpcErrorResponse {
    pub id: i64,
    pub jsonrpc: String,
    pub error: JsonRpcErrorObject,
}

impl JsonRpcErrorResponse {
    pub fn new(id: i64, code: i64, message: &str) -> JsonRpcErrorResponse {
        JsonRpcErrorResponse {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            error: JsonRpcErrorObject {
                code,
                message: message.to_string(),
            },
        }
    }
}

/// Decode a response payload. An `error` member takes precedence over any
/// `result` that may also be present.
pub fn decode_response<R: DeserializeOwned>(value: &Value) -> Result<R> {
    if let Some(error) = value.get("error") {
        let error: JsonRpcErrorObject = serde_json::from_value(error.clone())?;
        return Err(Error::JsonRpc {
            code: error.code,
            message: error.message,
        });
    }
    match value.get("result") {
        Some(result) => Ok(serde_json::from_value(result.clone())?),
        None => Err(Error::BadJsonRpcRequest),
    }
}

static ID_TAIL: AtomicI64 = AtomicI64::new(0);

/// Fresh request id: millisecond timestamp widened by three digits of
/// counter, matching what the reference clients put on the wire.
pub fn payload_id() -> i64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64;
    let tail = ID_TAIL.fetch_add(1, Ordering::Relaxed) % 1000;
    millis * 1000 + tail
}
