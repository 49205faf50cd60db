//! Newline-delimited JSON frames.
//!
//! ```text
//! → {"id":"…","service":"com.acme.Orders","version":"1","method":"get","params":{…}}
//! ← {"id":"…","result":{…}}
//! ← {"id":"…","error":{"code":"not_found","message":"…"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An inbound call. A frame without an `id` is assigned one on arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default = "new_request_id")]
    pub id: String,
    pub service: String,
    #[serde(default)]
    pub version: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultCode {
    NotFound,
    BadRequest,
    HandlerError,
}

impl FaultCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultCode::NotFound => "not_found",
            FaultCode::BadRequest => "bad_request",
            FaultCode::HandlerError => "handler_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcFault {
    pub code: FaultCode,
    pub message: String,
}

/// Reply to an [`RpcRequest`]. Exactly one of `result`/`error` is meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcFault>,
}

impl RpcResponse {
    pub fn ok(id: String, result: Value) -> Self {
        Self {
            id,
            result,
            error: None,
        }
    }

    pub fn fault(id: String, code: FaultCode, message: impl Into<String>) -> Self {
        Self {
            id,
            result: Value::Null,
            error: Some(RpcFault {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn into_result(self) -> Result<Value, RpcFault> {
        match self.error {
            Some(fault) => Err(fault),
            None => Ok(self.result),
        }
    }
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Serialize a frame with its trailing newline.
pub fn encode<T: Serialize>(frame: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(frame)?;
    line.push('\n');
    Ok(line)
}

pub fn decode_request(line: &str) -> Result<RpcRequest, serde_json::Error> {
    serde_json::from_str(line.trim_end())
}
