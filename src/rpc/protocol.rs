//! JSON-RPC 2.0 envelopes for the stdio transport.

use crate::types::Error;
use serde::{Deserialize, Serialize};

/// JSON-RPC 2.0 ID — may be a number or string per spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    Str(String),
}

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<RpcId>,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RpcId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<RpcId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<RpcId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "Parse error".into(),
            data: None,
        }
    }

    pub fn invalid_request() -> Self {
        Self {
            code: -32600,
            message: "Invalid Request".into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: detail.into(),
            data: None,
        }
    }
}

/// Convert an engine error into a JSON-RPC error.
///
/// Validation-shaped kinds map to -32602, the rest to -32603. The stable
/// engine kind (and retry-after hint, when present) rides in `data` for
/// structured clients.
impl From<&Error> for JsonRpcError {
    fn from(error: &Error) -> Self {
        let code = match error {
            Error::Schema(_) | Error::NotFound(_) | Error::Duplicate(_) => -32602,
            _ => -32603,
        };
        let mut data = serde_json::Map::new();
        data.insert("kind".into(), serde_json::json!(error.kind()));
        if let Some(retry_after) = error.retry_after() {
            data.insert(
                "retry_after_ms".into(),
                serde_json::json!(retry_after.as_millis() as u64),
            );
        }
        Self {
            code,
            message: error.to_string(),
            data: Some(serde_json::Value::Object(data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_engine_error_mapping() {
        let err = JsonRpcError::from(&Error::schema("missing parameter"));
        assert_eq!(err.code, -32602);
        assert_eq!(err.data.as_ref().unwrap()["kind"], "SCHEMA_ERROR");

        let err = JsonRpcError::from(&Error::rate_limited("full", Duration::from_secs(30)));
        assert_eq!(err.code, -32603);
        assert_eq!(err.data.as_ref().unwrap()["retry_after_ms"], 30_000);
    }

    #[test]
    fn test_request_parses_string_or_number_id() {
        let req: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":7,"method":"status"}"#).unwrap();
        assert_eq!(req.id, Some(RpcId::Number(7)));

        let req: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"a","method":"status"}"#).unwrap();
        assert_eq!(req.id, Some(RpcId::Str("a".into())));
    }

    #[test]
    fn test_response_omits_absent_fields() {
        let json =
            serde_json::to_string(&JsonRpcResponse::success(None, serde_json::json!(1))).unwrap();
        assert!(!json.contains("error"));
        assert!(!json.contains("\"id\""));
    }
}
