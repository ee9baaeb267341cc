//! The line-framed JSON-RPC envelope exchanged with worker subprocesses (§4.7).
//!
//! One JSON object per line, UTF-8, newline-terminated. Correlation is by
//! `id`, monotonic per worker on the caller side.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: u64,
    #[serde(flatten)]
    pub outcome: RpcOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcOutcome {
    Ok { result: Value },
    Err { error: RpcError },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub kind: crate::error::ErrorKind,
    pub message: String,
}

/// A single tool exposed by a worker, as returned from its `list_tools` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub params_schema: Value,
    pub result_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_outcome_round_trips_through_json() {
        let response = RpcResponse {
            id: 7,
            outcome: RpcOutcome::Ok {
                result: serde_json::json!({"status": "executed"}),
            },
        };
        let line = serde_json::to_string(&response).unwrap();
        assert!(!line.contains('\n'));
        let parsed: RpcResponse = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.id, 7);
    }

    #[test]
    fn err_outcome_round_trips_through_json() {
        let response = RpcResponse {
            id: 3,
            outcome: RpcOutcome::Err {
                error: RpcError {
                    kind: crate::error::ErrorKind::ErrTimeout,
                    message: "deadline exceeded".to_string(),
                },
            },
        };
        let line = serde_json::to_string(&response).unwrap();
        let parsed: RpcResponse = serde_json::from_str(&line).unwrap();
        match parsed.outcome {
            RpcOutcome::Err { error } => assert_eq!(error.message, "deadline exceeded"),
            RpcOutcome::Ok { .. } => panic!("expected error outcome"),
        }
    }
}
