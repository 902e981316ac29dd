use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent from client to document server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreRequest {
    /// Read the subtree at a path
    #[serde(rename = "get")]
    Get { id: u64, path: String },

    /// Write (or delete with null) the value at a path
    #[serde(rename = "set")]
    Set { id: u64, path: String, value: Value },

    /// Write only if the current value equals `expected`
    #[serde(rename = "compare_and_set")]
    CompareAndSet {
        id: u64,
        path: String,
        expected: Option<Value>,
        value: Value,
    },
}

impl StoreRequest {
    pub fn id(&self) -> u64 {
        match self {
            StoreRequest::Get { id, .. }
            | StoreRequest::Set { id, .. }
            | StoreRequest::CompareAndSet { id, .. } => *id,
        }
    }
}

/// Messages sent from document server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreResponse {
    /// Result of a read; `null` when nothing is stored
    #[serde(rename = "value")]
    Value { id: u64, value: Option<Value> },

    #[serde(rename = "written")]
    Written { id: u64 },

    #[serde(rename = "swapped")]
    Swapped { id: u64, applied: bool },

    /// Error response; `id` is absent when the request could not be parsed
    #[serde(rename = "error")]
    Error { id: Option<u64>, message: String },
}

impl StoreResponse {
    pub fn id(&self) -> Option<u64> {
        match self {
            StoreResponse::Value { id, .. }
            | StoreResponse::Written { id }
            | StoreResponse::Swapped { id, .. } => Some(*id),
            StoreResponse::Error { id, .. } => *id,
        }
    }
}
