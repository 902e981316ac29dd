//! Keyed JSON document store: in-memory actor, WebSocket server and client

mod actor;
mod messages;
mod remote;
mod server;
mod tree;

use std::future::Future;

use serde_json::Value;
use thiserror::Error;

pub use actor::MemoryStore;
pub use messages::{StoreRequest, StoreResponse};
pub use remote::RemoteStore;
pub use server::{DEFAULT_STORE_PORT, DocumentServer};
pub use tree::child_path;

/// Document store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),
}

/// A keyed document store addressed by slash-separated paths.
///
/// Reads return the whole subtree under a path, or `None` when nothing is
/// stored there. Writing `Value::Null` deletes.
pub trait DocumentStore: Send + Sync {
    fn get(&self, path: &str) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    fn set(&self, path: &str, value: Value) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Write `value` only if the current value at `path` equals `expected`
    /// (`None` meaning absent). Returns whether the write was applied.
    fn compare_and_set(
        &self,
        path: &str,
        expected: Option<Value>,
        value: Value,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}
