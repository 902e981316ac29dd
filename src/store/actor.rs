use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::tree;
use super::{DocumentStore, StoreError};

const COMMAND_BUFFER: usize = 1024;

/// Commands sent to the document actor
pub(crate) enum StoreCommand {
    Get {
        path: String,
        reply: oneshot::Sender<Result<Option<Value>, StoreError>>,
    },
    Set {
        path: String,
        value: Value,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    CompareAndSet {
        path: String,
        expected: Option<Value>,
        value: Value,
        reply: oneshot::Sender<Result<bool, StoreError>>,
    },
}

/// Owns the document tree. Commands are applied one at a time, which is what
/// makes compare-and-set atomic.
pub(crate) async fn document_actor(mut rx: mpsc::Receiver<StoreCommand>) {
    let mut root = Value::Object(Map::new());

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::Get { path, reply } => {
                let result = tree::segments(&path).map(|segs| tree::get(&root, &segs).cloned());
                let _ = reply.send(result);
            }

            StoreCommand::Set { path, value, reply } => {
                let result = tree::segments(&path).map(|segs| {
                    tree::set(&mut root, &segs, value);
                    debug!("Document written at {}", path);
                });
                normalize_root(&mut root);
                let _ = reply.send(result);
            }

            StoreCommand::CompareAndSet {
                path,
                expected,
                value,
                reply,
            } => {
                let result = tree::segments(&path).map(|segs| {
                    let current = tree::get(&root, &segs);
                    if current != expected.as_ref() {
                        debug!("Compare-and-set rejected at {}", path);
                        return false;
                    }
                    tree::set(&mut root, &segs, value);
                    debug!("Compare-and-set applied at {}", path);
                    true
                });
                normalize_root(&mut root);
                let _ = reply.send(result);
            }
        }
    }
}

fn normalize_root(root: &mut Value) {
    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
}

/// Handle to an in-process document store
#[derive(Clone)]
pub struct MemoryStore {
    tx: mpsc::Sender<StoreCommand>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Spawn the document actor. Must be called inside a tokio runtime.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<StoreCommand>(COMMAND_BUFFER);
        tokio::spawn(document_actor(rx));
        Self { tx }
    }

    async fn call<T>(
        &self,
        cmd: StoreCommand,
        reply_rx: oneshot::Receiver<Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| StoreError::Unavailable("actor channel closed".to_string()))?;
        reply_rx
            .await
            .map_err(|_| StoreError::Unavailable("actor channel closed".to_string()))?
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let (reply, reply_rx) = oneshot::channel();
        let cmd = StoreCommand::Get {
            path: path.to_string(),
            reply,
        };
        self.call(cmd, reply_rx).await
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let (reply, reply_rx) = oneshot::channel();
        let cmd = StoreCommand::Set {
            path: path.to_string(),
            value,
            reply,
        };
        self.call(cmd, reply_rx).await
    }

    async fn compare_and_set(
        &self,
        path: &str,
        expected: Option<Value>,
        value: Value,
    ) -> Result<bool, StoreError> {
        let (reply, reply_rx) = oneshot::channel();
        let cmd = StoreCommand::CompareAndSet {
            path: path.to_string(),
            expected,
            value,
            reply,
        };
        self.call(cmd, reply_rx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn get_missing_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("rooms/nope").await.unwrap(), None);
        assert_eq!(store.get("rooms").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_subtree() {
        let store = MemoryStore::new();
        store.set("rooms/a", json!({"full": false})).await.unwrap();
        store.set("rooms/a/black", json!("u2")).await.unwrap();

        let room = store.get("rooms/a").await.unwrap().unwrap();
        assert_eq!(room, json!({"full": false, "black": "u2"}));

        let rooms = store.get("rooms").await.unwrap().unwrap();
        assert!(rooms.get("a").is_some());
    }

    #[tokio::test]
    async fn set_null_deletes() {
        let store = MemoryStore::new();
        store.set("rooms/a", json!({"full": false})).await.unwrap();
        store.set("rooms/a", Value::Null).await.unwrap();
        assert_eq!(store.get("rooms/a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn root_overwrite_keeps_store_usable() {
        let store = MemoryStore::new();
        store.set("", json!(42)).await.unwrap();
        store.set("rooms/a", json!(1)).await.unwrap();
        assert_eq!(store.get("rooms/a").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn invalid_path_is_rejected() {
        let store = MemoryStore::new();
        let err = store.set("rooms//a", json!(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn compare_and_set_on_absent() {
        let store = MemoryStore::new();
        assert!(store.compare_and_set("lock", None, json!("u1")).await.unwrap());
        assert!(!store.compare_and_set("lock", None, json!("u2")).await.unwrap());
        assert_eq!(store.get("lock").await.unwrap(), Some(json!("u1")));
    }

    #[tokio::test]
    async fn compare_and_set_on_snapshot() {
        let store = MemoryStore::new();
        store.set("rooms/a", json!({"full": false})).await.unwrap();

        let snapshot = store.get("rooms/a").await.unwrap();
        let applied = store
            .compare_and_set("rooms/a", snapshot.clone(), json!({"full": true}))
            .await
            .unwrap();
        assert!(applied);

        let stale = store
            .compare_and_set("rooms/a", snapshot, json!({"full": false}))
            .await
            .unwrap();
        assert!(!stale);
        assert_eq!(store.get("rooms/a/full").await.unwrap(), Some(json!(true)));
    }
}
