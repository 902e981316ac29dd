use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Bytes, Message, Utf8Bytes};
use tracing::{debug, error, info, warn};

use super::actor::MemoryStore;
use super::messages::{StoreRequest, StoreResponse};
use super::{DocumentStore, StoreError};

pub const DEFAULT_STORE_PORT: u16 = 3480;
const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Serves a [`MemoryStore`] to [`RemoteStore`](super::RemoteStore) clients
pub struct DocumentServer {
    store: MemoryStore,
}

impl Default for DocumentServer {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentServer {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
        }
    }

    /// Serve an existing store, e.g. one the caller also uses in-process
    pub fn with_store(store: MemoryStore) -> Self {
        Self { store }
    }

    pub async fn run(&self, addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("Document server listening on {}", addr);
        self.serve(listener).await
    }

    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        loop {
            let (stream, addr) = listener.accept().await?;
            let store = self.store.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, store).await {
                    error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    store: MemoryStore,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    info!("WebSocket connection from {}", addr);

    let (tx, mut rx) = mpsc::unbounded_channel::<Utf8Bytes>();
    let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel::<Message>();

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    let mut waiting_for_pong = false;
    let mut pong_deadline: Option<tokio::time::Instant> = None;

    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    if ws_tx.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
                Some(ctrl_msg) = ctrl_rx.recv() => {
                    if ws_tx.send(ctrl_msg).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    loop {
        let pong_timeout = async {
            match pong_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = ping_interval.tick() => {
                if waiting_for_pong {
                    warn!("No Pong received, disconnecting {}", addr);
                    break;
                }
                if ctrl_tx.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
                waiting_for_pong = true;
                pong_deadline = Some(tokio::time::Instant::now() + PONG_TIMEOUT);
                debug!("Ping sent to {}", addr);
            }

            _ = pong_timeout => {
                warn!("Pong timeout, disconnecting {}", addr);
                break;
            }

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => {
                        let response = handle_text_message(&text, &store).await;
                        let json = serde_json::to_string(&response)?;
                        if tx.send(Utf8Bytes::from(json)).is_err() {
                            break;
                        }
                    }
                    Message::Pong(_) => {
                        waiting_for_pong = false;
                        pong_deadline = None;
                        debug!("Pong received from {}", addr);
                    }
                    Message::Close(_) => {
                        info!("Close received from {}", addr);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    send_task.abort();
    info!("WebSocket disconnected: {}", addr);

    Ok(())
}

async fn handle_text_message(text: &str, store: &MemoryStore) -> StoreResponse {
    let request: StoreRequest = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            return StoreResponse::Error {
                id: None,
                message: format!("Invalid message: {}", e),
            };
        }
    };

    let id = request.id();
    let result: Result<StoreResponse, StoreError> = match request {
        StoreRequest::Get { path, .. } => store
            .get(&path)
            .await
            .map(|value| StoreResponse::Value { id, value }),
        StoreRequest::Set { path, value, .. } => store
            .set(&path, value)
            .await
            .map(|()| StoreResponse::Written { id }),
        StoreRequest::CompareAndSet {
            path,
            expected,
            value,
            ..
        } => store
            .compare_and_set(&path, expected, value)
            .await
            .map(|applied| StoreResponse::Swapped { id, applied }),
    };

    result.unwrap_or_else(|e| StoreResponse::Error {
        id: Some(id),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn handles_set_and_get() {
        let store = MemoryStore::new();
        let written = handle_text_message(
            r#"{"type": "set", "id": 1, "path": "rooms/a", "value": {"full": false}}"#,
            &store,
        )
        .await;
        assert!(matches!(written, StoreResponse::Written { id: 1 }));

        let read = handle_text_message(
            r#"{"type": "get", "id": 2, "path": "rooms/a"}"#,
            &store,
        )
        .await;
        match read {
            StoreResponse::Value { id, value } => {
                assert_eq!(id, 2);
                assert_eq!(value, Some(json!({"full": false})));
            }
            other => panic!("Expected Value, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_request_has_no_id() {
        let store = MemoryStore::new();
        let response = handle_text_message("not json", &store).await;
        match response {
            StoreResponse::Error { id, message } => {
                assert_eq!(id, None);
                assert!(message.starts_with("Invalid message"));
            }
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn store_errors_echo_id() {
        let store = MemoryStore::new();
        let response =
            handle_text_message(r#"{"type": "get", "id": 5, "path": "a//b"}"#, &store).await;
        assert!(matches!(response, StoreResponse::Error { id: Some(5), .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn drops_peer_that_never_answers_ping() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = DocumentServer::new().serve(listener).await;
        });

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
            .await
            .unwrap();

        // pongs only go out while the client reads
        tokio::time::sleep(PING_INTERVAL + PONG_TIMEOUT).await;

        let closed = tokio::time::timeout(PING_INTERVAL * 4, async {
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;
        assert!(closed.is_ok(), "server kept a silent peer connected");
    }
}
