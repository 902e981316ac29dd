use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::messages::{StoreRequest, StoreResponse};
use super::{DocumentStore, StoreError};

const REQUEST_BUFFER: usize = 256;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct PendingRequest {
    request: StoreRequest,
    reply: oneshot::Sender<StoreResponse>,
}

/// Document store client talking to a [`DocumentServer`](super::DocumentServer)
/// over a single WebSocket connection
#[derive(Clone)]
pub struct RemoteStore {
    tx: mpsc::Sender<PendingRequest>,
    next_id: Arc<AtomicU64>,
}

impl RemoteStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        info!("Connected to document server at {}", url);

        let (tx, rx) = mpsc::channel::<PendingRequest>(REQUEST_BUFFER);
        tokio::spawn(connection_loop(ws_stream, rx));

        Ok(Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn request(&self, request: StoreRequest) -> Result<StoreResponse, StoreError> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest { request, reply })
            .await
            .map_err(|_| StoreError::Unavailable("connection closed".to_string()))?;
        let response = reply_rx
            .await
            .map_err(|_| StoreError::Unavailable("connection closed".to_string()))?;

        match response {
            StoreResponse::Error { message, .. } => Err(StoreError::Remote(message)),
            other => Ok(other),
        }
    }
}

impl DocumentStore for RemoteStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let request = StoreRequest::Get {
            id: self.next_id(),
            path: path.to_string(),
        };
        match self.request(request).await? {
            StoreResponse::Value { value, .. } => Ok(value),
            other => Err(unexpected(&other)),
        }
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let request = StoreRequest::Set {
            id: self.next_id(),
            path: path.to_string(),
            value,
        };
        match self.request(request).await? {
            StoreResponse::Written { .. } => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    async fn compare_and_set(
        &self,
        path: &str,
        expected: Option<Value>,
        value: Value,
    ) -> Result<bool, StoreError> {
        let request = StoreRequest::CompareAndSet {
            id: self.next_id(),
            path: path.to_string(),
            expected,
            value,
        };
        match self.request(request).await? {
            StoreResponse::Swapped { applied, .. } => Ok(applied),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &StoreResponse) -> StoreError {
    StoreError::Protocol(format!("unexpected response: {:?}", response))
}

/// Writes requests and routes responses back by id. Dropping out of the loop
/// drops every pending reply, which callers see as `Unavailable`.
async fn connection_loop(ws_stream: WsStream, mut rx: mpsc::Receiver<PendingRequest>) {
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let mut pending: HashMap<u64, oneshot::Sender<StoreResponse>> = HashMap::new();

    loop {
        tokio::select! {
            req = rx.recv() => {
                let Some(PendingRequest { request, reply }) = req else {
                    break;
                };
                let json = match serde_json::to_string(&request) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to encode request: {}", e);
                        continue;
                    }
                };
                pending.insert(request.id(), reply);
                if ws_tx.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
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
                    Message::Text(text) => match serde_json::from_str::<StoreResponse>(&text) {
                        Ok(response) => match response.id().and_then(|id| pending.remove(&id)) {
                            Some(reply) => {
                                let _ = reply.send(response);
                            }
                            None => warn!("Unsolicited response: {:?}", response),
                        },
                        Err(e) => warn!("Invalid response: {}", e),
                    },
                    Message::Close(_) => {
                        info!("Document server closed the connection");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    debug!("Connection loop finished with {} pending requests", pending.len());
    let _ = ws_tx.close().await;
}
