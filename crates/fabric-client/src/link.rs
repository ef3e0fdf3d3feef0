//! WebSocket links to ledger network endpoints
//!
//! Each link is a spawned task owning the connection, fed requests
//! through an mpsc channel with a oneshot reply per request. The wire
//! protocol is strictly request/response per link, so the task processes
//! one exchange at a time and concurrent callers queue in channel order.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use fabric_types::{CommitEvent, GatewayRequest, PeerReply};

use crate::error::{SessionError, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct LinkRequest {
    frame: Vec<u8>,
    wait: Duration,
    reply: oneshot::Sender<Result<PeerReply, TransportError>>,
}

/// Persistent request/response link to one peer or orderer endpoint
pub struct PeerLink {
    url: String,
    commands: mpsc::Sender<LinkRequest>,
    task: JoinHandle<()>,
}

impl PeerLink {
    /// Connect within `wait`; failure means the endpoint is unreachable
    pub async fn connect(url: &str, wait: Duration) -> Result<Self, SessionError> {
        let (ws, _) = tokio::time::timeout(wait, connect_async(url))
            .await
            .map_err(|_| SessionError::Endpoint {
                url: url.to_string(),
                reason: "connect timed out".to_string(),
            })?
            .map_err(|e| SessionError::Endpoint {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let (commands, rx) = mpsc::channel(64);
        let task = tokio::spawn(run_link(url.to_string(), ws, rx));
        tracing::debug!(%url, "Link established");

        Ok(Self {
            url: url.to_string(),
            commands,
            task,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request and await the endpoint's reply within `wait`
    pub async fn request(
        &self,
        request: &GatewayRequest,
        wait: Duration,
    ) -> Result<PeerReply, TransportError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(LinkRequest {
                frame: request.to_bytes(),
                wait,
                reply: reply_tx,
            })
            .await
            .map_err(|_| TransportError::Link {
                url: self.url.clone(),
                reason: "link task terminated".to_string(),
            })?;

        reply_rx.await.map_err(|_| TransportError::Link {
            url: self.url.clone(),
            reason: "link task dropped the request".to_string(),
        })?
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

async fn run_link(url: String, mut ws: WsStream, mut rx: mpsc::Receiver<LinkRequest>) {
    while let Some(request) = rx.recv().await {
        let result = exchange(&url, &mut ws, request.frame, request.wait).await;
        let failed = result.is_err();
        let _ = request.reply.send(result);
        if failed {
            // A failed exchange may leave a stray reply frame in flight;
            // the connection can no longer be trusted for correlation.
            break;
        }
    }
    let _ = ws.close(None).await;
    tracing::debug!(%url, "Link closed");
}

async fn exchange(
    url: &str,
    ws: &mut WsStream,
    frame: Vec<u8>,
    wait: Duration,
) -> Result<PeerReply, TransportError> {
    let deadline = tokio::time::Instant::now() + wait;

    tokio::time::timeout_at(deadline, ws.send(Message::Binary(frame)))
        .await
        .map_err(|_| TransportError::Timeout {
            url: url.to_string(),
            wait_ms: wait.as_millis() as u64,
        })?
        .map_err(|e| TransportError::Link {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    loop {
        let message = tokio::time::timeout_at(deadline, ws.next())
            .await
            .map_err(|_| TransportError::Timeout {
                url: url.to_string(),
                wait_ms: wait.as_millis() as u64,
            })?;

        match message {
            Some(Ok(Message::Binary(data))) => {
                return PeerReply::from_bytes(&data).map_err(|e| TransportError::Link {
                    url: url.to_string(),
                    reason: format!("malformed reply: {e}"),
                });
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(TransportError::Link {
                    url: url.to_string(),
                    reason: "connection closed".to_string(),
                });
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                return Err(TransportError::Link {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// One-shot exchange over a fresh connection (used for enrollment)
pub async fn request_once(
    url: &str,
    request: &GatewayRequest,
    wait: Duration,
) -> Result<PeerReply, TransportError> {
    let (mut ws, _) = tokio::time::timeout(wait, connect_async(url))
        .await
        .map_err(|_| TransportError::Timeout {
            url: url.to_string(),
            wait_ms: wait.as_millis() as u64,
        })?
        .map_err(|e| TransportError::Link {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let reply = exchange(url, &mut ws, request.to_bytes(), wait).await;
    let _ = ws.close(None).await;
    reply
}

/// Listener task forwarding committed-transaction events from the event
/// hub into a broadcast channel
pub struct EventLink {
    task: JoinHandle<()>,
}

impl EventLink {
    pub async fn subscribe(
        url: &str,
        channel: &str,
        wait: Duration,
        events: broadcast::Sender<CommitEvent>,
    ) -> Result<Self, SessionError> {
        let (mut ws, _) = tokio::time::timeout(wait, connect_async(url))
            .await
            .map_err(|_| SessionError::Endpoint {
                url: url.to_string(),
                reason: "connect timed out".to_string(),
            })?
            .map_err(|e| SessionError::Endpoint {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let subscribe = GatewayRequest::Subscribe {
            channel: channel.to_string(),
        };
        tokio::time::timeout(wait, ws.send(Message::Binary(subscribe.to_bytes())))
            .await
            .map_err(|_| SessionError::Endpoint {
                url: url.to_string(),
                reason: "subscribe timed out".to_string(),
            })?
            .map_err(|e| SessionError::Endpoint {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let url = url.to_string();
        let task = tokio::spawn(async move {
            while let Some(message) = ws.next().await {
                match message {
                    Ok(Message::Binary(data)) => match PeerReply::from_bytes(&data) {
                        Ok(PeerReply::Event(event)) => {
                            let _ = events.send(event);
                        }
                        Ok(other) => {
                            tracing::debug!(%url, "Ignoring non-event frame: {other:?}");
                        }
                        Err(e) => {
                            tracing::warn!(%url, "Malformed event frame: {e}");
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(%url, "Event stream error: {e}");
                        break;
                    }
                }
            }
            tracing::debug!(%url, "Event stream ended");
        });

        Ok(Self { task })
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}
