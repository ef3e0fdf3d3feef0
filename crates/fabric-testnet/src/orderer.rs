//! Simulated ordering service

use std::sync::Arc;

use dashmap::DashSet;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use fabric_types::proposal::{TRANSIENT_EVENT_KEY, TRANSIENT_EVENT_VALUE};
use fabric_types::{CommitEvent, GatewayRequest, PeerReply, SubmitRequest};

use crate::store::LedgerStore;

/// Applies endorsed write sets to the ledger, exactly once per
/// transaction id, and publishes commit events
#[derive(Clone)]
pub struct OrderingService {
    channel: String,
    store: LedgerStore,
    committed: Arc<DashSet<String>>,
    events: broadcast::Sender<CommitEvent>,
}

impl OrderingService {
    pub fn new(channel: &str, store: LedgerStore, events: broadcast::Sender<CommitEvent>) -> Self {
        Self {
            channel: channel.to_string(),
            store,
            committed: Arc::new(DashSet::new()),
            events,
        }
    }

    fn order(&self, request: SubmitRequest) -> PeerReply {
        if request.channel != self.channel {
            return PeerReply::Error {
                message: format!("unknown channel {:?}", request.channel),
            };
        }

        // A retried submission acks without applying twice.
        if self.committed.insert(request.transaction_id.clone()) {
            self.store.apply(&request.write_set);
            let _ = self.events.send(CommitEvent {
                channel: request.channel,
                transaction_id: request.transaction_id.clone(),
                name: TRANSIENT_EVENT_KEY.to_string(),
                payload: TRANSIENT_EVENT_VALUE.to_vec(),
            });
            tracing::debug!(transaction_id = %request.transaction_id, "Transaction ordered");
        }

        PeerReply::Ack {
            transaction_id: request.transaction_id,
        }
    }
}

pub(crate) async fn handle_connection(
    stream: TcpStream,
    orderer: OrderingService,
) -> anyhow::Result<()> {
    let mut ws = accept_async(stream).await?;

    while let Some(message) = ws.next().await {
        match message? {
            Message::Binary(data) => {
                let reply = match GatewayRequest::from_bytes(&data) {
                    Ok(GatewayRequest::Submit(request)) => orderer.order(request),
                    Ok(_) => PeerReply::Error {
                        message: "orderer only serves submission".to_string(),
                    },
                    Err(e) => PeerReply::Error {
                        message: format!("malformed frame: {e}"),
                    },
                };
                ws.send(Message::Binary(reply.to_bytes())).await?;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}
