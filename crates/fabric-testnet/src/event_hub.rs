//! Simulated event hub streaming committed-transaction events

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use fabric_types::{CommitEvent, GatewayRequest, PeerReply};

/// Fans commit events out to subscribed gateways
#[derive(Clone)]
pub struct EventHub {
    events: broadcast::Sender<CommitEvent>,
}

impl EventHub {
    pub fn new(events: broadcast::Sender<CommitEvent>) -> Self {
        Self { events }
    }
}

pub(crate) async fn handle_connection(stream: TcpStream, hub: EventHub) -> anyhow::Result<()> {
    let ws = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws.split();

    // The first frame selects the channel to stream.
    let channel = loop {
        match ws_receiver.next().await {
            Some(Ok(Message::Binary(data))) => match GatewayRequest::from_bytes(&data) {
                Ok(GatewayRequest::Subscribe { channel }) => break channel,
                Ok(_) => {
                    let reply = PeerReply::Error {
                        message: "event hub only serves subscriptions".to_string(),
                    };
                    ws_sender.send(Message::Binary(reply.to_bytes())).await?;
                    return Ok(());
                }
                Err(e) => {
                    let reply = PeerReply::Error {
                        message: format!("malformed frame: {e}"),
                    };
                    ws_sender.send(Message::Binary(reply.to_bytes())).await?;
                    return Ok(());
                }
            },
            Some(Ok(Message::Close(_))) | None => return Ok(()),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    };

    tracing::debug!(%channel, "Event subscriber attached");
    let mut rx = hub.events.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) if event.channel == channel => {
                    let frame = PeerReply::Event(event).to_bytes();
                    if ws_sender.send(Message::Binary(frame)).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event subscriber lagged {n} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = ws_receiver.next() => match message {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("Event subscriber error: {e}");
                    break;
                }
            },
        }
    }

    tracing::debug!(%channel, "Event subscriber detached");
    Ok(())
}
