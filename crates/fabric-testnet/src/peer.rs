//! Simulated endorsing peer

use ed25519_dalek::VerifyingKey;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use fabric_types::{Endorsement, GatewayRequest, PeerReply, PeerResponse, SignedProposal};

use crate::chaincode::KvChaincode;
use crate::store::LedgerStore;

/// Endorses proposals by executing the chaincode read-only against the
/// shared ledger state
#[derive(Clone)]
pub struct EndorsingPeer {
    name: String,
    channel: String,
    chaincode: String,
    store: LedgerStore,
    ca_key: VerifyingKey,
}

impl EndorsingPeer {
    pub fn new(
        name: &str,
        channel: &str,
        chaincode: &str,
        store: LedgerStore,
        ca_key: VerifyingKey,
    ) -> Self {
        Self {
            name: name.to_string(),
            channel: channel.to_string(),
            chaincode: chaincode.to_string(),
            store,
            ca_key,
        }
    }

    fn endorse(&self, signed: &SignedProposal) -> PeerReply {
        if let Err(message) = self.admit(signed) {
            tracing::warn!(peer = %self.name, %message, "Proposal rejected");
            return PeerReply::Error { message };
        }

        let result = KvChaincode::invoke(&self.store, &signed.proposal.function, &signed.proposal.args);
        tracing::debug!(
            peer = %self.name,
            function = %signed.proposal.function,
            status = result.status,
            "Endorsed proposal"
        );
        PeerReply::Endorsement(Endorsement {
            response: self.response(signed, result.status, result.payload),
            write_set: result.write_set,
        })
    }

    fn query(&self, signed: &SignedProposal) -> PeerReply {
        if let Err(message) = self.admit(signed) {
            tracing::warn!(peer = %self.name, %message, "Query rejected");
            return PeerReply::Error { message };
        }

        // Read-only path: any write set the chaincode produced is dropped.
        let result = KvChaincode::invoke(&self.store, &signed.proposal.function, &signed.proposal.args);
        PeerReply::QueryResult(self.response(signed, result.status, result.payload))
    }

    fn response(&self, signed: &SignedProposal, status: u16, payload: Vec<u8>) -> PeerResponse {
        PeerResponse {
            endorser: self.name.clone(),
            status,
            payload,
            transaction_id: signed.proposal.transaction_id.clone(),
        }
    }

    fn admit(&self, signed: &SignedProposal) -> Result<(), String> {
        signed
            .certificate
            .verify(&self.ca_key)
            .map_err(|e| format!("certificate rejected: {e}"))?;
        signed
            .verify()
            .map_err(|e| format!("proposal signature rejected: {e}"))?;
        if signed.proposal.channel != self.channel {
            return Err(format!("unknown channel {:?}", signed.proposal.channel));
        }
        if signed.proposal.chaincode != self.chaincode {
            return Err(format!("unknown chaincode {:?}", signed.proposal.chaincode));
        }
        Ok(())
    }
}

pub(crate) async fn handle_connection(stream: TcpStream, peer: EndorsingPeer) -> anyhow::Result<()> {
    let mut ws = accept_async(stream).await?;

    while let Some(message) = ws.next().await {
        match message? {
            Message::Binary(data) => {
                let reply = match GatewayRequest::from_bytes(&data) {
                    Ok(GatewayRequest::Endorse(signed)) => peer.endorse(&signed),
                    Ok(GatewayRequest::Query(signed)) => peer.query(&signed),
                    Ok(_) => PeerReply::Error {
                        message: "peer only serves endorsement and query".to_string(),
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
