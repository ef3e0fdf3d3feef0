//! Proposal fan-out to endorsing peers and the ordering service
//!
//! Mutating proposals go to every registered endorsing peer; queries use
//! the same fan-out but a read-only message that never reaches the
//! orderer. Responses are collected in arrival order within the wait
//! bound; per-peer failures are logged and skipped, and only an empty
//! collection is a transport failure.

use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};

use fabric_types::{Endorsement, GatewayRequest, PeerReply, PeerResponse, SignedProposal, SubmitRequest};

use crate::error::TransportError;
use crate::session::Session;

/// Collect endorsements for a mutating proposal from all peers
pub async fn endorse(
    session: &Session,
    signed: &SignedProposal,
) -> Result<Vec<Endorsement>, TransportError> {
    let wait = signed.proposal.wait_time();
    let request = GatewayRequest::Endorse(signed.clone());
    let request = &request;

    let mut pending: FuturesUnordered<_> = session
        .peers()
        .iter()
        .map(|link| async move {
            let reply = link.request(request, wait).await;
            (link.url(), reply)
        })
        .collect();

    let mut endorsements = Vec::new();
    while let Some((url, reply)) = pending.next().await {
        match reply {
            Ok(PeerReply::Endorsement(endorsement)) => endorsements.push(endorsement),
            Ok(PeerReply::Error { message }) => {
                tracing::warn!(%url, %message, "Peer refused the proposal");
            }
            Ok(other) => {
                tracing::warn!(%url, "Unexpected endorsement reply: {other:?}");
            }
            Err(e) => {
                tracing::warn!(%url, "Endorsement failed: {e}");
            }
        }
    }

    if endorsements.is_empty() {
        return Err(TransportError::NoResponses);
    }
    Ok(endorsements)
}

/// Execute a read-only query against all peers
pub async fn query(
    session: &Session,
    signed: &SignedProposal,
) -> Result<Vec<PeerResponse>, TransportError> {
    let wait = signed.proposal.wait_time();
    let request = GatewayRequest::Query(signed.clone());
    let request = &request;

    let mut pending: FuturesUnordered<_> = session
        .peers()
        .iter()
        .map(|link| async move {
            let reply = link.request(request, wait).await;
            (link.url(), reply)
        })
        .collect();

    let mut responses = Vec::new();
    while let Some((url, reply)) = pending.next().await {
        match reply {
            Ok(PeerReply::QueryResult(response)) => responses.push(response),
            Ok(PeerReply::Error { message }) => {
                tracing::warn!(%url, %message, "Peer refused the query");
            }
            Ok(other) => {
                tracing::warn!(%url, "Unexpected query reply: {other:?}");
            }
            Err(e) => {
                tracing::warn!(%url, "Query failed: {e}");
            }
        }
    }

    if responses.is_empty() {
        return Err(TransportError::NoResponses);
    }
    Ok(responses)
}

/// Forward an endorsed transaction to the orderer and await the ack
pub async fn submit(
    session: &Session,
    request: SubmitRequest,
    wait: Duration,
) -> Result<String, TransportError> {
    let reply = session
        .orderer()
        .request(&GatewayRequest::Submit(request), wait)
        .await?;

    match reply {
        PeerReply::Ack { transaction_id } => Ok(transaction_id),
        PeerReply::Error { message } => Err(TransportError::Orderer(message)),
        other => Err(TransportError::Orderer(format!(
            "unexpected orderer reply: {other:?}"
        ))),
    }
}
