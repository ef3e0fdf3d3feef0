//! Peer-response reconciliation
//!
//! Walks the responses in arrival order, classifying each payload
//! against the operation kind's sentinel table. The first semantic
//! classification becomes the operation's failure; otherwise the first
//! response is authoritative and the rest are confirmation only, unless
//! a higher minimum endorsement count is configured.

use fabric_types::{PeerResponse, ALREADY_EXIST, NOT_FOUND, STATE_ALREADY_SET};

use crate::error::{GatewayError, SemanticError, TransportError};

/// The four chaincode operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Add,
    Delete,
    Get,
    Set,
}

/// How a sentinel payload surfaces for a given operation kind
#[derive(Debug, Clone, Copy)]
enum Classified {
    AlreadyExists,
    NotFound,
    StateAlreadySet,
    /// Sentinels the operation has no dedicated outcome for
    Rejected,
}

type Rule = (&'static str, Classified);

const ADD_RULES: &[Rule] = &[(ALREADY_EXIST, Classified::AlreadyExists)];
const DELETE_RULES: &[Rule] = &[
    (NOT_FOUND, Classified::NotFound),
    (STATE_ALREADY_SET, Classified::StateAlreadySet),
];
const GET_RULES: &[Rule] = &[(NOT_FOUND, Classified::NotFound)];
const SET_RULES: &[Rule] = &[
    (NOT_FOUND, Classified::Rejected),
    (STATE_ALREADY_SET, Classified::Rejected),
];

fn rules(kind: OperationKind) -> &'static [Rule] {
    match kind {
        OperationKind::Add => ADD_RULES,
        OperationKind::Delete => DELETE_RULES,
        OperationKind::Get => GET_RULES,
        OperationKind::Set => SET_RULES,
    }
}

fn semantic_error(class: Classified, payload: &str) -> SemanticError {
    match class {
        Classified::AlreadyExists => SemanticError::EntityAlreadyExists,
        Classified::NotFound => SemanticError::EntityNotFound,
        Classified::StateAlreadySet => SemanticError::StateAlreadySet,
        Classified::Rejected => SemanticError::LedgerRejected(payload.to_string()),
    }
}

/// The agreed outcome of one response set
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// Transaction identifier of the authoritative response
    pub transaction_id: String,
    /// Payload of the authoritative response
    pub payload: Vec<u8>,
}

/// Reduce a response collection to a single outcome.
///
/// An empty collection is a transport failure, never a semantic one.
pub fn reconcile(
    responses: &[PeerResponse],
    kind: OperationKind,
    min_endorsements: usize,
) -> Result<Reconciled, GatewayError> {
    if responses.is_empty() {
        return Err(TransportError::NoResponses.into());
    }

    let table = rules(kind);
    for response in responses {
        let payload = response.payload_str();
        if let Some((_, class)) = table.iter().find(|(sentinel, _)| *sentinel == payload) {
            tracing::debug!(
                endorser = %response.endorser,
                %payload,
                "Semantic outcome from peer"
            );
            return Err(semantic_error(*class, &payload).into());
        }
    }

    if responses.len() < min_endorsements {
        return Err(TransportError::EndorsementShortfall {
            required: min_endorsements,
            got: responses.len(),
        }
        .into());
    }

    let authoritative = &responses[0];
    Ok(Reconciled {
        transaction_id: authoritative.transaction_id.clone(),
        payload: authoritative.payload.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(payload: &str, transaction_id: &str) -> PeerResponse {
        PeerResponse {
            endorser: "peer0".to_string(),
            status: fabric_types::STATUS_SUCCESS,
            payload: payload.as_bytes().to_vec(),
            transaction_id: transaction_id.to_string(),
        }
    }

    #[test]
    fn empty_collection_is_a_transport_error() {
        let result = reconcile(&[], OperationKind::Add, 1);
        assert!(matches!(
            result,
            Err(GatewayError::Transport(TransportError::NoResponses))
        ));
    }

    #[test]
    fn first_semantic_classification_wins() {
        let responses = vec![response("", "tx-1"), response(ALREADY_EXIST, "tx-1")];
        let result = reconcile(&responses, OperationKind::Add, 1);
        assert!(matches!(
            result,
            Err(GatewayError::Semantic(SemanticError::EntityAlreadyExists))
        ));
    }

    #[test]
    fn add_ignores_not_found() {
        // NOT_FOUND is not a sentinel for add; it would be a stored value
        let responses = vec![response(NOT_FOUND, "tx-2")];
        let reconciled = reconcile(&responses, OperationKind::Add, 1).unwrap();
        assert_eq!(reconciled.transaction_id, "tx-2");
    }

    #[test]
    fn delete_maps_not_found() {
        let responses = vec![response(NOT_FOUND, "tx-3")];
        let result = reconcile(&responses, OperationKind::Delete, 1);
        assert!(matches!(
            result,
            Err(GatewayError::Semantic(SemanticError::EntityNotFound))
        ));
    }

    #[test]
    fn set_sentinels_surface_as_generic_rejections() {
        for payload in [NOT_FOUND, STATE_ALREADY_SET] {
            let result = reconcile(&[response(payload, "tx-4")], OperationKind::Set, 1);
            match result {
                Err(GatewayError::Semantic(SemanticError::LedgerRejected(detail))) => {
                    assert_eq!(detail, payload);
                }
                other => panic!("expected a ledger rejection, got {other:?}"),
            }
        }
    }

    #[test]
    fn first_response_is_authoritative() {
        let responses = vec![response("hash-abc", "tx-5"), response("hash-def", "tx-6")];
        let reconciled = reconcile(&responses, OperationKind::Get, 1).unwrap();
        assert_eq!(reconciled.transaction_id, "tx-5");
        assert_eq!(reconciled.payload, b"hash-abc");
    }

    #[test]
    fn shortfall_is_a_transport_error() {
        let responses = vec![response("", "tx-7")];
        let result = reconcile(&responses, OperationKind::Add, 2);
        assert!(matches!(
            result,
            Err(GatewayError::Transport(TransportError::EndorsementShortfall {
                required: 2,
                got: 1,
            }))
        ));
    }
}
