//! Gateway error taxonomy
//!
//! Validation and semantic outcomes are resolved inside the gateway and
//! carry stable codes the HTTP controller maps to transport statuses;
//! session and transport failures propagate with their underlying cause.

use thiserror::Error;

/// Input rejected before any network call
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Empty entity name")]
    EmptyEntityName,

    #[error("Empty value")]
    EmptyValue,
}

/// Session bootstrap failures; fatal to all operations until a new
/// session is opened
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Enrollment failed: {0}")]
    Enrollment(String),

    #[error("Malformed channel name: {0:?}")]
    BadChannelName(String),

    #[error("Endpoint {url} unreachable: {reason}")]
    Endpoint { url: String, reason: String },

    #[error("Credential cache failure: {0}")]
    CredentialCache(String),
}

/// Transport-level failures; the whole operation is safe to retry since
/// no ledger mutation is guaranteed to have occurred
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Wait time of {wait_ms}ms exceeded for {url}")]
    Timeout { url: String, wait_ms: u64 },

    #[error("No peer responses within the wait bound")]
    NoResponses,

    #[error("Only {got} of {required} required endorsements received")]
    EndorsementShortfall { required: usize, got: usize },

    #[error("Link to {url} failed: {reason}")]
    Link { url: String, reason: String },

    #[error("Orderer rejected the submission: {0}")]
    Orderer(String),
}

/// Ledger-level business outcomes; never retryable
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("Entity already exists")]
    EntityAlreadyExists,

    #[error("Entity not found")]
    EntityNotFound,

    /// Reserved for future chaincode versions of delete
    #[error("State already set")]
    StateAlreadySet,

    #[error("Ledger rejected the operation: {0}")]
    LedgerRejected(String),
}

/// Top-level gateway error
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Session bootstrap failed: {0}")]
    Session(#[from] SessionError),

    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error("The query returned no state")]
    QueryFailed,

    #[error("Unclassified ledger error: {0}")]
    Unclassified(String),
}

impl GatewayError {
    /// Stable code the controller maps to a transport status
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Validation(ValidationError::EmptyEntityName) => "EMPTY_ENTITY_NAME",
            GatewayError::Validation(ValidationError::EmptyValue) => "EMPTY_VALUE",
            GatewayError::Session(_) => "SESSION_FAILED",
            GatewayError::Transport(TransportError::NoResponses) => "NO_PEER_RESPONSES",
            GatewayError::Transport(TransportError::EndorsementShortfall { .. }) => {
                "ENDORSEMENT_SHORTFALL"
            }
            GatewayError::Transport(TransportError::Timeout { .. }) => "PROPOSAL_TIMEOUT",
            GatewayError::Transport(_) => "TRANSPORT_FAILED",
            GatewayError::Semantic(SemanticError::EntityAlreadyExists) => "ENTITY_ALREADY_EXISTS",
            GatewayError::Semantic(SemanticError::EntityNotFound) => "ENTITY_NOT_FOUND",
            GatewayError::Semantic(SemanticError::StateAlreadySet) => "STATE_ALREADY_SET",
            GatewayError::Semantic(SemanticError::LedgerRejected(_)) => "LEDGER_REJECTED",
            GatewayError::QueryFailed => "QUERY_FAILED",
            GatewayError::Unclassified(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether retrying the whole operation is safe
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_codes_are_stable() {
        assert_eq!(
            GatewayError::from(ValidationError::EmptyEntityName).code(),
            "EMPTY_ENTITY_NAME"
        );
        assert_eq!(
            GatewayError::from(ValidationError::EmptyValue).code(),
            "EMPTY_VALUE"
        );
    }

    #[test]
    fn only_transport_errors_are_retryable() {
        assert!(GatewayError::from(TransportError::NoResponses).is_retryable());
        assert!(!GatewayError::from(SemanticError::EntityNotFound).is_retryable());
        assert!(!GatewayError::QueryFailed.is_retryable());
    }
}
