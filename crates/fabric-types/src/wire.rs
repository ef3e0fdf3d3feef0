//! Wire protocol between the gateway and ledger network endpoints
//!
//! Every frame is one borsh-encoded message over a WebSocket binary frame.
//! Peers, the orderer, the event hub, and the certificate authority all
//! speak the same envelope; each endpoint answers the subset it serves.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::enrollment::{EnrollmentCertificate, EnrollmentRequest};
use crate::proposal::{PeerResponse, SignedProposal, WriteOp};

/// Requests the gateway sends to network endpoints
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub enum GatewayRequest {
    /// Enroll an identity with the certificate authority
    Enroll(EnrollmentRequest),

    /// Ask a peer to endorse a mutating proposal
    Endorse(SignedProposal),

    /// Ask a peer to execute a read-only query
    Query(SignedProposal),

    /// Submit an endorsed transaction to the ordering service
    Submit(SubmitRequest),

    /// Subscribe to committed-transaction events for a channel
    Subscribe { channel: String },
}

/// Endorsed transaction forwarded to the orderer
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct SubmitRequest {
    pub channel: String,
    pub transaction_id: String,
    /// Write set captured during endorsement simulation
    pub write_set: Vec<WriteOp>,
}

/// A peer's endorsement: the response plus the simulated write set
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct Endorsement {
    pub response: PeerResponse,
    pub write_set: Vec<WriteOp>,
}

/// Event emitted by the event hub when a transaction commits
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct CommitEvent {
    pub channel: String,
    pub transaction_id: String,
    /// Event name registered by the chaincode
    pub name: String,
    pub payload: Vec<u8>,
}

/// Replies from network endpoints
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub enum PeerReply {
    /// Certificate issued by the authority
    Enrolled(EnrollmentCertificate),

    /// Endorsement of a mutating proposal
    Endorsement(Endorsement),

    /// Result of a read-only query
    QueryResult(PeerResponse),

    /// Orderer accepted the endorsed transaction
    Ack { transaction_id: String },

    /// Committed-transaction event
    Event(CommitEvent),

    /// Endpoint-level failure
    Error { message: String },
}

impl GatewayRequest {
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("GatewayRequest serialization should not fail")
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, borsh::io::Error> {
        borsh::from_slice(data)
    }
}

impl PeerReply {
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("PeerReply serialization should not fail")
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, borsh::io::Error> {
        borsh::from_slice(data)
    }
}
