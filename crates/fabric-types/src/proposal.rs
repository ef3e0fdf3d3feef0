//! Transaction proposals and per-peer responses

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Duration;

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{Signature, Signer, SigningKey};

use crate::enrollment::{CertificateError, EnrollmentCertificate};

/// Transient map key identifying the SDK that built the proposal.
pub const TRANSIENT_SDK_KEY: &str = "HyperLedgerFabric";
/// Transient map key naming the request method.
pub const TRANSIENT_METHOD_KEY: &str = "method";
/// Transient map key for the expected result marker.
pub const TRANSIENT_RESULT_KEY: &str = "result";
/// Transient map key for the expected commit event name.
pub const TRANSIENT_EVENT_KEY: &str = "event";

pub const TRANSIENT_SDK_VALUE: &[u8] = b"TransactionProposalRequest:JavaSDK";
pub const TRANSIENT_METHOD_VALUE: &[u8] = b"TransactionProposalRequest";
pub const TRANSIENT_RESULT_VALUE: &[u8] = b":)";
pub const TRANSIENT_EVENT_VALUE: &[u8] = b"!";

/// Fixed request-tracing envelope attached identically to every proposal.
///
/// Keys and values are wire contract: deployed event listeners match on
/// them byte for byte, so they carry no business data and never vary per
/// operation.
pub fn tracing_envelope() -> BTreeMap<String, Vec<u8>> {
    let mut transient = BTreeMap::new();
    transient.insert(TRANSIENT_SDK_KEY.to_string(), TRANSIENT_SDK_VALUE.to_vec());
    transient.insert(TRANSIENT_METHOD_KEY.to_string(), TRANSIENT_METHOD_VALUE.to_vec());
    transient.insert(TRANSIENT_RESULT_KEY.to_string(), TRANSIENT_RESULT_VALUE.to_vec());
    transient.insert(TRANSIENT_EVENT_KEY.to_string(), TRANSIENT_EVENT_VALUE.to_vec());
    transient
}

/// An unconfirmed request to execute a chaincode function.
///
/// Immutable once built; argument order is significant and must match the
/// target chaincode's positional contract.
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct Proposal {
    /// Channel the proposal is bound to
    pub channel: String,
    /// Target chaincode name
    pub chaincode: String,
    /// Chaincode function (`add`, `delete`, `get`, `set`)
    pub function: String,
    /// Positional arguments
    pub args: Vec<String>,
    /// Request-tracing envelope (not business data)
    pub transient: BTreeMap<String, Vec<u8>>,
    /// Wait bound for endorsement, in milliseconds
    pub wait_ms: u64,
    /// Client nonce making the transaction id unique per call
    pub nonce: [u8; 32],
    /// Derived transaction identifier
    pub transaction_id: String,
}

impl Proposal {
    pub fn new(
        channel: String,
        chaincode: String,
        function: String,
        args: Vec<String>,
        transient: BTreeMap<String, Vec<u8>>,
        wait_ms: u64,
        nonce: [u8; 32],
    ) -> Self {
        let transaction_id = derive_transaction_id(&channel, &chaincode, &function, &args, &nonce);
        Self {
            channel,
            chaincode,
            function,
            args,
            transient,
            wait_ms,
            nonce,
            transaction_id,
        }
    }

    /// Digest covering every field, signed by the submitting identity
    pub fn digest(&self) -> [u8; 32] {
        let bytes = borsh::to_vec(self).expect("Proposal serialization should not fail");
        *blake3::hash(&bytes).as_bytes()
    }

    /// Endorsement wait bound as a [`Duration`]
    pub fn wait_time(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

fn derive_transaction_id(
    channel: &str,
    chaincode: &str,
    function: &str,
    args: &[String],
    nonce: &[u8; 32],
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(nonce);
    hasher.update(channel.as_bytes());
    hasher.update(chaincode.as_bytes());
    hasher.update(function.as_bytes());
    for arg in args {
        hasher.update(arg.as_bytes());
    }
    bs58::encode(hasher.finalize().as_bytes()).into_string()
}

/// A proposal plus the signature and certificate of the submitting identity
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct SignedProposal {
    pub proposal: Proposal,
    /// ed25519 signature over the proposal digest
    pub signature: Vec<u8>,
    /// Enrollment certificate of the signer
    pub certificate: EnrollmentCertificate,
}

impl SignedProposal {
    /// Sign `proposal` with the enrolled identity key
    pub fn sign(proposal: Proposal, key: &SigningKey, certificate: EnrollmentCertificate) -> Self {
        let signature = key.sign(&proposal.digest());
        Self {
            proposal,
            signature: signature.to_bytes().to_vec(),
            certificate,
        }
    }

    /// Verify the signature against the certificate's public key
    pub fn verify(&self) -> Result<(), CertificateError> {
        let key = self.certificate.verifying_key()?;
        let bytes: [u8; 64] = self
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| CertificateError::MalformedSignature)?;
        key.verify_strict(&self.proposal.digest(), &Signature::from_bytes(&bytes))
            .map_err(|_| CertificateError::BadSignature)
    }
}

/// A single ledger write produced by chaincode simulation.
///
/// `value: None` deletes the key.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct WriteOp {
    pub key: String,
    pub value: Option<String>,
}

/// One endorsing peer's reply to a proposal
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct PeerResponse {
    /// Endpoint that produced the response
    pub endorser: String,
    /// Chaincode response status
    pub status: u16,
    /// Raw chaincode payload bytes
    pub payload: Vec<u8>,
    /// Transaction identifier echoed from the proposal
    pub transaction_id: String,
}

impl PeerResponse {
    /// Payload decoded as UTF-8 text for classification
    pub fn payload_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(nonce: [u8; 32], args: &[&str]) -> Proposal {
        Proposal::new(
            "mychannel".to_string(),
            "simple-chaincode".to_string(),
            "add".to_string(),
            args.iter().map(|a| a.to_string()).collect(),
            tracing_envelope(),
            1000,
            nonce,
        )
    }

    #[test]
    fn transaction_id_depends_on_nonce() {
        let a = sample([1u8; 32], &["diploma-123", "hash-abc"]);
        let b = sample([2u8; 32], &["diploma-123", "hash-abc"]);
        assert_ne!(a.transaction_id, b.transaction_id);
    }

    #[test]
    fn transaction_id_depends_on_argument_order() {
        let a = sample([7u8; 32], &["x", "y"]);
        let b = sample([7u8; 32], &["y", "x"]);
        assert_ne!(a.transaction_id, b.transaction_id);
    }

    #[test]
    fn tracing_envelope_is_fixed() {
        let transient = tracing_envelope();
        assert_eq!(transient.len(), 4);
        assert_eq!(
            transient.get(TRANSIENT_SDK_KEY).map(Vec::as_slice),
            Some(TRANSIENT_SDK_VALUE)
        );
        assert_eq!(
            transient.get(TRANSIENT_EVENT_KEY).map(Vec::as_slice),
            Some(b"!".as_slice())
        );
    }
}
