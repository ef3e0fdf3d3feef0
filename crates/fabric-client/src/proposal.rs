//! Proposal construction
//!
//! Pure construction, no network I/O. Every proposal carries the fixed
//! request-tracing envelope and the session's wait bound unless
//! overridden.

use std::time::Duration;

use rand::RngCore;

use fabric_types::proposal::tracing_envelope;
use fabric_types::{Proposal, SignedProposal};

use crate::session::Session;

/// Builds signed proposals against one session's channel and chaincode
pub struct ProposalBuilder<'a> {
    session: &'a Session,
    wait: Duration,
}

impl<'a> ProposalBuilder<'a> {
    pub fn new(session: &'a Session) -> Self {
        let wait = session.config().proposal_wait();
        Self { session, wait }
    }

    /// Override the endorsement wait bound for this proposal
    pub fn wait_time(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Build an unsigned proposal; argument order is preserved
    pub fn build(&self, function: &str, args: Vec<String>) -> Proposal {
        let config = self.session.config();
        let mut nonce = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        Proposal::new(
            config.channel.clone(),
            config.chaincode.clone(),
            function.to_string(),
            args,
            tracing_envelope(),
            self.wait.as_millis() as u64,
            nonce,
        )
    }

    /// Build and sign with the session identity
    pub fn build_signed(&self, function: &str, args: Vec<String>) -> SignedProposal {
        let identity = self.session.identity();
        SignedProposal::sign(
            self.build(function, args),
            &identity.signing_key,
            identity.certificate.clone(),
        )
    }
}
