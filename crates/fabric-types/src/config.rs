//! Gateway configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identity enrolled at session bootstrap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Identity name
    pub name: String,
    /// Enrollment secret
    pub secret: String,
    /// Organisation affiliation
    pub affiliation: String,
    /// Membership service provider id
    pub msp_id: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name: "admin".to_string(),
            secret: "adminpw".to_string(),
            affiliation: "org1".to_string(),
            msp_id: "Org1MSP".to_string(),
        }
    }
}

/// Connection configuration for one channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Identity to enroll
    pub identity: IdentityConfig,
    /// Channel name
    pub channel: String,
    /// Target chaincode name
    pub chaincode: String,
    /// Certificate authority endpoint
    pub ca_url: String,
    /// Endorsing peer endpoints
    pub peer_urls: Vec<String>,
    /// Ordering service endpoint
    pub orderer_url: String,
    /// Event hub endpoint
    pub event_url: String,
    /// Endorsement wait bound in milliseconds
    pub proposal_wait_ms: u64,
    /// Minimum number of agreeing endorsements for a mutation
    pub min_endorsements: usize,
    /// Directory for the on-disk credential cache
    pub cache_dir: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            identity: IdentityConfig::default(),
            channel: "mychannel".to_string(),
            chaincode: "simple-chaincode".to_string(),
            ca_url: "ws://127.0.0.1:7054".to_string(),
            peer_urls: vec!["ws://127.0.0.1:7051".to_string()],
            orderer_url: "ws://127.0.0.1:7050".to_string(),
            event_url: "ws://127.0.0.1:7053".to_string(),
            proposal_wait_ms: 1000,
            min_endorsements: 1,
            cache_dir: PathBuf::from("./data/credentials"),
        }
    }
}

impl GatewayConfig {
    /// Endorsement wait bound as a [`Duration`]
    pub fn proposal_wait(&self) -> Duration {
        Duration::from_millis(self.proposal_wait_ms)
    }

    /// Cache key for the enrolled identity on this channel
    pub fn identity_key(&self) -> String {
        format!("{}@{}", self.identity.name, self.channel)
    }
}
