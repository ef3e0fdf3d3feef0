//! Channel session bootstrap
//!
//! A [`Session`] owns the enrolled identity and one link per network
//! endpoint. Bootstrap is all-or-nothing: any endpoint failure tears
//! down everything already opened. Sessions are expensive; open one per
//! identity+channel and share it via `Arc` — nothing in it is mutated
//! after bootstrap, and each link serializes its own traffic, so one
//! session handles concurrent operation calls safely.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use fabric_types::{CommitEvent, GatewayConfig};

use crate::error::{GatewayError, SessionError};
use crate::identity::{CaClient, CredentialCache, EnrolledIdentity};
use crate::link::{EventLink, PeerLink};

/// Buffered commit events before slow subscribers start lagging
const EVENT_BUFFER: usize = 256;

/// A bootstrapped channel session
pub struct Session {
    config: GatewayConfig,
    identity: EnrolledIdentity,
    peers: Vec<PeerLink>,
    orderer: PeerLink,
    events: broadcast::Sender<CommitEvent>,
    event_link: EventLink,
}

impl Session {
    /// Enroll the identity and attach every channel endpoint
    pub async fn open(config: GatewayConfig) -> Result<Arc<Self>, GatewayError> {
        validate_channel_name(&config.channel)?;
        if config.peer_urls.is_empty() {
            return Err(SessionError::Endpoint {
                url: String::new(),
                reason: "no endorsing peers configured".to_string(),
            }
            .into());
        }

        let wait = config.proposal_wait();
        let identity = enroll_or_load(&config).await?;

        let mut peers: Vec<PeerLink> = Vec::with_capacity(config.peer_urls.len());
        for url in &config.peer_urls {
            match PeerLink::connect(url, wait).await {
                Ok(link) => peers.push(link),
                Err(e) => {
                    teardown(&peers, None);
                    return Err(e.into());
                }
            }
        }

        let orderer = match PeerLink::connect(&config.orderer_url, wait).await {
            Ok(link) => link,
            Err(e) => {
                teardown(&peers, None);
                return Err(e.into());
            }
        };

        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let event_link =
            match EventLink::subscribe(&config.event_url, &config.channel, wait, events.clone())
                .await
            {
                Ok(link) => link,
                Err(e) => {
                    teardown(&peers, Some(&orderer));
                    return Err(e.into());
                }
            };

        tracing::info!(
            channel = %config.channel,
            chaincode = %config.chaincode,
            peers = peers.len(),
            "Session ready"
        );

        Ok(Arc::new(Self {
            config,
            identity,
            peers,
            orderer,
            events,
            event_link,
        }))
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn identity(&self) -> &EnrolledIdentity {
        &self.identity
    }

    pub(crate) fn peers(&self) -> &[PeerLink] {
        &self.peers
    }

    pub(crate) fn orderer(&self) -> &PeerLink {
        &self.orderer
    }

    /// Committed-transaction events for this channel
    pub fn subscribe_events(&self) -> broadcast::Receiver<CommitEvent> {
        self.events.subscribe()
    }

    /// Tear down every link; in-flight requests fail with a link error
    pub fn close(&self) {
        teardown(&self.peers, Some(&self.orderer));
        self.event_link.abort();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

fn teardown(peers: &[PeerLink], orderer: Option<&PeerLink>) {
    for link in peers {
        link.abort();
    }
    if let Some(link) = orderer {
        link.abort();
    }
}

async fn enroll_or_load(config: &GatewayConfig) -> Result<EnrolledIdentity, GatewayError> {
    let cache = CredentialCache::open(&config.cache_dir)?;
    let key = config.identity_key();

    if let Some(identity) = cache.load(&key)? {
        tracing::debug!(%key, "Reusing cached enrollment");
        return Ok(identity);
    }

    // Stale or corrupt credentials must not survive a re-enrollment.
    cache.clear(&key)?;
    let identity = CaClient::new(&config.ca_url, config.proposal_wait())
        .enroll(&config.identity)
        .await?;
    cache.store(&key, &identity)?;
    Ok(identity)
}

fn validate_channel_name(name: &str) -> Result<(), SessionError> {
    let well_formed = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-');
    if well_formed {
        Ok(())
    } else {
        Err(SessionError::BadChannelName(name.to_string()))
    }
}

/// Explicitly owned cache of open sessions, keyed identity+channel.
///
/// Opening a session twice through the cache is idempotent and never
/// corrupts an existing one.
#[derive(Default)]
pub struct SessionCache {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached session for the config's identity+channel, or
    /// bootstrap one
    pub async fn get_or_open(&self, config: GatewayConfig) -> Result<Arc<Session>, GatewayError> {
        let key = config.identity_key();
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(&key) {
            return Ok(session.clone());
        }
        let session = Session::open(config).await?;
        sessions.insert(key, session.clone());
        Ok(session)
    }

    /// Drop a session (e.g. after a fatal session error) so the next
    /// call bootstraps a fresh one
    pub async fn evict(&self, key: &str) -> Option<Arc<Session>> {
        self.sessions.lock().await.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_are_validated() {
        assert!(validate_channel_name("mychannel").is_ok());
        assert!(validate_channel_name("my-channel.v2").is_ok());
        assert!(validate_channel_name("").is_err());
        assert!(validate_channel_name("MyChannel").is_err());
        assert!(validate_channel_name("my channel").is_err());
    }
}
