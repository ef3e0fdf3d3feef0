//! In-process ledger network wiring

use std::net::SocketAddr;

use ed25519_dalek::VerifyingKey;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use fabric_types::{CommitEvent, GatewayConfig};

use crate::ca::{self, CertificateAuthority};
use crate::event_hub::{self, EventHub};
use crate::net::spawn_listener;
use crate::orderer::{self, OrderingService};
use crate::peer::{self, EndorsingPeer};
use crate::store::LedgerStore;

/// Buffered commit events before subscribers start lagging
const EVENT_BUFFER: usize = 256;

/// A complete ledger network on ephemeral localhost ports: one
/// certificate authority, `peer_count` endorsing peers, an orderer, and
/// an event hub, all sharing one ledger store.
pub struct TestNetwork {
    config: GatewayConfig,
    store: LedgerStore,
    ca_key: VerifyingKey,
    tasks: Vec<JoinHandle<()>>,
    _cache_dir: tempfile::TempDir,
}

impl TestNetwork {
    pub async fn start(peer_count: usize) -> anyhow::Result<Self> {
        let base = GatewayConfig::default();
        let store = LedgerStore::new();
        let (events, _) = broadcast::channel::<CommitEvent>(EVENT_BUFFER);

        let ca = CertificateAuthority::new();
        let ca_key = ca.verifying_key();
        let mut tasks = Vec::new();

        let ca_listener = TcpListener::bind("127.0.0.1:0").await?;
        let ca_url = ws_url(ca_listener.local_addr()?);
        tasks.push(spawn_listener("ca", ca_listener, ca, ca::handle_connection));

        let mut peer_urls = Vec::with_capacity(peer_count);
        for index in 0..peer_count {
            let listener = TcpListener::bind("127.0.0.1:0").await?;
            peer_urls.push(ws_url(listener.local_addr()?));
            let endorser = EndorsingPeer::new(
                &format!("peer{index}"),
                &base.channel,
                &base.chaincode,
                store.clone(),
                ca_key,
            );
            tasks.push(spawn_listener("peer", listener, endorser, peer::handle_connection));
        }

        let orderer_listener = TcpListener::bind("127.0.0.1:0").await?;
        let orderer_url = ws_url(orderer_listener.local_addr()?);
        let ordering = OrderingService::new(&base.channel, store.clone(), events.clone());
        tasks.push(spawn_listener(
            "orderer",
            orderer_listener,
            ordering,
            orderer::handle_connection,
        ));

        let event_listener = TcpListener::bind("127.0.0.1:0").await?;
        let event_url = ws_url(event_listener.local_addr()?);
        tasks.push(spawn_listener(
            "event-hub",
            event_listener,
            EventHub::new(events),
            event_hub::handle_connection,
        ));

        let cache_dir = tempfile::tempdir()?;
        let config = GatewayConfig {
            ca_url,
            peer_urls,
            orderer_url,
            event_url,
            cache_dir: cache_dir.path().to_path_buf(),
            ..base
        };

        tracing::info!(
            channel = %config.channel,
            peers = peer_count,
            "Ledger network started"
        );

        Ok(Self {
            config,
            store,
            ca_key,
            tasks,
            _cache_dir: cache_dir,
        })
    }

    /// Connection configuration pointing at this network
    pub fn config(&self) -> GatewayConfig {
        self.config.clone()
    }

    /// Direct handle on the shared ledger state
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn ca_key(&self) -> VerifyingKey {
        self.ca_key
    }

    /// Stop every endpoint; established gateway links start failing
    pub fn shutdown(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for TestNetwork {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn ws_url(addr: SocketAddr) -> String {
    format!("ws://{addr}")
}
