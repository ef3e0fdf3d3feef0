//! End-to-end gateway tests against the in-process ledger network

use std::sync::Arc;
use std::time::Duration;

use fabric_client::{
    Gateway, GatewayError, SemanticError, Session, SessionCache, SessionError, TransportError,
};
use fabric_testnet::TestNetwork;
use fabric_types::{GatewayConfig, NOT_FOUND};

async fn open_gateway(config: GatewayConfig) -> Gateway {
    let session = Session::open(config).await.expect("session bootstrap");
    Gateway::new(session)
}

#[tokio::test]
async fn add_then_get_round_trips() {
    let network = TestNetwork::start(2).await.unwrap();
    let gateway = open_gateway(network.config()).await;

    let receipt = gateway.add("diploma-123", "hash-abc").await.unwrap();
    assert!(!receipt.transaction_id.is_empty());

    let state = gateway.get("diploma-123").await.unwrap();
    assert_eq!(state.entity_state, "hash-abc");
}

#[tokio::test]
async fn duplicate_add_is_entity_already_exists() {
    let network = TestNetwork::start(2).await.unwrap();
    let gateway = open_gateway(network.config()).await;

    gateway.add("diploma-123", "hash-abc").await.unwrap();

    let result = gateway.add("diploma-123", "hash-def").await;
    assert!(matches!(
        result,
        Err(GatewayError::Semantic(SemanticError::EntityAlreadyExists))
    ));
}

#[tokio::test]
async fn delete_of_missing_entity_is_entity_not_found() {
    let network = TestNetwork::start(1).await.unwrap();
    let gateway = open_gateway(network.config()).await;

    let result = gateway.delete("never-added").await;
    assert!(matches!(
        result,
        Err(GatewayError::Semantic(SemanticError::EntityNotFound))
    ));
}

#[tokio::test]
async fn get_of_missing_entity_is_a_successful_not_found() {
    let network = TestNetwork::start(1).await.unwrap();
    let gateway = open_gateway(network.config()).await;

    let state = gateway.get("never-added").await.unwrap();
    assert_eq!(state.entity_state, NOT_FOUND);
}

#[tokio::test]
async fn validation_runs_before_any_network_call() {
    let network = TestNetwork::start(1).await.unwrap();
    let gateway = open_gateway(network.config()).await;

    // With the network gone, only a local rejection can answer this fast.
    network.shutdown();

    let empty_entity = gateway.add("", "x").await;
    assert!(matches!(
        empty_entity,
        Err(GatewayError::Validation(
            fabric_client::ValidationError::EmptyEntityName
        ))
    ));

    let empty_value = gateway.add("e", "").await;
    assert!(matches!(
        empty_value,
        Err(GatewayError::Validation(
            fabric_client::ValidationError::EmptyValue
        ))
    ));
}

#[tokio::test]
async fn zero_responses_is_a_transport_error() {
    let network = TestNetwork::start(2).await.unwrap();
    let gateway = open_gateway(network.config()).await;

    network.shutdown();

    let result = gateway.add("diploma-123", "hash-abc").await;
    match result {
        Err(GatewayError::Transport(_)) => {}
        other => panic!("expected a transport error, got {other:?}"),
    }
    assert!(network.store().is_empty());
}

#[tokio::test]
async fn endorsement_shortfall_is_a_transport_error() {
    let network = TestNetwork::start(1).await.unwrap();
    let mut config = network.config();
    config.min_endorsements = 3;
    let gateway = open_gateway(config).await;

    let result = gateway.add("diploma-123", "hash-abc").await;
    assert!(matches!(
        result,
        Err(GatewayError::Transport(
            TransportError::EndorsementShortfall {
                required: 3,
                got: 1,
            }
        ))
    ));
    // The shortfall blocked submission; nothing reached the ledger.
    assert!(network.store().is_empty());
}

#[tokio::test]
async fn set_rejections_surface_as_ledger_rejections() {
    let network = TestNetwork::start(1).await.unwrap();
    let gateway = open_gateway(network.config()).await;

    let missing = gateway.set("diploma-123", "hash-abc").await;
    assert!(matches!(
        missing,
        Err(GatewayError::Semantic(SemanticError::LedgerRejected(_)))
    ));

    gateway.add("diploma-123", "hash-abc").await.unwrap();
    gateway.set("diploma-123", "hash-def").await.unwrap();
    let state = gateway.get("diploma-123").await.unwrap();
    assert_eq!(state.entity_state, "hash-def");

    let unchanged = gateway.set("diploma-123", "hash-def").await;
    assert!(matches!(
        unchanged,
        Err(GatewayError::Semantic(SemanticError::LedgerRejected(_)))
    ));
}

#[tokio::test]
async fn diploma_scenario_end_to_end() {
    let network = TestNetwork::start(2).await.unwrap();
    let gateway = open_gateway(network.config()).await;

    let receipt = gateway.add("diploma-123", "hash-abc").await.unwrap();
    assert!(!receipt.transaction_id.is_empty());

    let state = gateway.get("diploma-123").await.unwrap();
    assert_eq!(state.entity_state, "hash-abc");

    let duplicate = gateway.add("diploma-123", "hash-def").await;
    assert!(matches!(
        duplicate,
        Err(GatewayError::Semantic(SemanticError::EntityAlreadyExists))
    ));

    gateway.delete("diploma-123").await.unwrap();

    let state = gateway.get("diploma-123").await.unwrap();
    assert_eq!(state.entity_state, NOT_FOUND);
}

#[tokio::test]
async fn commits_are_announced_on_the_event_stream() {
    let network = TestNetwork::start(1).await.unwrap();
    let gateway = open_gateway(network.config()).await;

    let mut events = gateway.session().subscribe_events();
    let receipt = gateway.add("diploma-123", "hash-abc").await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("commit event within a second")
        .expect("event stream open");
    assert_eq!(event.transaction_id, receipt.transaction_id);
}

#[tokio::test]
async fn session_cache_reuses_open_sessions() {
    let network = TestNetwork::start(1).await.unwrap();
    let cache = SessionCache::new();

    let first = cache.get_or_open(network.config()).await.unwrap();
    let second = cache.get_or_open(network.config()).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn wrong_enrollment_secret_fails_bootstrap() {
    let network = TestNetwork::start(1).await.unwrap();
    let mut config = network.config();
    config.identity.secret = "wrong".to_string();

    let result = Session::open(config).await;
    assert!(matches!(
        result,
        Err(GatewayError::Session(SessionError::Enrollment(_)))
    ));
}

#[tokio::test]
async fn malformed_channel_name_fails_bootstrap() {
    let network = TestNetwork::start(1).await.unwrap();
    let mut config = network.config();
    config.channel = "My Channel".to_string();

    let result = Session::open(config).await;
    assert!(matches!(
        result,
        Err(GatewayError::Session(SessionError::BadChannelName(_)))
    ));
}

#[tokio::test]
async fn unreachable_peer_fails_bootstrap() {
    let network = TestNetwork::start(1).await.unwrap();
    let mut config = network.config();
    config.peer_urls.push("ws://127.0.0.1:9".to_string());

    let result = Session::open(config).await;
    assert!(matches!(
        result,
        Err(GatewayError::Session(SessionError::Endpoint { .. }))
    ));
}
