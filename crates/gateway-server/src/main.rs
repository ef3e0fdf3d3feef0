//! Fabric gateway server
//!
//! HTTP front for key/entity transactions against a permissioned ledger.
//! Bootstraps one channel session at startup and serves the four
//! operations over REST. `--embedded-net` starts an in-process ledger
//! network for local development instead of connecting to a real one.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fabric_client::{Gateway, SessionCache};
use fabric_testnet::TestNetwork;
use fabric_types::GatewayConfig;

mod http;

/// Ledger transaction gateway
#[derive(Parser, Debug)]
#[command(name = "fabric-gateway")]
#[command(about = "HTTP gateway for key/entity transactions on a permissioned ledger", long_about = None)]
struct Args {
    /// HTTP bind address
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Path to a JSON gateway configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start an in-process ledger network instead of connecting out
    #[arg(long)]
    embedded_net: bool,

    /// Endorsing peer count for the embedded network
    #[arg(long, default_value = "2")]
    embedded_peers: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // The embedded network must outlive the session using it.
    let (config, _embedded) = if args.embedded_net {
        let network = TestNetwork::start(args.embedded_peers).await?;
        tracing::info!(
            peers = args.embedded_peers,
            "Embedded ledger network started"
        );
        (network.config(), Some(network))
    } else {
        (load_config(args.config.as_deref())?, None)
    };

    tracing::info!(
        channel = %config.channel,
        chaincode = %config.chaincode,
        "Bootstrapping session"
    );

    let sessions = SessionCache::new();
    let session = sessions.get_or_open(config).await?;
    let gateway = Arc::new(Gateway::new(session));

    let app = http::router(gateway);
    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    tracing::info!("HTTP gateway listening on {}", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        })
        .await?;

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<GatewayConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let config = serde_json::from_str(&raw)?;
            tracing::info!("Loaded gateway configuration from {path:?}");
            Ok(config)
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Ok(GatewayConfig::default())
        }
    }
}
