//! `relay-rs`: the matching-and-fanout engine and per-connection protocol
//! state machine for a Nostr relay.

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod filter;
pub mod http;
pub mod logging;
pub mod pool;
pub mod registry;
pub mod relay;
pub mod store;
pub mod subscription;
pub mod wire;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::cli::ServeArgs;
use crate::config::{RelayConfig, RelayInfoConfig};
use crate::pool::ConnectionPool;
use crate::registry::SubscriptionRegistry;
use crate::relay::RelayService;
use crate::store::{EventStore, PostgresStore};

/// Process-wide shared state: the registry, the pool, and the relay
/// information document, constructed once at startup and shared by
/// reference with every connection driver (§9: no ambient globals).
pub struct AppState {
    pub relay: Arc<RelayService>,
    pub pool: Arc<ConnectionPool>,
    pub relay_info: RelayInfoConfig,
}

/// Wires the store, registry, pool, and relay service, then serves the
/// Axum router until a shutdown signal arrives. Returns an error on
/// startup failure (unreachable store, missing config), matching the
/// exit-code-1 contract in the spec's CLI surface.
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = RelayConfig::load(&args.config).context("loading relay config")?;
    let database_url = config.resolve_database_url()?;

    let pg_pool = PgPoolOptions::new()
        .max_connections(50)
        .connect(&database_url)
        .await
        .context("connecting to the event store database")?;

    let store = PostgresStore::new(pg_pool);
    store.ensure_schema().await.context("ensuring event store schema")?;
    let store: Arc<dyn EventStore> = Arc::new(store);

    let registry = Arc::new(SubscriptionRegistry::new());
    let pool = Arc::new(ConnectionPool::new());
    let relay = Arc::new(RelayService::new(store, registry, pool.clone()));

    let state = Arc::new(AppState {
        relay,
        pool,
        relay_info: config.relay_info,
    });

    let app = http::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding listener on {addr}"))?;

    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving connections")?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
