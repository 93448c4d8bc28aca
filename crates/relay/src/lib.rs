// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! spoolrelay: forwards pending print jobs from a shared store to connected
//! print agents and re-publishes what the agents report.

pub mod config;
pub mod error;
pub mod model;
pub mod poller;
pub mod registry;
pub mod state;
pub mod store;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::state::RelayState;
use crate::store::SqliteStore;
use crate::transport::build_router;

/// Run the relay until ctrl-c.
pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let shutdown = CancellationToken::new();

    let store = Arc::new(SqliteStore::connect(&config.database, config.database_max_connections).await?);
    let state = Arc::new(RelayState::new(config, store.clone(), shutdown.clone()));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
            }
            shutdown.cancel();
        });
    }

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        subprotocol = %state.config.subprotocol,
        poll_ms = state.config.poll_ms,
        "spoolrelay listening on {addr}"
    );
    serve(state, listener).await?;

    store.close().await;
    Ok(())
}

/// Serve the relay routes on `listener` until the state's shutdown token
/// fires.
pub async fn serve(state: Arc<RelayState>, listener: TcpListener) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    let router = build_router(state);
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;
    Ok(())
}
