// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! spoolagent: connects to a spoolrelay server and prints the jobs it
//! dispatches.

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod identity;
pub mod print;

use std::sync::Arc;

use spoolrelay_wire::{frame_channel, ConnectionError, EventBus, Subscription};
use tokio_util::sync::CancellationToken;

use crate::config::AgentConfig;
use crate::connection::{AgentLink, Reconnector};
use crate::executor::{ExecutorConfig, PrintExecutor};
use crate::print::{LpSubsystem, PrintSubsystem};

/// Run the agent until ctrl-c or until reconnects are exhausted.
pub async fn run(config: AgentConfig) -> anyhow::Result<()> {
    let identifier = identity::resolve(config.identifier.as_deref())?;
    let spool_dir = config.spool_dir();
    std::fs::create_dir_all(&spool_dir)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
            }
            cancel.cancel();
        });
    }

    tracing::info!(
        identifier = %identifier,
        server = %config.server_url,
        spool_dir = %spool_dir.display(),
        "spoolagent starting"
    );
    let subsystem = Arc::new(LpSubsystem::new(config.print_program.clone()));
    run_with(&config, identifier, subsystem, cancel).await?;
    Ok(())
}

/// Run the agent with an explicit identifier and print subsystem.
pub async fn run_with(
    config: &AgentConfig,
    identifier: String,
    subsystem: Arc<dyn PrintSubsystem>,
    cancel: CancellationToken,
) -> Result<(), ConnectionError> {
    let (reports, mut report_rx) = frame_channel(config.report_capacity);
    let executor_config = ExecutorConfig {
        workers: config.workers,
        queue_capacity: config.queue_capacity,
        spool_dir: config.spool_dir(),
    };
    let (executor, executor_handle) =
        PrintExecutor::spawn(executor_config, subsystem, reports, cancel.child_token());

    let bus = EventBus::default();
    spawn_event_logger(bus.subscribe(), cancel.clone());

    let link = AgentLink {
        url: config.server_url.clone(),
        subprotocol: config.subprotocol.clone(),
        identifier,
        executor,
        bus,
    };
    let machine = Reconnector::new(config.retry_delay(), config.max_retries);
    let result = connection::run(&link, &mut report_rx, machine, cancel.clone()).await;

    cancel.cancel();
    drop(link);
    let _ = executor_handle.await;
    result
}

fn spawn_event_logger(mut sub: Subscription, cancel: CancellationToken) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = sub.recv() => {
                    let Some(event) = event else { break };
                    tracing::info!(event = %event.event.name(), data = %event.event.data(), "relay event");
                }
            }
        }
    });
}
