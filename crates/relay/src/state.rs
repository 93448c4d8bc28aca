// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use spoolrelay_wire::{EventBus, FrameSender};
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::model::{Client, PrinterMap};
use crate::registry::{policy_from_config, OriginPolicy, SessionRegistry};
use crate::store::JobStore;

/// Shared relay state, owned by the server and handed to handlers and
/// pollers as `Arc<RelayState>`.
pub struct RelayState {
    pub config: RelayConfig,
    pub shutdown: CancellationToken,
    pub store: Arc<dyn JobStore>,
    pub origins: Arc<dyn OriginPolicy>,
    pub registry: SessionRegistry,
    /// Envelope events reported by agents, re-exposed on `/ws/events`.
    pub bus: EventBus,
}

impl RelayState {
    pub fn new(config: RelayConfig, store: Arc<dyn JobStore>, shutdown: CancellationToken) -> Self {
        let origins = policy_from_config(&config.allowed_origins);
        Self {
            config,
            shutdown,
            store,
            origins,
            registry: SessionRegistry::new(),
            bus: EventBus::default(),
        }
    }

    pub fn with_origin_policy(mut self, policy: Arc<dyn OriginPolicy>) -> Self {
        self.origins = policy;
        self
    }
}

/// A live session: one connected agent, its socket writer, and the sites it
/// may poll.
pub struct SessionEntry {
    pub session_id: String,
    pub client: Client,
    pub printers: PrinterMap,
    pub outbound: FrameSender,
    /// Cancelled on unregister, eviction, or server shutdown.
    pub cancel: CancellationToken,
    pub registered_at: Instant,
    dispatched: AtomicU64,
}

impl SessionEntry {
    pub fn new(
        client: Client,
        outbound: FrameSender,
        cancel: CancellationToken,
    ) -> Self {
        let printers = PrinterMap::build(&client);
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            client,
            printers,
            outbound,
            cancel,
            registered_at: Instant::now(),
            dispatched: AtomicU64::new(0),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.client.identifier
    }

    pub fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }
}
