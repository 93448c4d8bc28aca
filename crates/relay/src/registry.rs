// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session registry: connected identifier → socket writer and sites.
//!
//! At most one session exists per identifier. A second registration under
//! the same identifier evicts the first: its poller is stopped and its
//! socket is closed before the new session starts polling, so two pollers
//! never claim jobs for the same sites.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use spoolrelay_wire::FrameSender;
use tokio::sync::RwLock;

use crate::model::Client;
use crate::poller::spawn_job_poller;
use crate::state::{RelayState, SessionEntry};
use crate::store::StorageError;

/// Decides whether a connection's declared origin may register.
pub trait OriginPolicy: Send + Sync {
    fn allows(&self, origin: &str) -> bool;
}

/// Accepts every origin.
pub struct AllowAll;

impl OriginPolicy for AllowAll {
    fn allows(&self, _origin: &str) -> bool {
        true
    }
}

/// Accepts only the listed origins.
pub struct AllowList {
    origins: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { origins: origins.into_iter().map(Into::into).collect() }
    }
}

impl OriginPolicy for AllowList {
    fn allows(&self, origin: &str) -> bool {
        self.origins.contains(origin)
    }
}

impl<F> OriginPolicy for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn allows(&self, origin: &str) -> bool {
        self(origin)
    }
}

/// Allow-list from configuration; an empty list allows everything.
pub fn policy_from_config(origins: &[String]) -> Arc<dyn OriginPolicy> {
    let origins: Vec<&str> =
        origins.iter().map(|o| o.trim()).filter(|o| !o.is_empty()).collect();
    if origins.is_empty() {
        Arc::new(AllowAll)
    } else {
        Arc::new(AllowList::new(origins))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("origin rejected: {0}")]
    OriginRejected(String),
    #[error("missing client identifier")]
    MissingIdentifier,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Serializable snapshot for the sessions API.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub identifier: String,
    pub session_id: String,
    pub sites: Vec<String>,
    pub printers: usize,
    pub dispatched: u64,
    pub connected_secs: u64,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `entry`, returning the session it replaced, if any.
    pub async fn insert(&self, entry: Arc<SessionEntry>) -> Option<Arc<SessionEntry>> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(entry.identifier().to_owned(), entry)
    }

    /// Remove the mapping for `identifier` only if it still points at
    /// `session_id`. Returns whether anything was removed.
    pub async fn remove_if_current(&self, identifier: &str, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(identifier) {
            Some(entry) if entry.session_id == session_id => {
                sessions.remove(identifier);
                true
            }
            _ => false,
        }
    }

    pub async fn get(&self, identifier: &str) -> Option<Arc<SessionEntry>> {
        self.sessions.read().await.get(identifier).map(Arc::clone)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        let mut out: Vec<SessionInfo> = sessions
            .values()
            .map(|e| SessionInfo {
                identifier: e.identifier().to_owned(),
                session_id: e.session_id.clone(),
                sites: e.client.site_aliases(),
                printers: e.printers.len(),
                dispatched: e.dispatched(),
                connected_secs: e.registered_at.elapsed().as_secs(),
            })
            .collect();
        out.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        out
    }
}

/// Register a connected agent: check its origin, load its sites and
/// printers, install the session and start its job poller.
pub async fn register(
    state: &Arc<RelayState>,
    identifier: &str,
    origin: &str,
    outbound: FrameSender,
) -> Result<Arc<SessionEntry>, RegisterError> {
    if identifier.is_empty() {
        return Err(RegisterError::MissingIdentifier);
    }
    if !state.origins.allows(origin) {
        return Err(RegisterError::OriginRejected(origin.to_owned()));
    }

    let client = Client::load(state.store.as_ref(), identifier).await?;
    if client.sites.is_empty() {
        tracing::warn!(identifier, "client has no sites, nothing will be polled");
    }

    let entry = Arc::new(SessionEntry::new(client, outbound, state.shutdown.child_token()));

    if let Some(prev) = state.registry.insert(Arc::clone(&entry)).await {
        prev.cancel.cancel();
        tracing::warn!(
            identifier,
            evicted = %prev.session_id,
            session_id = %entry.session_id,
            "identifier re-registered, evicting previous session"
        );
    }

    spawn_job_poller(Arc::clone(state), Arc::clone(&entry));

    tracing::info!(
        identifier,
        session_id = %entry.session_id,
        sites = entry.client.sites.len(),
        printers = entry.printers.len(),
        "session registered"
    );
    Ok(entry)
}

/// Stop a session's poller and drop its mapping.
pub async fn unregister(state: &RelayState, entry: &SessionEntry) {
    entry.cancel.cancel();
    if state.registry.remove_if_current(entry.identifier(), &entry.session_id).await {
        tracing::info!(
            identifier = entry.identifier(),
            session_id = %entry.session_id,
            dispatched = entry.dispatched(),
            "session closed"
        );
    } else {
        tracing::debug!(
            identifier = entry.identifier(),
            session_id = %entry.session_id,
            "evicted session closed"
        );
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
