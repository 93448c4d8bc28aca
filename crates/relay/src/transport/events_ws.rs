// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dashboard stream: agent envelope events from the bus, filtered by source
//! and event name.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use spoolrelay_wire::EventFilter;

use crate::state::RelayState;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Comma-separated agent identifiers, or "all".
    #[serde(default = "default_all")]
    pub sources: String,
    /// Comma-separated event names: `msg`, `msg:<key>`, `rta`, `rta:<action>`, `err`.
    #[serde(default = "default_all")]
    pub subscribe: String,
}

fn default_all() -> String {
    "all".to_owned()
}

/// Which sources a dashboard client wants; `None` means all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFilter(Option<HashSet<String>>);

impl SourceFilter {
    pub fn parse(list: &str) -> Self {
        let ids: HashSet<String> = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        if ids.is_empty() || ids.contains("all") {
            Self(None)
        } else {
            Self(Some(ids))
        }
    }

    pub fn wants(&self, source: &str) -> bool {
        match &self.0 {
            None => true,
            Some(ids) => ids.contains(source),
        }
    }
}

/// `GET /ws/events`
pub async fn events_ws_handler(
    State(state): State<Arc<RelayState>>,
    Query(query): Query<EventsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let sources = SourceFilter::parse(&query.sources);
    let filter = EventFilter::parse_list(&query.subscribe);
    ws.on_upgrade(move |socket| handle_events_connection(state, sources, filter, socket))
}

async fn handle_events_connection(
    state: Arc<RelayState>,
    sources: SourceFilter,
    filter: EventFilter,
    socket: WebSocket,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut sub = state.bus.subscribe().filtered(filter);

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,
            event = sub.recv() => {
                let Some(event) = event else { break };
                if !sources.wants(&event.source) {
                    continue;
                }
                let json = event.to_json().to_string();
                if ws_tx.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "events_ws_tests.rs"]
mod tests;
