// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the relay.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::error::ErrorCode;
use crate::registry::SessionInfo;
use crate::state::RelayState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub session_count: usize,
    pub event_subscribers: usize,
}

#[derive(Debug, Serialize)]
pub struct CloseResponse {
    pub identifier: String,
    pub closed: bool,
}

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<RelayState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "running".to_owned(),
        session_count: s.registry.len().await,
        event_subscribers: s.bus.subscriber_count(),
    })
}

/// `GET /api/v1/sessions`
pub async fn list_sessions(State(s): State<Arc<RelayState>>) -> impl IntoResponse {
    Json(s.registry.list().await)
}

/// `GET /api/v1/sessions/{identifier}`
pub async fn get_session(
    State(s): State<Arc<RelayState>>,
    Path(identifier): Path<String>,
) -> axum::response::Response {
    let found: Option<SessionInfo> =
        s.registry.list().await.into_iter().find(|info| info.identifier == identifier);
    match found {
        Some(info) => Json(info).into_response(),
        None => ErrorCode::SessionNotFound
            .to_http_response(format!("no session for {identifier}"))
            .into_response(),
    }
}

/// `DELETE /api/v1/sessions/{identifier}` closes the agent's socket. The
/// agent reconnects on its own schedule.
pub async fn close_session(
    State(s): State<Arc<RelayState>>,
    Path(identifier): Path<String>,
) -> axum::response::Response {
    let Some(entry) = s.registry.get(&identifier).await else {
        return ErrorCode::SessionNotFound
            .to_http_response(format!("no session for {identifier}"))
            .into_response();
    };
    entry.cancel.cancel();
    tracing::info!(identifier = %identifier, session_id = %entry.session_id, "session closed via api");
    Json(CloseResponse { identifier, closed: true }).into_response()
}
