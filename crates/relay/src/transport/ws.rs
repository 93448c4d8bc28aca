// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent WebSocket handler.
//!
//! The agent's identifier arrives in the `Origin` header. The upgrade is
//! refused unless the configured subprotocol is offered and the origin is
//! allowed.

use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use spoolrelay_wire::frame_channel;
use tokio::sync::mpsc;

use crate::error::ErrorCode;
use crate::registry;
use crate::state::{RelayState, SessionEntry};

/// `GET /ws`: WebSocket upgrade for a print agent.
pub async fn agent_ws_handler(
    State(state): State<Arc<RelayState>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let identifier = match admit(&state, &headers) {
        Ok(id) => id,
        Err((code, message)) => {
            tracing::warn!(code = %code, reason = %message, "agent connection rejected");
            return code.to_http_response(message).into_response();
        }
    };

    let protocol = state.config.subprotocol.clone();
    ws.protocols([protocol])
        .on_upgrade(move |socket| handle_agent(state, identifier, socket))
        .into_response()
}

/// Check the subprotocol and origin of an upgrade request, returning the
/// agent identifier.
pub fn admit(state: &RelayState, headers: &HeaderMap) -> Result<String, (ErrorCode, String)> {
    let wanted = state.config.subprotocol.as_str();
    let offered = headers
        .get_all(header::SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|p| p.trim() == wanted);
    if !offered {
        return Err((ErrorCode::BadRequest, format!("subprotocol {wanted} required")));
    }

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();
    if origin.is_empty() {
        return Err((ErrorCode::BadRequest, "missing client identifier".to_owned()));
    }
    if !state.origins.allows(origin) {
        return Err((ErrorCode::Forbidden, format!("origin {origin} not allowed")));
    }
    Ok(origin.to_owned())
}

/// Per-connection loop: drain the session's outbound frames into the socket
/// and publish the agent's envelopes on the event bus.
async fn handle_agent(state: Arc<RelayState>, identifier: String, mut socket: WebSocket) {
    let (outbound, mut outbound_rx) = frame_channel(state.config.outbound_capacity);

    let entry = match registry::register(&state, &identifier, &identifier, outbound).await {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!(identifier = %identifier, err = %e, "registration failed");
            let frame = CloseFrame {
                code: close_code::ERROR,
                reason: ErrorCode::from(&e).as_str().into(),
            };
            let _ = socket.send(Message::Close(Some(frame))).await;
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            _ = entry.cancel.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }

            frame = outbound_rx.recv() => {
                let Some(text) = frame else { break };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => handle_agent_frame(&state, &entry, &text),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(identifier = %identifier, err = %e, "agent socket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    discard_undelivered(&identifier, &mut outbound_rx);
    registry::unregister(&state, &entry).await;
}

/// Close the session's outbound queue and count the frames that never reached
/// the socket. Those jobs are already gone from the store.
pub(crate) fn discard_undelivered(
    identifier: &str,
    outbound_rx: &mut mpsc::Receiver<String>,
) -> usize {
    outbound_rx.close();
    let mut lost: usize = 0;
    while outbound_rx.try_recv().is_ok() {
        lost += 1;
    }
    if lost > 0 {
        tracing::warn!(identifier, lost, "session ended with undelivered jobs");
    }
    lost
}

fn handle_agent_frame(state: &RelayState, entry: &SessionEntry, text: &str) {
    let published = state.bus.publish_raw(entry.identifier(), text);
    tracing::trace!(identifier = entry.identifier(), events = published, "agent frame");
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
