// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relay connection: reconnect state machine and socket driver.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use spoolrelay_wire::{envelope, ConnectionError, Envelope, EventBus, Inbound};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::executor::PrintExecutor;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal: the retry ceiling was reached.
    Exhausted,
}

/// What the driver should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Connect,
    ScheduleRetry { attempt: u64, delay: Duration },
    /// A retry is already scheduled; this event schedules nothing.
    AlreadyPending,
    GiveUp { attempts: u64 },
}

/// Reconnect bookkeeping with a fixed delay and a retry ceiling.
///
/// At most one retry is pending at a time, and a successful connection
/// resets the retry counter.
#[derive(Debug, Clone)]
pub struct Reconnector {
    state: ConnState,
    retries: u64,
    max_retries: u64,
    delay: Duration,
    pending: bool,
}

impl Reconnector {
    pub fn new(delay: Duration, max_retries: u64) -> Self {
        Self { state: ConnState::Disconnected, retries: 0, max_retries, delay, pending: false }
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn retries(&self) -> u64 {
        self.retries
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn max_retries(&self) -> u64 {
        self.max_retries
    }

    /// The first attempt is immediate.
    pub fn start(&mut self) -> Action {
        self.state = ConnState::Connecting;
        Action::Connect
    }

    pub fn on_connected(&mut self) {
        self.state = ConnState::Connected;
        self.retries = 0;
        self.pending = false;
    }

    /// A close, an error, or a failed connect attempt.
    pub fn on_disconnected(&mut self) -> Action {
        if self.state == ConnState::Exhausted {
            return Action::GiveUp { attempts: self.retries };
        }
        self.state = ConnState::Disconnected;
        if self.pending {
            return Action::AlreadyPending;
        }
        if self.retries >= self.max_retries {
            self.state = ConnState::Exhausted;
            return Action::GiveUp { attempts: self.retries };
        }
        self.retries += 1;
        self.pending = true;
        Action::ScheduleRetry { attempt: self.retries, delay: self.delay }
    }

    pub fn on_retry_fired(&mut self) -> Action {
        self.pending = false;
        if self.state == ConnState::Exhausted {
            return Action::GiveUp { attempts: self.retries };
        }
        self.state = ConnState::Connecting;
        Action::Connect
    }
}

/// Everything one connection needs; survives reconnects.
pub struct AgentLink {
    pub url: String,
    pub subprotocol: String,
    pub identifier: String,
    pub executor: PrintExecutor,
    /// Envelopes received from the relay.
    pub bus: EventBus,
}

/// Keep a connection to the relay until `cancel` fires or the retry ceiling
/// is reached.
pub async fn run(
    link: &AgentLink,
    reports: &mut mpsc::Receiver<String>,
    mut machine: Reconnector,
    cancel: CancellationToken,
) -> Result<(), ConnectionError> {
    let mut action = machine.start();

    loop {
        match action {
            Action::Connect => {
                let attempt = tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    attempt = connect(link) => attempt,
                };
                match attempt {
                    Ok(socket) => {
                        machine.on_connected();
                        tracing::info!(url = %link.url, identifier = %link.identifier, "connected to relay");
                        serve_connection(link, socket, reports, &cancel).await;
                        if cancel.is_cancelled() {
                            return Ok(());
                        }
                        tracing::info!(url = %link.url, "relay connection closed");
                    }
                    Err(e) => {
                        tracing::warn!(url = %link.url, err = %e, code = %e.kind(), "relay connect failed");
                    }
                }
                action = machine.on_disconnected();
            }
            Action::ScheduleRetry { attempt, delay } => {
                tracing::info!(
                    attempt,
                    max_retries = machine.max_retries(),
                    delay_ms = delay.as_millis() as u64,
                    "reconnect scheduled"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(delay) => {}
                }
                action = machine.on_retry_fired();
            }
            Action::AlreadyPending => {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(machine.delay()) => {}
                }
                action = machine.on_retry_fired();
            }
            Action::GiveUp { attempts } => {
                tracing::error!(attempts, url = %link.url, "giving up on relay connection");
                return Err(ConnectionError::Exhausted { attempts });
            }
        }
    }
}

async fn connect(link: &AgentLink) -> Result<Socket, ConnectionError> {
    let mut request = link
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| ConnectionError::Connect(e.to_string()))?;
    let headers = request.headers_mut();
    headers.insert(
        header::SEC_WEBSOCKET_PROTOCOL,
        HeaderValue::from_str(&link.subprotocol)
            .map_err(|e| ConnectionError::Handshake(e.to_string()))?,
    );
    headers.insert(
        header::ORIGIN,
        HeaderValue::from_str(&link.identifier)
            .map_err(|e| ConnectionError::Handshake(e.to_string()))?,
    );

    let (socket, _response) = tokio_tungstenite::connect_async(request).await.map_err(classify)?;
    Ok(socket)
}

fn classify(e: tungstenite::Error) -> ConnectionError {
    match e {
        tungstenite::Error::Http(response) => {
            ConnectionError::Handshake(format!("relay refused upgrade: {}", response.status()))
        }
        tungstenite::Error::Io(e) => ConnectionError::Connect(e.to_string()),
        other => ConnectionError::Handshake(other.to_string()),
    }
}

/// Drive one open socket: forward queued reports, handle relay frames.
/// Returns when the socket closes or `cancel` fires.
async fn serve_connection(
    link: &AgentLink,
    socket: Socket,
    reports: &mut mpsc::Receiver<String>,
    cancel: &CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    if let Ok(frame) = envelope::encode(&hello(link)) {
        if ws_tx.send(Message::Text(frame.into())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }

            report = reports.recv() => {
                let Some(text) = report else { break };
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    tracing::warn!(err = %e, "report lost with connection");
                    break;
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&link.executor, &link.bus, &link.url, &text);
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!(?frame, "relay closed connection");
                        break;
                    }
                    None => break,
                    Some(Err(e)) => {
                        tracing::debug!(err = %e, "relay socket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
}

fn hello(link: &AgentLink) -> Envelope {
    let mut msg = serde_json::Map::new();
    msg.insert(
        "connected".to_owned(),
        json!({ "identifier": link.identifier, "version": env!("CARGO_PKG_VERSION") }),
    );
    Envelope::msg(msg)
}

/// Route one relay frame: jobs to the executor, envelopes to the local bus.
/// Anything else is ignored.
pub fn handle_frame(executor: &PrintExecutor, bus: &EventBus, source: &str, text: &str) {
    match Inbound::parse(text) {
        Some(Inbound::Dispatch(job)) => {
            tracing::debug!(printer = %job.printer.alias, site = %job.site_alias, "job received");
            if let Err(e) = executor.submit(job) {
                tracing::warn!(err = %e, code = %e.kind(), "job not queued");
            }
        }
        Some(Inbound::Envelope(env)) => {
            bus.publish(source, &env);
        }
        None => {
            tracing::debug!(len = text.len(), "ignoring unrecognized frame");
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
