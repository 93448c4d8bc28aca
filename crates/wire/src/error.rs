// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use serde::{Deserialize, Serialize};

/// Machine-readable error categories carried in `err` envelopes and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Connection,
    Protocol,
    Storage,
    PrintExecution,
    Backpressure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "CONNECTION",
            Self::Protocol => "PROTOCOL",
            Self::Storage => "STORAGE",
            Self::PrintExecution => "PRINT_EXECUTION",
            Self::Backpressure => "BACKPRESSURE",
        }
    }

    /// Build the `err` payload body for this kind.
    pub fn to_error_body(&self, message: impl Into<String>) -> serde_json::Value {
        serde_json::json!({ "code": self.as_str(), "message": message.into() })
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A frame that is not well-formed JSON, or a value that cannot be serialized.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
    #[error("cannot serialize payload: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Transport-level failures. Recovered by reconnecting, never fatal on their own.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("connection closed")]
    Closed,
    #[error("outbound queue full")]
    Saturated,
    #[error("gave up after {attempts} reconnect attempts")]
    Exhausted { attempts: u64 },
}

impl ConnectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Saturated => ErrorKind::Backpressure,
            _ => ErrorKind::Connection,
        }
    }
}

/// Failure to hand a frame to a socket writer.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}
