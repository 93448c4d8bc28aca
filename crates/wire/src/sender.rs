// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validated handle to a socket writer task.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::envelope;
use crate::error::{ConnectionError, SendError};

/// Create a bounded frame channel. The receiver belongs to the task that
/// owns the socket sink.
pub fn frame_channel(capacity: usize) -> (FrameSender, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (FrameSender { tx }, rx)
}

/// Sends text frames to a socket writer. Every frame is validated before it
/// is queued; an invalid payload never reaches the channel.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<String>,
}

impl FrameSender {
    /// Queue a pre-rendered frame, waiting for capacity.
    pub async fn send_text(&self, text: &str) -> Result<(), SendError> {
        let frame = envelope::encode_str(text)?;
        self.tx.send(frame).await.map_err(|_| ConnectionError::Closed)?;
        Ok(())
    }

    /// Serialize and queue a value, waiting for capacity.
    pub async fn send<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), SendError> {
        let frame = envelope::encode(value)?;
        self.tx.send(frame).await.map_err(|_| ConnectionError::Closed)?;
        Ok(())
    }

    /// Serialize and queue a value without waiting. A full channel is
    /// reported as [`ConnectionError::Saturated`].
    pub fn try_send<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), SendError> {
        let frame = envelope::encode(value)?;
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ConnectionError::Saturated,
            mpsc::error::TrySendError::Closed(_) => ConnectionError::Closed,
        })?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
#[path = "sender_tests.rs"]
mod tests;
