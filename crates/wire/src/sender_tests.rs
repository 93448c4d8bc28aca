// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;
use tokio::sync::mpsc::error::TryRecvError;

use super::*;
use crate::envelope::Envelope;
use crate::error::ProtocolError;

#[tokio::test]
async fn invalid_text_fails_and_writes_nothing() {
    let (sender, mut rx) = frame_channel(4);

    let result = sender.send_text("this is not json").await;

    assert!(matches!(result, Err(SendError::Protocol(ProtocolError::InvalidPayload(_)))));
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn valid_text_is_sent_verbatim() -> anyhow::Result<()> {
    let (sender, mut rx) = frame_channel(4);
    let text = r#"{"msg": {"hello": "world"}}"#;

    sender.send_text(text).await?;

    assert_eq!(rx.try_recv()?, text);
    Ok(())
}

#[tokio::test]
async fn send_serializes_values() -> anyhow::Result<()> {
    let (sender, mut rx) = frame_channel(4);

    sender.send(&Envelope::err(json!({"code": "STORAGE"}))).await?;

    assert_eq!(rx.try_recv()?, r#"{"err":{"code":"STORAGE"}}"#);
    Ok(())
}

#[tokio::test]
async fn send_after_receiver_dropped_is_closed() {
    let (sender, rx) = frame_channel(4);
    drop(rx);

    assert!(sender.is_closed());
    let result = sender.send(&json!({"msg": {}})).await;
    assert!(matches!(result, Err(SendError::Connection(ConnectionError::Closed))));
}

#[test]
fn try_send_reports_saturation() -> anyhow::Result<()> {
    let (sender, _rx) = frame_channel(1);

    sender.try_send(&json!({"msg": {"n": 1}}))?;
    let second = sender.try_send(&json!({"msg": {"n": 2}}));

    assert!(matches!(second, Err(SendError::Connection(ConnectionError::Saturated))));
    Ok(())
}
