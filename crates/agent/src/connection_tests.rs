// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use spoolrelay_wire::{frame_channel, EnvelopeEvent, PrinterRef};
use tokio::sync::Semaphore;

use super::*;
use crate::error::PrintExecutionError;
use crate::executor::ExecutorConfig;
use crate::print::{PrintFuture, PrintOutput, PrintSubsystem};

const DELAY: Duration = Duration::from_millis(3000);

#[test]
fn first_attempt_is_immediate() {
    let mut machine = Reconnector::new(DELAY, 5);
    assert_eq!(machine.start(), Action::Connect);
    assert_eq!(machine.state(), ConnState::Connecting);
}

#[test]
fn close_then_error_schedules_one_retry() {
    let mut machine = Reconnector::new(DELAY, 5);
    machine.start();
    machine.on_connected();

    assert_eq!(machine.on_disconnected(), Action::ScheduleRetry { attempt: 1, delay: DELAY });
    assert_eq!(machine.on_disconnected(), Action::AlreadyPending);
    assert!(machine.is_pending());
    assert_eq!(machine.retries(), 1);
}

#[test]
fn connected_resets_retry_counter() {
    let mut machine = Reconnector::new(DELAY, 5);
    machine.start();
    for _ in 0..3 {
        assert!(matches!(machine.on_disconnected(), Action::ScheduleRetry { .. }));
        assert_eq!(machine.on_retry_fired(), Action::Connect);
    }
    assert_eq!(machine.retries(), 3);

    machine.on_connected();

    assert_eq!(machine.retries(), 0);
    assert_eq!(machine.state(), ConnState::Connected);
    assert_eq!(machine.on_disconnected(), Action::ScheduleRetry { attempt: 1, delay: DELAY });
}

#[test]
fn ceiling_moves_to_exhausted() {
    let mut machine = Reconnector::new(DELAY, 2);
    assert_eq!(machine.max_retries(), 2);
    machine.start();

    assert!(matches!(machine.on_disconnected(), Action::ScheduleRetry { attempt: 1, .. }));
    machine.on_retry_fired();
    assert!(matches!(machine.on_disconnected(), Action::ScheduleRetry { attempt: 2, .. }));
    machine.on_retry_fired();

    assert_eq!(machine.on_disconnected(), Action::GiveUp { attempts: 2 });
    assert_eq!(machine.state(), ConnState::Exhausted);
    assert_eq!(machine.on_retry_fired(), Action::GiveUp { attempts: 2 });
}

#[test]
fn zero_ceiling_gives_up_on_first_failure() {
    let mut machine = Reconnector::new(DELAY, 0);
    machine.start();
    assert_eq!(machine.on_disconnected(), Action::GiveUp { attempts: 0 });
}

/// Never finishes a job, so queued jobs stay queued.
struct Stuck(Semaphore);

impl PrintSubsystem for Stuck {
    fn submit<'a>(&'a self, _printer: &'a PrinterRef, _path: &'a Path) -> PrintFuture<'a> {
        Box::pin(async move {
            let _permit = self.0.acquire().await;
            Err::<PrintOutput, _>(PrintExecutionError::Failed { status: 1, stderr: String::new() })
        })
    }
}

fn executor() -> anyhow::Result<(PrintExecutor, tempfile::TempDir)> {
    let dir = tempfile::tempdir()?;
    let (reports, _rx) = frame_channel(8);
    let config = ExecutorConfig { workers: 1, queue_capacity: 8, spool_dir: dir.path().to_path_buf() };
    let (executor, _handle) = PrintExecutor::spawn(
        config,
        Arc::new(Stuck(Semaphore::new(0))),
        reports,
        CancellationToken::new(),
    );
    Ok((executor, dir))
}

#[tokio::test]
async fn envelope_frames_go_to_the_bus() -> anyhow::Result<()> {
    let (executor, _dir) = executor()?;
    let bus = EventBus::default();
    let mut sub = bus.subscribe();

    handle_frame(&executor, &bus, "relay", r#"{"msg":{"status":"ok"}}"#);

    let first = sub.try_recv().ok_or_else(|| anyhow::anyhow!("no event"))?;
    assert_eq!(first.source, "relay");
    assert!(matches!(first.event, EnvelopeEvent::Msg(_)));
    let second = sub.try_recv().ok_or_else(|| anyhow::anyhow!("no key event"))?;
    assert_eq!(second.event.name(), "msg:status");
    Ok(())
}

#[tokio::test]
async fn dispatch_frames_are_not_published() -> anyhow::Result<()> {
    let (executor, _dir) = executor()?;
    let bus = EventBus::default();
    let mut sub = bus.subscribe();

    handle_frame(
        &executor,
        &bus,
        "relay",
        r#"'{"site_alias":"store1","text":"hi","printer":{"id":2,"name":"K","alias":"kitchen"}}'"#,
    );
    handle_frame(&executor, &bus, "relay", "not json");

    assert!(sub.try_recv().is_none());
    Ok(())
}
