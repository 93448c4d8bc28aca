// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use spoolrelay_wire::{frame_channel, PrinterRef};
use tokio::sync::Semaphore;

use super::*;
use crate::print::PrintFuture;

fn job(text: &str) -> JobDispatch {
    JobDispatch {
        site_alias: "store1".to_owned(),
        text: text.to_owned(),
        printer: PrinterRef {
            id: 2,
            name: "Kitchen".to_owned(),
            alias: "kitchen".to_owned(),
            driver: None,
            driver_model: None,
            output: None,
        },
    }
}

/// Records each spooled file's path and contents, then succeeds or fails.
#[derive(Default)]
struct Recorder {
    fail: bool,
    seen: Mutex<Vec<(std::path::PathBuf, String)>>,
}

impl PrintSubsystem for Recorder {
    fn submit<'a>(&'a self, _printer: &'a PrinterRef, path: &'a Path) -> PrintFuture<'a> {
        Box::pin(async move {
            let text = std::fs::read_to_string(path)?;
            if let Ok(mut seen) = self.seen.lock() {
                seen.push((path.to_path_buf(), text));
            }
            if self.fail {
                return Err(PrintExecutionError::Failed { status: 1, stderr: "jammed".to_owned() });
            }
            Ok(PrintOutput { stdout: "request id is kitchen-1".to_owned(), status: 0 })
        })
    }
}

/// Blocks every submission until a permit is added.
struct Gate(Arc<Semaphore>);

impl PrintSubsystem for Gate {
    fn submit<'a>(&'a self, _printer: &'a PrinterRef, _path: &'a Path) -> PrintFuture<'a> {
        Box::pin(async move {
            let _permit = self.0.acquire().await;
            Ok(PrintOutput { stdout: String::new(), status: 0 })
        })
    }
}

fn seen_paths(recorder: &Recorder) -> Vec<(std::path::PathBuf, String)> {
    recorder.seen.lock().map(|s| s.clone()).unwrap_or_default()
}

#[tokio::test]
async fn spool_file_is_removed_after_success() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let recorder = Recorder::default();

    let output = execute(&recorder, dir.path(), &job("hello\n")).await?;

    assert_eq!(output.status, 0);
    let seen = seen_paths(&recorder);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].1, "hello\n");
    assert!(seen[0].0.starts_with(dir.path()));
    assert!(!seen[0].0.exists());
    Ok(())
}

#[tokio::test]
async fn spool_file_is_removed_after_failure() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let recorder = Recorder { fail: true, ..Default::default() };

    let result = execute(&recorder, dir.path(), &job("hello\n")).await;

    assert!(matches!(result, Err(PrintExecutionError::Failed { .. })));
    let seen = seen_paths(&recorder);
    assert_eq!(seen.len(), 1);
    assert!(!seen[0].0.exists());
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn missing_spool_dir_is_a_spool_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let recorder = Recorder::default();

    let result = execute(&recorder, &dir.path().join("missing"), &job("x")).await;

    assert!(matches!(result, Err(PrintExecutionError::Spool(_))));
    assert!(seen_paths(&recorder).is_empty());
    Ok(())
}

#[tokio::test]
async fn printed_job_reports_print_result() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (reports, mut report_rx) = frame_channel(8);
    let config = ExecutorConfig { workers: 1, queue_capacity: 4, spool_dir: dir.path().to_path_buf() };
    let cancel = CancellationToken::new();
    let (executor, handle) =
        PrintExecutor::spawn(config, Arc::new(Recorder::default()), reports, cancel.clone());

    executor.submit(job("hello\n"))?;

    let frame = tokio::time::timeout(Duration::from_secs(5), report_rx.recv())
        .await?
        .ok_or_else(|| anyhow::anyhow!("reports closed"))?;
    let value: serde_json::Value = serde_json::from_str(&frame)?;
    assert_eq!(value["rta"]["action"], "print");
    assert_eq!(value["rta"]["rta"]["printer"], "kitchen");
    assert_eq!(value["rta"]["rta"]["status"], 0);

    cancel.cancel();
    handle.await?;
    Ok(())
}

#[tokio::test]
async fn failed_job_reports_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (reports, mut report_rx) = frame_channel(8);
    let config = ExecutorConfig { workers: 1, queue_capacity: 4, spool_dir: dir.path().to_path_buf() };
    let recorder = Recorder { fail: true, ..Default::default() };
    let (executor, _handle) =
        PrintExecutor::spawn(config, Arc::new(recorder), reports, CancellationToken::new());

    executor.submit(job("hello\n"))?;

    let frame = tokio::time::timeout(Duration::from_secs(5), report_rx.recv())
        .await?
        .ok_or_else(|| anyhow::anyhow!("reports closed"))?;
    let value: serde_json::Value = serde_json::from_str(&frame)?;
    assert_eq!(value["err"]["code"], "PRINT_EXECUTION");
    assert_eq!(value["err"]["printer"], "kitchen");
    Ok(())
}

#[tokio::test]
async fn full_queue_rejects_and_reports_backpressure() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (reports, mut report_rx) = frame_channel(32);
    let gate = Arc::new(Semaphore::new(0));
    let config = ExecutorConfig { workers: 1, queue_capacity: 1, spool_dir: dir.path().to_path_buf() };
    let (executor, _handle) = PrintExecutor::spawn(
        config,
        Arc::new(Gate(Arc::clone(&gate))),
        reports,
        CancellationToken::new(),
    );

    // One job printing, one held for a worker, one queued: the rest bounce.
    let mut rejected = 0;
    for i in 0..10 {
        match executor.submit(job(&format!("job {i}"))) {
            Ok(()) => {}
            Err(SubmitError::QueueFull) => rejected += 1,
            Err(e) => return Err(e.into()),
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(rejected >= 7, "rejected {rejected}");

    let frame = tokio::time::timeout(Duration::from_secs(5), report_rx.recv())
        .await?
        .ok_or_else(|| anyhow::anyhow!("reports closed"))?;
    let value: serde_json::Value = serde_json::from_str(&frame)?;
    assert_eq!(value["err"]["code"], "BACKPRESSURE");

    gate.add_permits(10);
    Ok(())
}

#[tokio::test]
async fn stopped_executor_rejects_jobs() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (reports, _report_rx) = frame_channel(8);
    let config = ExecutorConfig { workers: 1, queue_capacity: 4, spool_dir: dir.path().to_path_buf() };
    let cancel = CancellationToken::new();
    let (executor, handle) =
        PrintExecutor::spawn(config, Arc::new(Recorder::default()), reports, cancel.clone());

    cancel.cancel();
    assert_eq!(handle.await?, 0);

    assert!(matches!(executor.submit(job("late")), Err(SubmitError::Stopped)));
    Ok(())
}

#[tokio::test]
async fn cancel_counts_jobs_left_in_the_queue() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (reports, _report_rx) = frame_channel(8);
    let gate = Arc::new(Semaphore::new(0));
    let config = ExecutorConfig { workers: 1, queue_capacity: 4, spool_dir: dir.path().to_path_buf() };
    let cancel = CancellationToken::new();
    let (executor, handle) = PrintExecutor::spawn(
        config,
        Arc::new(Gate(Arc::clone(&gate))),
        reports,
        cancel.clone(),
    );

    // One printing, one held for a worker, two queued.
    for i in 0..4 {
        executor.submit(job(&format!("job {i}")))?;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    cancel.cancel();
    tokio::time::sleep(Duration::from_millis(20)).await;
    gate.add_permits(10);
    let abandoned = tokio::time::timeout(Duration::from_secs(5), handle).await??;

    assert_eq!(abandoned, 3);
    Ok(())
}
