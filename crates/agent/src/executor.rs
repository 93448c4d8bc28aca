// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded print worker pool.
//!
//! Jobs wait in a fixed-size queue and are printed by at most `workers`
//! concurrent tasks. A job arriving at a full queue is rejected and reported
//! upstream rather than buffered.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use spoolrelay_wire::{Envelope, ErrorKind, FrameSender, JobDispatch};
use tempfile::NamedTempFile;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::error::{PrintExecutionError, SubmitError};
use crate::print::{PrintOutput, PrintSubsystem};

/// Executor sizing.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub spool_dir: PathBuf,
}

struct Worker {
    subsystem: Arc<dyn PrintSubsystem>,
    spool_dir: PathBuf,
    reports: FrameSender,
}

/// Handle for queueing jobs. Cheap to clone.
#[derive(Clone)]
pub struct PrintExecutor {
    tx: mpsc::Sender<JobDispatch>,
    reports: FrameSender,
}

impl PrintExecutor {
    /// Start the dispatcher. It stops when `cancel` fires or every handle is
    /// dropped, after in-flight jobs finish. The handle resolves to the number
    /// of queued jobs abandoned at shutdown.
    pub fn spawn(
        config: ExecutorConfig,
        subsystem: Arc<dyn PrintSubsystem>,
        reports: FrameSender,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<usize>) {
        let (tx, mut rx) = mpsc::channel::<JobDispatch>(config.queue_capacity.max(1));
        let workers = config.workers.max(1);
        let worker = Arc::new(Worker {
            subsystem,
            spool_dir: config.spool_dir,
            reports: reports.clone(),
        });

        let handle = tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(workers));
            let mut tasks = JoinSet::new();
            let mut abandoned: usize = 0;

            loop {
                let job = tokio::select! {
                    _ = cancel.cancelled() => break,
                    job = rx.recv() => match job {
                        Some(job) => job,
                        None => break,
                    },
                };
                // Hold the job until a worker is free so the queue stays bounded.
                let permit = tokio::select! {
                    _ = cancel.cancelled() => {
                        abandoned += 1;
                        break;
                    }
                    permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                        Ok(p) => p,
                        Err(_) => {
                            abandoned += 1;
                            break;
                        }
                    },
                };

                let worker = Arc::clone(&worker);
                tasks.spawn(async move {
                    let _permit = permit;
                    worker.run(job).await;
                });
                while tasks.try_join_next().is_some() {}
            }

            rx.close();
            while rx.try_recv().is_ok() {
                abandoned += 1;
            }
            if abandoned > 0 {
                tracing::warn!(abandoned, "print executor stopped with jobs still queued");
            }

            while tasks.join_next().await.is_some() {}
            tracing::debug!("print executor stopped");
            abandoned
        });

        (Self { tx, reports }, handle)
    }

    /// Queue a job without waiting. A full queue rejects the job and reports
    /// the rejection upstream.
    pub fn submit(&self, job: JobDispatch) -> Result<(), SubmitError> {
        let err = match self.tx.try_send(job) {
            Ok(()) => return Ok(()),
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(printer = %job.printer.alias, "print queue full, job rejected");
                send_report(&self.reports, &rejection_report(&job));
                SubmitError::QueueFull
            }
            Err(mpsc::error::TrySendError::Closed(_)) => SubmitError::Stopped,
        };
        Err(err)
    }
}

impl Worker {
    async fn run(&self, job: JobDispatch) {
        let envelope = match execute(self.subsystem.as_ref(), &self.spool_dir, &job).await {
            Ok(output) => {
                tracing::info!(
                    printer = %job.printer.alias,
                    site = %job.site_alias,
                    bytes = job.text.len(),
                    output = %output.stdout,
                    "job printed"
                );
                success_report(&job, &output)
            }
            Err(e) => {
                tracing::warn!(printer = %job.printer.alias, err = %e, "job failed");
                failure_report(&job, &e)
            }
        };
        send_report(&self.reports, &envelope);
    }
}

/// Reports never wait: a full report queue drops the report.
fn send_report(reports: &FrameSender, envelope: &Envelope) {
    if let Err(e) = reports.try_send(envelope) {
        tracing::warn!(err = %e, "report dropped");
    }
}

/// Spool `job` to a temporary file in `spool_dir` and submit it. The file is
/// removed when this returns, whatever the outcome.
pub async fn execute(
    subsystem: &dyn PrintSubsystem,
    spool_dir: &Path,
    job: &JobDispatch,
) -> Result<PrintOutput, PrintExecutionError> {
    let dir = spool_dir.to_path_buf();
    let text = job.text.clone();
    let spool = tokio::task::spawn_blocking(move || spool_text(&dir, &text))
        .await
        .map_err(std::io::Error::other)??;

    tracing::debug!(path = %spool.path().display(), "job spooled");
    subsystem.submit(&job.printer, spool.path()).await
}

fn spool_text(dir: &Path, text: &str) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().prefix("spool-").suffix(".txt").tempfile_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    file.as_file().sync_all()?;
    Ok(file)
}

fn success_report(job: &JobDispatch, output: &PrintOutput) -> Envelope {
    Envelope::rta_action(
        "print",
        json!({
            "site_alias": job.site_alias,
            "printer": job.printer.alias,
            "status": output.status,
            "output": output.stdout,
        }),
    )
}

fn failure_report(job: &JobDispatch, e: &PrintExecutionError) -> Envelope {
    let mut body = e.kind().to_error_body(e.to_string());
    body["site_alias"] = json!(job.site_alias);
    body["printer"] = json!(job.printer.alias);
    Envelope::err(body)
}

fn rejection_report(job: &JobDispatch) -> Envelope {
    let mut body = ErrorKind::Backpressure.to_error_body(SubmitError::QueueFull.to_string());
    body["site_alias"] = json!(job.site_alias);
    body["printer"] = json!(job.printer.alias);
    Envelope::err(body)
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
