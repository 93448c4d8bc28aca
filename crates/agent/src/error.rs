// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use spoolrelay_wire::ErrorKind;

/// A single job failed to print. Never fatal to the agent.
#[derive(Debug, thiserror::Error)]
pub enum PrintExecutionError {
    #[error("cannot spool job: {0}")]
    Spool(#[from] std::io::Error),
    #[error("printer {printer_id} has no destination")]
    NoDestination { printer_id: i64 },
    #[error("cannot run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("print command exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },
}

impl PrintExecutionError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::PrintExecution
    }
}

/// A job could not be queued.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("print queue full")]
    QueueFull,
    #[error("print executor stopped")]
    Stopped,
}

impl SubmitError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Backpressure
    }
}

/// No identifier could be derived for this machine.
#[derive(Debug, thiserror::Error)]
#[error("no usable network address or machine id found")]
pub struct IdentityError;
