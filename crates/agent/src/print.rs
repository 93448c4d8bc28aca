// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;

use spoolrelay_wire::PrinterRef;

use crate::error::PrintExecutionError;

/// What the print command printed on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOutput {
    pub stdout: String,
    pub status: i32,
}

pub type PrintFuture<'a> =
    Pin<Box<dyn Future<Output = Result<PrintOutput, PrintExecutionError>> + Send + 'a>>;

/// Hands a spooled file to the local print system.
///
/// Object-safe for use as `Arc<dyn PrintSubsystem>`.
pub trait PrintSubsystem: Send + Sync + 'static {
    fn submit<'a>(&'a self, printer: &'a PrinterRef, path: &'a Path) -> PrintFuture<'a>;
}

/// Submits through a CUPS-style command: `<program> -d <destination> <file>`.
#[derive(Debug, Clone)]
pub struct LpSubsystem {
    program: String,
}

impl LpSubsystem {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl Default for LpSubsystem {
    fn default() -> Self {
        Self::new("lp")
    }
}

impl PrintSubsystem for LpSubsystem {
    fn submit<'a>(&'a self, printer: &'a PrinterRef, path: &'a Path) -> PrintFuture<'a> {
        Box::pin(async move {
            let destination = printer.destination();
            if destination.is_empty() {
                return Err(PrintExecutionError::NoDestination { printer_id: printer.id });
            }

            let output = tokio::process::Command::new(&self.program)
                .arg("-d")
                .arg(destination)
                .arg(path)
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|source| PrintExecutionError::Spawn {
                    program: self.program.clone(),
                    source,
                })?;

            let status = output.status.code().unwrap_or(-1);
            if !output.status.success() {
                return Err(PrintExecutionError::Failed {
                    status,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
                });
            }
            Ok(PrintOutput { stdout: String::from_utf8_lossy(&output.stdout).trim().to_owned(), status })
        })
    }
}

#[cfg(test)]
#[path = "print_tests.rs"]
mod tests;
