// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn kitchen() -> PrinterRef {
    PrinterRef {
        id: 2,
        name: "Kitchen".to_owned(),
        alias: "kitchen".to_owned(),
        driver: None,
        driver_model: None,
        output: None,
    }
}

#[tokio::test]
async fn passes_destination_and_file() -> anyhow::Result<()> {
    let file = tempfile::NamedTempFile::new()?;
    let subsystem = LpSubsystem::new("echo");

    let output = subsystem.submit(&kitchen(), file.path()).await?;

    assert_eq!(output.status, 0);
    assert_eq!(output.stdout, format!("-d kitchen {}", file.path().display()));
    Ok(())
}

#[tokio::test]
async fn destination_falls_back_to_output() -> anyhow::Result<()> {
    let file = tempfile::NamedTempFile::new()?;
    let printer = PrinterRef { alias: String::new(), output: Some("bar-queue".to_owned()), ..kitchen() };

    let output = LpSubsystem::new("echo").submit(&printer, file.path()).await?;

    assert!(output.stdout.starts_with("-d bar-queue "));
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_is_an_error() -> anyhow::Result<()> {
    let file = tempfile::NamedTempFile::new()?;

    let result = LpSubsystem::new("false").submit(&kitchen(), file.path()).await;

    assert!(matches!(result, Err(PrintExecutionError::Failed { .. })));
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() -> anyhow::Result<()> {
    let file = tempfile::NamedTempFile::new()?;

    let result = LpSubsystem::new("/nonexistent/lp").submit(&kitchen(), file.path()).await;

    assert!(matches!(result, Err(PrintExecutionError::Spawn { .. })));
    Ok(())
}

#[tokio::test]
async fn printer_without_destination_is_rejected() -> anyhow::Result<()> {
    let file = tempfile::NamedTempFile::new()?;
    let printer = PrinterRef { alias: String::new(), output: None, ..kitchen() };

    let result = LpSubsystem::new("echo").submit(&printer, file.path()).await;

    assert!(matches!(result, Err(PrintExecutionError::NoDestination { printer_id: 2 })));
    Ok(())
}
