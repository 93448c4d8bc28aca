// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session pending-job poller.

use std::sync::Arc;
use std::time::Duration;

use spoolrelay_wire::JobDispatch;
use tokio::task::JoinHandle;

use crate::state::{RelayState, SessionEntry};
use crate::store::{JobStore, StorageError};

/// Outcome of one poll tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Rows returned by the store.
    pub fetched: usize,
    /// Rows forwarded to the agent.
    pub dispatched: usize,
    /// Rows deleted without dispatch because their printer did not resolve.
    pub dropped: usize,
    /// Rows left in the store because the delete failed.
    pub failed_deletes: usize,
    /// Rows claimed after the session's socket had gone away.
    pub lost: usize,
    /// Rows another poller deleted between our fetch and our delete.
    pub claimed_elsewhere: usize,
}

/// Spawn the poller for `entry`. It stops when the session's cancel token
/// fires or its socket writer goes away.
pub fn spawn_job_poller(state: Arc<RelayState>, entry: Arc<SessionEntry>) -> JoinHandle<()> {
    let period = state.config.poll_interval();
    let backoff_max = state.config.store_backoff_max();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut backoff: Option<Duration> = None;

        loop {
            tokio::select! {
                _ = entry.cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            match poll_once(state.store.as_ref(), &entry).await {
                Ok(report) => {
                    if backoff.take().is_some() {
                        tracing::info!(identifier = entry.identifier(), "job store recovered");
                    }
                    if report.fetched > 0 {
                        tracing::debug!(identifier = entry.identifier(), ?report, "poll tick");
                    }
                    if entry.outbound.is_closed() {
                        break;
                    }
                }
                Err(e) => {
                    let delay = next_backoff(backoff, period, backoff_max);
                    backoff = Some(delay);
                    tracing::warn!(
                        identifier = entry.identifier(),
                        err = %e,
                        code = %e.kind(),
                        retry_in_ms = delay.as_millis() as u64,
                        "job poll failed"
                    );
                    tokio::select! {
                        _ = entry.cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    interval.reset();
                }
            }
        }

        tracing::debug!(
            identifier = entry.identifier(),
            session_id = %entry.session_id,
            "job poller stopped"
        );
    })
}

/// Run one tick: fetch pending jobs for the session's sites, claim each row
/// by deleting it, and forward the ones whose printer resolves.
///
/// A session that has been cancelled or whose socket writer is gone claims
/// nothing, so an evicted session cannot race its replacement.
pub async fn poll_once(
    store: &dyn JobStore,
    entry: &SessionEntry,
) -> Result<TickReport, StorageError> {
    let mut report = TickReport::default();
    let aliases = entry.client.site_aliases();
    if aliases.is_empty() || !is_live(entry) {
        return Ok(report);
    }

    let rows = store.fetch_pending_jobs(&aliases).await?;
    report.fetched = rows.len();

    for row in rows {
        if !is_live(entry) {
            tracing::debug!(identifier = entry.identifier(), "session ended mid-tick, leaving jobs");
            break;
        }
        let printer = entry.printers.resolve(&row.site_alias, row.printer_id).map(|p| p.to_ref());

        match store.delete_job(row.id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(job_id = row.id, "job claimed by another session");
                report.claimed_elsewhere += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(job_id = row.id, err = %e, "failed to claim job, leaving it for the next tick");
                report.failed_deletes += 1;
                continue;
            }
        }

        let Some(printer) = printer else {
            tracing::warn!(
                job_id = row.id,
                site = %row.site_alias,
                printer_id = row.printer_id,
                "no printer for job, dropped"
            );
            report.dropped += 1;
            continue;
        };

        let dispatch = JobDispatch { site_alias: row.site_alias, text: row.text, printer };
        match entry.outbound.send(&dispatch).await {
            Ok(()) => {
                entry.record_dispatch();
                report.dispatched += 1;
                tracing::info!(
                    identifier = entry.identifier(),
                    job_id = row.id,
                    printer = %dispatch.printer.alias,
                    "job dispatched"
                );
            }
            Err(e) => {
                tracing::warn!(
                    identifier = entry.identifier(),
                    job_id = row.id,
                    err = %e,
                    "session closed after claim, job lost"
                );
                report.lost += 1;
            }
        }
    }

    Ok(report)
}

fn is_live(entry: &SessionEntry) -> bool {
    !entry.cancel.is_cancelled() && !entry.outbound.is_closed()
}

/// Next wait after a store failure: `base` first, then doubling, never above
/// `max`.
pub fn next_backoff(prev: Option<Duration>, base: Duration, max: Duration) -> Duration {
    match prev {
        None => base,
        Some(p) => p.saturating_mul(2),
    }
    .min(max)
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
