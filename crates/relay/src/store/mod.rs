// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared job store: pending jobs, sites, and printers.

pub mod sqlite;

use std::future::Future;
use std::pin::Pin;

use spoolrelay_wire::ErrorKind;

pub use sqlite::SqliteStore;

/// A row of `printer_jobs`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct JobRow {
    pub id: i64,
    pub site_alias: String,
    pub printer_id: i64,
    pub text: String,
}

/// A row of `sites`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SiteRow {
    pub alias: String,
    pub machine_uuid: String,
}

/// A row of `printers`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PrinterRow {
    pub id: i64,
    pub site_alias: String,
    pub name: String,
    pub alias: String,
    pub driver: Option<String>,
    pub driver_model: Option<String>,
    pub output: Option<String>,
    pub codepage: Option<String>,
}

/// The store is unreachable or a query failed.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("query failed: {0}")]
    Query(String),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }
}

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

/// Queries the relay needs from the job store.
///
/// Object-safe for use as `Arc<dyn JobStore>`.
pub trait JobStore: Send + Sync + 'static {
    /// Pending jobs whose `site_alias` is one of `site_aliases`, oldest first.
    fn fetch_pending_jobs<'a>(&'a self, site_aliases: &'a [String]) -> StoreFuture<'a, Vec<JobRow>>;

    /// Remove a job to claim it. Returns `false` when the row was already
    /// gone, meaning another poller claimed it first.
    fn delete_job(&self, id: i64) -> StoreFuture<'_, bool>;

    /// Sites bound to a client identifier, in alias order.
    fn fetch_sites_by_client<'a>(&'a self, identifier: &'a str) -> StoreFuture<'a, Vec<SiteRow>>;

    /// Printers configured for one site.
    fn fetch_printers_by_site<'a>(&'a self, site_alias: &'a str)
        -> StoreFuture<'a, Vec<PrinterRow>>;
}
