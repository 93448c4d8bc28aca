// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed job store.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{JobRow, JobStore, PrinterRow, SiteRow, StorageError, StoreFuture};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sites (
        alias TEXT PRIMARY KEY NOT NULL,
        machine_uuid TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS sites_machine_uuid ON sites (machine_uuid)",
    "CREATE TABLE IF NOT EXISTS printers (
        id INTEGER NOT NULL,
        site_alias TEXT NOT NULL,
        name TEXT NOT NULL,
        alias TEXT NOT NULL,
        driver TEXT,
        driver_model TEXT,
        output TEXT,
        codepage TEXT,
        PRIMARY KEY (site_alias, id)
    )",
    "CREATE TABLE IF NOT EXISTS printer_jobs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_alias TEXT NOT NULL,
        printer_id INTEGER NOT NULL,
        text TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS printer_jobs_site_alias ON printer_jobs (site_alias)",
];

fn unavailable(e: sqlx::Error) -> StorageError {
    StorageError::Unavailable(e.to_string())
}

fn query_failed(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => unavailable(e),
        other => StorageError::Query(other.to_string()),
    }
}

/// Job store over a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and apply the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(unavailable)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(unavailable)?;
        let store = Self { pool };
        store.migrate().await?;
        tracing::info!(url, "job store ready");
        Ok(store)
    }

    /// Private in-memory database on a single pinned connection.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(unavailable)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(unavailable)?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and indexes if they do not exist.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        for stmt in SCHEMA {
            sqlx::query(*stmt).execute(&self.pool).await.map_err(query_failed)?;
        }
        Ok(())
    }

    pub async fn insert_site(&self, alias: &str, machine_uuid: &str) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO sites (alias, machine_uuid) VALUES (?, ?)")
            .bind(alias)
            .bind(machine_uuid)
            .execute(&self.pool)
            .await
            .map_err(query_failed)?;
        Ok(())
    }

    pub async fn insert_printer(&self, printer: &PrinterRow) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO printers (id, site_alias, name, alias, driver, driver_model, output, codepage)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(printer.id)
        .bind(&printer.site_alias)
        .bind(&printer.name)
        .bind(&printer.alias)
        .bind(&printer.driver)
        .bind(&printer.driver_model)
        .bind(&printer.output)
        .bind(&printer.codepage)
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;
        Ok(())
    }

    /// Insert a pending job and return its id.
    pub async fn insert_job(
        &self,
        site_alias: &str,
        printer_id: i64,
        text: &str,
    ) -> Result<i64, StorageError> {
        let result =
            sqlx::query("INSERT INTO printer_jobs (site_alias, printer_id, text) VALUES (?, ?, ?)")
                .bind(site_alias)
                .bind(printer_id)
                .bind(text)
                .execute(&self.pool)
                .await
                .map_err(query_failed)?;
        Ok(result.last_insert_rowid())
    }

    /// Ids of all jobs still pending, in id order.
    pub async fn pending_job_ids(&self) -> Result<Vec<i64>, StorageError> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM printer_jobs ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl JobStore for SqliteStore {
    fn fetch_pending_jobs<'a>(&'a self, site_aliases: &'a [String]) -> StoreFuture<'a, Vec<JobRow>> {
        Box::pin(async move {
            if site_aliases.is_empty() {
                return Ok(Vec::new());
            }
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT id, site_alias, printer_id, text FROM printer_jobs WHERE site_alias IN (",
            );
            let mut list = qb.separated(", ");
            for alias in site_aliases {
                list.push_bind(alias.as_str());
            }
            list.push_unseparated(") ORDER BY id");
            qb.build_query_as::<JobRow>().fetch_all(&self.pool).await.map_err(query_failed)
        })
    }

    fn delete_job(&self, id: i64) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM printer_jobs WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(query_failed)?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn fetch_sites_by_client<'a>(&'a self, identifier: &'a str) -> StoreFuture<'a, Vec<SiteRow>> {
        Box::pin(async move {
            sqlx::query_as::<_, SiteRow>(
                "SELECT alias, machine_uuid FROM sites WHERE machine_uuid = ? ORDER BY alias",
            )
            .bind(identifier)
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed)
        })
    }

    fn fetch_printers_by_site<'a>(
        &'a self,
        site_alias: &'a str,
    ) -> StoreFuture<'a, Vec<PrinterRow>> {
        Box::pin(async move {
            sqlx::query_as::<_, PrinterRow>(
                "SELECT id, site_alias, name, alias, driver, driver_model, output, codepage
                 FROM printers WHERE site_alias = ? ORDER BY id",
            )
            .bind(site_alias)
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed)
        })
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
