// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clients, sites, and printers as loaded for one session.

use std::collections::HashMap;
use std::fmt;

use spoolrelay_wire::PrinterRef;

use crate::store::{JobStore, PrinterRow, StorageError};

/// Prefix of the composite printer key.
pub const PRINTER_MAP_PREFIX: &str = "printer_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Printer {
    pub id: i64,
    pub name: String,
    pub alias: String,
    pub driver: Option<String>,
    pub driver_model: Option<String>,
    pub output: Option<String>,
    pub codepage: Option<String>,
}

impl Printer {
    /// Wire form forwarded to agents.
    pub fn to_ref(&self) -> PrinterRef {
        PrinterRef {
            id: self.id,
            name: self.name.clone(),
            alias: self.alias.clone(),
            driver: self.driver.clone(),
            driver_model: self.driver_model.clone(),
            output: self.output.clone(),
        }
    }
}

impl From<PrinterRow> for Printer {
    fn from(row: PrinterRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            alias: row.alias,
            driver: row.driver,
            driver_model: row.driver_model,
            output: row.output,
            codepage: row.codepage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub alias: String,
    pub printers: Vec<Printer>,
}

/// A connected agent and the sites it may poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub identifier: String,
    pub sites: Vec<Site>,
}

impl Client {
    /// Load the client's sites (one query) and each site's printers (one
    /// query per site).
    pub async fn load(store: &dyn JobStore, identifier: &str) -> Result<Self, StorageError> {
        let site_rows = store.fetch_sites_by_client(identifier).await?;
        let mut sites = Vec::with_capacity(site_rows.len());
        for row in site_rows {
            let printers = store.fetch_printers_by_site(&row.alias).await?;
            tracing::debug!(
                identifier,
                site = %row.alias,
                printers = printers.len(),
                "loaded site printers"
            );
            sites.push(Site {
                alias: row.alias,
                printers: printers.into_iter().map(Printer::from).collect(),
            });
        }
        Ok(Self { identifier: identifier.to_owned(), sites })
    }

    pub fn site_aliases(&self) -> Vec<String> {
        self.sites.iter().map(|s| s.alias.clone()).collect()
    }
}

/// Composite key resolving a job's bare `printer_id` within its site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrinterKey {
    pub site_alias: String,
    pub printer_id: i64,
}

impl fmt::Display for PrinterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PRINTER_MAP_PREFIX}{}{}", self.site_alias, self.printer_id)
    }
}

/// `(site_alias, printer_id)` → printer, for one client.
#[derive(Debug, Clone, Default)]
pub struct PrinterMap {
    printers: HashMap<PrinterKey, Printer>,
}

impl PrinterMap {
    pub fn build(client: &Client) -> Self {
        let mut printers = HashMap::new();
        for site in &client.sites {
            for printer in &site.printers {
                let key = PrinterKey { site_alias: site.alias.clone(), printer_id: printer.id };
                if let Some(prev) = printers.insert(key.clone(), printer.clone()) {
                    tracing::warn!(key = %key, replaced = %prev.alias, "duplicate printer key");
                }
            }
        }
        Self { printers }
    }

    pub fn resolve(&self, site_alias: &str, printer_id: i64) -> Option<&Printer> {
        self.printers.get(&PrinterKey { site_alias: site_alias.to_owned(), printer_id })
    }

    pub fn len(&self) -> usize {
        self.printers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.printers.is_empty()
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
