// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-dispatch frame and inbound frame classification.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::{self, Envelope};

/// Printer fields forwarded with a job. Carries no link back to the owning
/// site or client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterRef {
    pub id: i64,
    pub name: String,
    pub alias: String,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub driver_model: Option<String>,
    /// Connection target: host name or device path.
    #[serde(default)]
    pub output: Option<String>,
}

impl PrinterRef {
    /// Print queue name to submit to: the alias, or the connection target
    /// when no alias is configured.
    pub fn destination(&self) -> &str {
        if !self.alias.is_empty() {
            return &self.alias;
        }
        self.output.as_deref().unwrap_or_default()
    }
}

/// Relay → agent job delivery. Sent as a bare object, never inside an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDispatch {
    pub site_alias: String,
    pub text: String,
    pub printer: PrinterRef,
}

/// A frame received by an agent.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Dispatch(JobDispatch),
    Envelope(Envelope),
}

impl Inbound {
    /// Classify a raw text frame. Returns `None` for anything that is neither
    /// a job dispatch nor an envelope.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(strip_legacy_quotes(raw.trim())).ok()?;
        let obj = value.as_object()?;

        if obj.contains_key("text") && obj.contains_key("printer") {
            return serde_json::from_value(value).ok().map(Self::Dispatch);
        }
        if ["msg", "rta", "err"].iter().any(|k| obj.contains_key(*k)) {
            return envelope::from_value(value).map(Self::Envelope);
        }
        None
    }
}

/// Older relays wrapped job frames in a pair of single quotes.
fn strip_legacy_quotes(raw: &str) -> &str {
    raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')).unwrap_or(raw)
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
