// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Operator alerts spooled to disk.
//!
//! Each alert becomes one JSON document in the outbox directory; an
//! external mailer picks them up. Files are written under a temporary name
//! and renamed, so the mailer never sees a partial document.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use fl_core::{AlertCategory, Alerter};
use serde::{Deserialize, Serialize};

/// Delivery style requested from the mailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Full email.
    Mail,
    /// Short text message.
    Text,
}

/// One spooled alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDocument {
    pub created_at: DateTime<Utc>,
    pub kind: AlertKind,
    pub source: String,
    pub category: AlertCategory,
    pub subject: String,
    pub detail: String,
}

/// [`Alerter`] writing JSON documents into an outbox directory.
#[derive(Debug)]
pub struct SpoolAlerter {
    outbox: PathBuf,
    sequence: AtomicU64,
}

impl SpoolAlerter {
    pub fn new(outbox: impl Into<PathBuf>) -> Self {
        SpoolAlerter {
            outbox: outbox.into(),
            sequence: AtomicU64::new(0),
        }
    }

    fn spool(&self, kind: AlertKind, source: &str, category: AlertCategory, detail: &str) -> bool {
        let created_at = Utc::now();
        tracing::error!(%source, %category, ?kind, %detail, "operator alert");

        let document = AlertDocument {
            created_at,
            kind,
            source: source.to_string(),
            category,
            subject: format!("[{source}] {category}"),
            detail: detail.to_string(),
        };
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let name = format!(
            "{}-{}-{seq}.json",
            created_at.format("%Y%m%dT%H%M%S%.3fZ"),
            category.as_str()
        );

        match self.write(&name, &document) {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "alert spooled");
                true
            }
            Err(e) => {
                tracing::error!(outbox = %self.outbox.display(), error = %e, "unable to spool alert");
                false
            }
        }
    }

    fn write(&self, name: &str, document: &AlertDocument) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.outbox)?;
        let json = serde_json::to_vec_pretty(document)?;
        let path = self.outbox.join(name);
        let tmp = self.outbox.join(format!(".{name}.tmp"));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(path)
    }
}

impl Alerter for SpoolAlerter {
    fn send_alert(&self, source: &str, category: AlertCategory, detail: &str) -> bool {
        self.spool(AlertKind::Mail, source, category, detail)
    }

    fn send_text(&self, source: &str, category: AlertCategory, detail: &str) -> bool {
        self.spool(AlertKind::Text, source, category, detail)
    }
}

#[cfg(test)]
#[path = "spool_tests.rs"]
mod tests;
