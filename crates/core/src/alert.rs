// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound operator alerts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    /// A link dropped and a reconnect episode started.
    ConnectionLost,
    /// The reconnect ceiling was reached.
    ReconnectExhausted,
    /// The delivery queue stopped draining.
    Watchdog,
    /// Persisted state could not be loaded.
    Storage,
    /// A worker failed unexpectedly.
    WorkerFailure,
}

impl AlertCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertCategory::ConnectionLost => "connection_lost",
            AlertCategory::ReconnectExhausted => "reconnect_exhausted",
            AlertCategory::Watchdog => "watchdog",
            AlertCategory::Storage => "storage",
            AlertCategory::WorkerFailure => "worker_failure",
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivers alerts to an operator.
///
/// Both methods return whether the alert was handed off; a failed alert is
/// never an error for the caller.
pub trait Alerter: Send + Sync {
    /// Sends a full alert, such as an email with diagnostic detail.
    fn send_alert(&self, source: &str, category: AlertCategory, detail: &str) -> bool;

    /// Sends a short text message, such as an SMS.
    fn send_text(&self, source: &str, category: AlertCategory, detail: &str) -> bool;
}
