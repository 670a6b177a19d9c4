// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod cursors;
pub mod decode;
pub mod queue;

use chrono::{DateTime, SecondsFormat};

/// Formats ms since the Unix epoch as RFC 3339 UTC with millisecond precision.
///
/// Values outside chrono's range are printed as the raw number.
pub(crate) fn format_time(ms: i64) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(t) => t.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => format!("{ms}ms"),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
