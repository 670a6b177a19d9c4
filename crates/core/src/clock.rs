// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock source and instrument time conversion.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds between the Unix epoch and the instrument epoch (1990-01-01 UTC).
pub const EPOCH_OFFSET_SECONDS: i64 = 631_152_000;

/// Trait for abstracting wall-clock time, so time-dependent logic can be
/// driven by a controllable clock in tests.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

/// System clock implementation using `std::time::SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

impl<C: ClockSource + ?Sized> ClockSource for &C {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

impl<C: ClockSource + ?Sized> ClockSource for Arc<C> {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

/// Converts an instrument timestamp to delivery milliseconds.
///
/// The instrument reports seconds since its own epoch in UTC. The raw
/// (non-DST) timezone offset of the station is then subtracted, which is
/// what downstream consumers have always received. This mis-converts
/// during daylight-saving transitions in zones that observe DST.
pub fn delivery_timestamp_ms(instrument_epoch_seconds: i64, raw_offset_ms: i64) -> i64 {
    instrument_epoch_seconds
        .saturating_add(EPOCH_OFFSET_SECONDS)
        .saturating_mul(1000)
        .saturating_sub(raw_offset_ms)
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
