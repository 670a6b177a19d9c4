// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue flush watchdog.
//!
//! The delivery worker arms the watchdog whenever it finds messages waiting
//! and disarms it once it sees the queue empty. If the queue stays non-empty
//! for longer than the ceiling, the monitor ends the process so an operator
//! hears about a broker that accepts connections but never drains.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fl_core::{CancelToken, ClockSource, DeliveryQueue, Error, ExitReason, Result};

use crate::ingest::lock;
use crate::runtime::Job;

/// How often the monitor looks at the watchdog.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Tracks how long the queue has been waiting for a successful drain.
pub struct Watchdog {
    ceiling: Duration,
    armed_at: Mutex<Option<i64>>,
    clock: Arc<dyn ClockSource>,
}

impl Watchdog {
    pub fn new(ceiling: Duration, clock: Arc<dyn ClockSource>) -> Self {
        Watchdog {
            ceiling,
            armed_at: Mutex::new(None),
            clock,
        }
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Starts the countdown. Does nothing if it is already running.
    pub fn arm(&self) {
        let mut armed_at = lock(&self.armed_at);
        if armed_at.is_none() {
            *armed_at = Some(self.clock.now_ms());
            tracing::debug!(ceiling_secs = self.ceiling.as_secs(), "watchdog armed");
        }
    }

    pub fn disarm(&self) {
        if lock(&self.armed_at).take().is_some() {
            tracing::debug!("watchdog disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        lock(&self.armed_at).is_some()
    }

    /// True once the countdown has run for at least the ceiling.
    pub fn expired(&self) -> bool {
        let Some(armed_at) = *lock(&self.armed_at) else {
            return false;
        };
        let ceiling_ms = i64::try_from(self.ceiling.as_millis()).unwrap_or(i64::MAX);
        self.clock.now_ms().saturating_sub(armed_at) >= ceiling_ms
    }
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("ceiling", &self.ceiling)
            .field("armed_at", &*lock(&self.armed_at))
            .finish()
    }
}

/// Worker that turns an expired watchdog into a process exit.
pub struct WatchdogMonitor {
    watchdog: Arc<Watchdog>,
    queue: Arc<Mutex<DeliveryQueue>>,
    cancel: CancelToken,
    interval: Duration,
}

impl WatchdogMonitor {
    pub fn new(watchdog: Arc<Watchdog>, queue: Arc<Mutex<DeliveryQueue>>, cancel: CancelToken) -> Self {
        WatchdogMonitor {
            watchdog,
            queue,
            cancel,
            interval: CHECK_INTERVAL,
        }
    }

    #[cfg(test)]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// The exit reason if the watchdog has expired.
    pub fn check(&self) -> Option<ExitReason> {
        if !self.watchdog.expired() {
            return None;
        }
        let queued = lock(&self.queue).len();
        tracing::error!(
            queued,
            ceiling_secs = self.watchdog.ceiling().as_secs(),
            "packet queue flush watchdog expired"
        );
        Some(ExitReason::WatchdogExpired { queued })
    }
}

impl Job for WatchdogMonitor {
    fn name(&self) -> &str {
        "watchdog"
    }

    fn run(&mut self) -> Result<()> {
        while self.cancel.sleep(self.interval) {
            if let Some(reason) = self.check() {
                return Err(Error::Fatal(reason));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
