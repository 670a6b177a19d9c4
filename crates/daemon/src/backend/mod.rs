// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Delivery backends.
//!
//! The ingestion loop hands every sample to a [`SampleSink`]. The streaming
//! sink pushes it to the streaming broker before returning; the queue sink
//! only appends it to the durable queue, which a separate
//! [`DeliveryWorker`] drains to the message broker.

pub mod queued;
pub mod streaming;
pub mod watchdog;

pub use queued::{DeliverySettings, DeliveryWorker, QueueSink};
pub use streaming::{StreamingSettings, StreamingSink};
pub use watchdog::{Watchdog, WatchdogMonitor};

use fl_core::{Result, Sample};

/// Receives the samples of one ingestion pass.
pub trait SampleSink: Send {
    /// Starts a pass. `now_ms` is the wall-clock time captured once for it.
    fn begin_pass(&mut self, now_ms: i64) -> Result<()>;

    /// Delivers one sample. `first_run` is the table's flag before this batch.
    fn deliver(&mut self, sample: &Sample, first_run: bool) -> Result<()>;

    /// Called after the last sample of one table, before its cursor is saved.
    ///
    /// Returns false when the table's samples are not durable yet; the
    /// cursor then stays in memory only, so a crash re-fetches the records.
    fn end_table(&mut self, _table: &str) -> bool {
        true
    }

    /// Ends a pass that was not interrupted.
    fn end_pass(&mut self) -> Result<()>;

    /// Releases any connections. Called once, at shutdown.
    fn close(&mut self) {}
}
