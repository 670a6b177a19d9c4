// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Orderly shutdown.
//!
//! Whatever ends the process (a stop signal, a fatal worker error, the
//! watchdog), the same sequence runs:
//!
//! 1. alert the operator if the exit is a failure;
//! 2. stop ingestion, so nothing new reaches the queue;
//! 3. stop delivery and the watchdog;
//! 4. persist the queue, then the cursors;
//! 5. close every connection.
//!
//! Persisting after the workers stop means the files reflect every message
//! the broker acknowledged and every record that was ingested.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fl_core::{Alerter, CursorStore, DeliveryQueue, ExitReason};

use crate::ingest::lock;
use crate::runtime::{Job, Worker};

/// Runs the shutdown sequence once.
pub struct ShutdownCoordinator {
    source: String,
    alerter: Arc<dyn Alerter>,
    cursors: Arc<Mutex<CursorStore>>,
    queue: Option<Arc<Mutex<DeliveryQueue>>>,
    grace: Duration,
}

impl ShutdownCoordinator {
    pub fn new(
        source: impl Into<String>,
        alerter: Arc<dyn Alerter>,
        cursors: Arc<Mutex<CursorStore>>,
        queue: Option<Arc<Mutex<DeliveryQueue>>>,
        grace: Duration,
    ) -> Self {
        ShutdownCoordinator {
            source: source.into(),
            alerter,
            cursors,
            queue,
            grace,
        }
    }

    /// Stops `ingest` and then `others`, persists state and returns the
    /// process exit code for `reason`.
    pub fn shutdown(self, reason: &ExitReason, ingest: Option<Worker>, others: Vec<Worker>) -> i32 {
        if reason.is_failure() {
            tracing::error!(%reason, "shutting down");
        } else {
            tracing::info!(%reason, "shutting down");
        }
        self.alert(reason);

        let mut jobs: Vec<Box<dyn Job>> = Vec::new();
        if let Some(worker) = ingest {
            jobs.extend(self.stop(worker));
        }
        for worker in others {
            jobs.extend(self.stop(worker));
        }

        self.persist();

        for job in &mut jobs {
            tracing::debug!(worker = job.name(), "closing");
            job.close();
        }

        let code = reason.code();
        tracing::info!(code, "shutdown complete");
        code
    }

    fn alert(&self, reason: &ExitReason) {
        let Some(category) = reason.alert_category() else {
            return;
        };
        let detail = reason.to_string();
        let sent = match reason {
            ExitReason::WatchdogExpired { .. } => self.alerter.send_text(&self.source, category, &detail),
            _ => self.alerter.send_alert(&self.source, category, &detail),
        };
        if !sent {
            tracing::warn!(%category, "operator alert could not be sent");
        }
    }

    fn stop(&self, worker: Worker) -> Option<Box<dyn Job>> {
        let name = worker.name().to_string();
        tracing::debug!(worker = %name, "stopping");
        worker.stop(self.grace)
    }

    fn persist(&self) {
        if let Some(queue) = &self.queue {
            let queue = lock(queue);
            match queue.drain_to_disk() {
                Ok(()) => tracing::info!(queued = queue.len(), "packet queue saved"),
                Err(e) => tracing::error!(error = %e, "unable to save packet queue"),
            }
        }
        let cursors = lock(&self.cursors);
        if cursors.save_logged() {
            tracing::info!(tables = cursors.len(), "cursor store saved");
        }
    }
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
