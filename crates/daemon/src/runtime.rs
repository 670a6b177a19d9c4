// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Worker threads.
//!
//! Each long-running activity (ingestion, queue delivery, the watchdog) is a
//! [`Job`] on its own named thread. A job that ends with a fatal error, or
//! panics, reports an [`ExitReason`] on the shared event channel; the main
//! thread waits on that channel and runs the shutdown coordinator.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use fl_core::{CancelToken, Error, ExitReason, Result};

/// Interval between checks while waiting for a worker to finish.
const JOIN_POLL: Duration = Duration::from_millis(20);

/// A long-running activity owned by one worker thread.
pub trait Job: Send {
    /// Thread name, also used in log lines.
    fn name(&self) -> &str;

    /// Runs until the job's cancel token fires or a fatal error occurs.
    fn run(&mut self) -> Result<()>;

    /// Releases connections. Called after `run` has returned.
    fn close(&mut self) {}
}

/// Handle to a running job.
pub struct Worker {
    name: String,
    cancel: CancelToken,
    handle: JoinHandle<Box<dyn Job>>,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

/// Starts `job` on a new thread.
///
/// `cancel` must be the token the job watches.
pub fn spawn_worker(
    mut job: Box<dyn Job>,
    cancel: CancelToken,
    events: Sender<ExitReason>,
) -> std::io::Result<Worker> {
    let name = job.name().to_string();
    let thread_name = name.clone();
    let handle = thread::Builder::new().name(name.clone()).spawn(move || {
        tracing::info!(worker = %thread_name, "worker started");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.run()));
        if let Some(reason) = exit_reason(&thread_name, outcome) {
            let _ = events.send(reason);
        } else {
            tracing::info!(worker = %thread_name, "worker stopped");
        }
        job
    })?;
    Ok(Worker {
        name,
        cancel,
        handle,
    })
}

/// What a finished job means for the process, if anything.
fn exit_reason(worker: &str, outcome: std::thread::Result<Result<()>>) -> Option<ExitReason> {
    match outcome {
        Ok(Ok(())) => None,
        Ok(Err(Error::Fatal(reason))) => {
            tracing::error!(%worker, %reason, "worker stopped on a fatal condition");
            Some(reason)
        }
        Ok(Err(e)) => {
            tracing::error!(%worker, error = %e, "worker failed");
            Some(ExitReason::WorkerFailed(format!("{worker}: {e}")))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(%worker, %message, "worker panicked");
            Some(ExitReason::WorkerFailed(format!("{worker} panicked: {message}")))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Worker {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cancels the job and waits up to `grace` for its thread to end.
    ///
    /// Returns the job so the caller can close it, or `None` if the thread
    /// is still busy (it is left detached) or panicked.
    pub fn stop(self, grace: Duration) -> Option<Box<dyn Job>> {
        self.cancel.cancel();
        let deadline = Instant::now() + grace;
        while !self.handle.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!(
                    worker = %self.name,
                    grace_secs = grace.as_secs(),
                    "worker did not stop in time, abandoning it"
                );
                return None;
            }
            thread::sleep(JOIN_POLL);
        }
        match self.handle.join() {
            Ok(job) => Some(job),
            Err(_) => {
                tracing::warn!(worker = %self.name, "worker thread could not be joined");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
