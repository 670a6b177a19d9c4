// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative cancellation for worker threads.
//!
//! A [`CancelToken`] is cloned into every blocking loop. Loops check it at
//! their head and sleep through [`CancelToken::sleep`], which wakes as soon
//! as the token is cancelled.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// Shared cancellation flag with an interruptible sleep.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes every sleeper. Idempotent.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock().unwrap_or_else(|e| e.into_inner());
        *cancelled = true;
        self.inner.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sleeps for `duration` or until cancelled.
    ///
    /// Returns true if the full duration elapsed, false if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.inner.cancelled.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if *cancelled {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            cancelled = match self.inner.wake.wait_timeout(cancelled, deadline - now) {
                Ok((guard, _)) => guard,
                Err(e) => e.into_inner().0,
            };
        }
    }
}

#[cfg(test)]
#[path = "cancel_tests.rs"]
mod tests;
