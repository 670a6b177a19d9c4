// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnect policy shared by every remote link.
//!
//! A reconnect *episode* starts when a caller finds its link broken and ends
//! when a connection is made, the attempt budget runs out, or the caller is
//! cancelled. One alert is sent per episode, on the first failed attempt.

use std::sync::Arc;
use std::time::Duration;

use crate::alert::{AlertCategory, Alerter};
use crate::cancel::CancelToken;
use crate::link::{LinkError, LinkResult};

/// Attempt budget and spacing for one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Maximum attempts per episode (`None` = unlimited).
    pub max_attempts: Option<u32>,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl ReconnectPolicy {
    /// Builds a policy from config values, where `0` attempts means unlimited.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        ReconnectPolicy {
            max_attempts: (max_attempts > 0).then_some(max_attempts),
            delay,
        }
    }

    pub fn unbounded(delay: Duration) -> Self {
        ReconnectPolicy {
            max_attempts: None,
            delay,
        }
    }

    /// True once `attempt` failures use up the budget.
    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::new(8640, Duration::from_secs(30))
    }
}

/// How a reconnect episode ended.
#[derive(Debug)]
pub enum ReconnectOutcome<T> {
    Connected(T),
    Exhausted { attempts: u32, last_error: LinkError },
    Cancelled,
}

/// Runs reconnect episodes for one named link.
pub struct ReconnectSupervisor {
    link: String,
    source: String,
    policy: ReconnectPolicy,
    alerter: Arc<dyn Alerter>,
}

impl ReconnectSupervisor {
    /// `link` names the remote side in logs; `source` names this process in alerts.
    pub fn new(
        link: impl Into<String>,
        source: impl Into<String>,
        policy: ReconnectPolicy,
        alerter: Arc<dyn Alerter>,
    ) -> Self {
        ReconnectSupervisor {
            link: link.into(),
            source: source.into(),
            policy,
            alerter,
        }
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Sends the connection-lost alert that opens an episode.
    ///
    /// Links that can break after connecting (a send failing on an open
    /// connection) call this themselves before counting their own retries.
    pub fn report_lost(&self, error: &LinkError) -> bool {
        let detail = format!(
            "Lost connection to {}: {}. Retrying every {}s.",
            self.link,
            error,
            self.policy.delay.as_secs()
        );
        self.alerter
            .send_alert(&self.source, AlertCategory::ConnectionLost, &detail)
    }

    /// Calls `connect` until it succeeds, the budget is spent, or `cancel` fires.
    ///
    /// `connect` receives the 1-based attempt number. The attempt counter
    /// starts over on every call, so each episode gets the full budget.
    pub fn attempt_reconnect<T, F>(&self, cancel: &CancelToken, mut connect: F) -> ReconnectOutcome<T>
    where
        F: FnMut(u32) -> LinkResult<T>,
    {
        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                return ReconnectOutcome::Cancelled;
            }
            attempt = attempt.saturating_add(1);

            match connect(attempt) {
                Ok(conn) => {
                    if attempt > 1 {
                        tracing::info!(link = %self.link, attempt, "reconnected");
                    } else {
                        tracing::info!(link = %self.link, "connected");
                    }
                    return ReconnectOutcome::Connected(conn);
                }
                Err(e) => {
                    tracing::warn!(link = %self.link, attempt, error = %e, "connection attempt failed");

                    if attempt == 1 {
                        self.report_lost(&e);
                    }

                    if self.policy.exhausted(attempt) {
                        tracing::error!(link = %self.link, attempts = attempt, "reconnect attempts exhausted");
                        return ReconnectOutcome::Exhausted {
                            attempts: attempt,
                            last_error: e,
                        };
                    }

                    if !cancel.sleep(self.policy.delay) {
                        return ReconnectOutcome::Cancelled;
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for ReconnectSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectSupervisor")
            .field("link", &self.link)
            .field("source", &self.source)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
#[path = "reconnect_tests.rs"]
mod tests;
