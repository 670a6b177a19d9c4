// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for fl-core operations.

use std::fmt;

use thiserror::Error;

use crate::alert::AlertCategory;
use crate::codec::CodecError;
use crate::framing::FrameError;
use crate::link::LinkError;
use crate::queue::QueueError;

/// Why the process is stopping.
///
/// Each reason maps to a process exit code. Every reason except
/// [`ExitReason::Requested`] is a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// An operator asked the process to stop.
    Requested,
    /// A worker hit an unexpected error or panicked.
    WorkerFailed(String),
    /// A link ran out of reconnect attempts.
    ReconnectExhausted { link: String, attempts: u32 },
    /// The persisted queue could not be loaded.
    QueueLoadFailed(String),
    /// The delivery queue stopped draining.
    WatchdogExpired { queued: usize },
}

impl ExitReason {
    /// Process exit code for this reason.
    pub fn code(&self) -> i32 {
        match self {
            ExitReason::Requested => 0,
            ExitReason::WorkerFailed(_) => 1,
            ExitReason::ReconnectExhausted { .. } => 2,
            ExitReason::QueueLoadFailed(_) => 3,
            ExitReason::WatchdogExpired { .. } => 4,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.code() != 0
    }

    /// Alert category for a failure, `None` for a requested stop.
    pub fn alert_category(&self) -> Option<AlertCategory> {
        match self {
            ExitReason::Requested => None,
            ExitReason::WorkerFailed(_) => Some(AlertCategory::WorkerFailure),
            ExitReason::ReconnectExhausted { .. } => Some(AlertCategory::ReconnectExhausted),
            ExitReason::QueueLoadFailed(_) => Some(AlertCategory::Storage),
            ExitReason::WatchdogExpired { .. } => Some(AlertCategory::Watchdog),
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Requested => write!(f, "stop requested"),
            ExitReason::WorkerFailed(detail) => write!(f, "worker failed: {detail}"),
            ExitReason::ReconnectExhausted { link, attempts } => {
                write!(f, "gave up reconnecting to {link} after {attempts} attempts")
            }
            ExitReason::QueueLoadFailed(detail) => write!(f, "unable to load packet queue: {detail}"),
            ExitReason::WatchdogExpired { queued } => {
                write!(f, "Packet queue flush watchdog expired with {queued} packets")
            }
        }
    }
}

/// All possible errors that can occur in fl-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("record file error: {0}")]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("link error: {0}")]
    Link(#[from] LinkError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("fatal: {0}")]
    Fatal(ExitReason),
}

impl Error {
    /// The exit reason if this error must stop the process.
    pub fn exit_reason(&self) -> Option<&ExitReason> {
        match self {
            Error::Fatal(reason) => Some(reason),
            _ => None,
        }
    }
}

/// A specialized Result type for fl-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
