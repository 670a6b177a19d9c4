// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for daemon startup.

use thiserror::Error;

/// Errors that stop the daemon before its workers are running.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("another fieldlinkd instance is already running\n  hint: lock held on {0}")]
    AlreadyRunning(String),

    #[error("unable to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for daemon startup.
pub type Result<T> = std::result::Result<T, Error>;
