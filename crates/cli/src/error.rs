// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use fl_core::framing::FrameError;
use fl_core::CodecError;
use thiserror::Error;

/// All possible errors from the fieldlink operator tool.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid hex: {0}\n  hint: pass the envelope bytes as an even-length hex string")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("cannot decode envelope: {0}")]
    Codec(#[from] CodecError),

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: FrameError,
    },

    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wraps a record file failure with the path that was read.
    pub(crate) fn read(path: &std::path::Path, source: FrameError) -> Self {
        match source {
            FrameError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Error::NotFound(path.to_path_buf())
            }
            source => Error::Read {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Result type alias for operator tool operations.
pub type Result<T> = std::result::Result<T, Error>;
