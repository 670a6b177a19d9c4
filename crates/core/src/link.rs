// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Classified failures from remote links.
//!
//! Every collaborator (instrument, streaming broker, message broker) reports
//! failures as a [`LinkError`]. Its [`FailureKind`] decides whether the
//! caller should start a reconnect episode or give up on the current
//! operation.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

/// Category of a link failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Blocking I/O was interrupted, usually because shutdown is underway.
    Interrupted,
    /// The operation requires a connection and the link is already known down.
    NotConnected,
    /// The peer reset the connection.
    ConnectionReset,
    /// The peer refused the connection.
    ConnectionRefused,
    /// No route to the peer.
    NoRoute,
    /// The stream ended in the middle of a reply.
    UnexpectedEof,
    /// A client handler for this link already exists.
    ClientConflict,
    /// The client library is in a state it cannot continue from.
    IllegalState,
    /// The peer sent something that does not parse.
    Protocol,
    /// Anything else.
    Other,
}

impl FailureKind {
    /// True when this failure means the link should be re-established.
    pub fn warrants_reconnect(self) -> bool {
        match self {
            FailureKind::ConnectionReset
            | FailureKind::ConnectionRefused
            | FailureKind::NoRoute
            | FailureKind::UnexpectedEof
            | FailureKind::IllegalState => true,
            FailureKind::Interrupted
            | FailureKind::NotConnected
            | FailureKind::ClientConflict
            | FailureKind::Protocol
            | FailureKind::Other => false,
        }
    }

    /// True for failures of the network itself, as opposed to the local
    /// client or a malformed reply.
    pub fn is_network(self) -> bool {
        matches!(
            self,
            FailureKind::ConnectionReset
                | FailureKind::ConnectionRefused
                | FailureKind::NoRoute
                | FailureKind::UnexpectedEof
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Interrupted => "interrupted",
            FailureKind::NotConnected => "not connected",
            FailureKind::ConnectionReset => "connection reset",
            FailureKind::ConnectionRefused => "connection refused",
            FailureKind::NoRoute => "no route to host",
            FailureKind::UnexpectedEof => "unexpected end of stream",
            FailureKind::ClientConflict => "client handler already exists",
            FailureKind::IllegalState => "illegal client state",
            FailureKind::Protocol => "protocol error",
            FailureKind::Other => "error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by a link collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct LinkError {
    pub kind: FailureKind,
    pub message: String,
}

impl LinkError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        LinkError {
            kind,
            message: message.into(),
        }
    }

    pub fn not_connected(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotConnected, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Protocol, message)
    }

    pub fn warrants_reconnect(&self) -> bool {
        self.kind.warrants_reconnect()
    }

    pub fn is_network(&self) -> bool {
        self.kind.is_network()
    }
}

impl From<io::Error> for LinkError {
    fn from(e: io::Error) -> Self {
        let kind = match e.kind() {
            io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                FailureKind::Interrupted
            }
            io::ErrorKind::NotConnected => FailureKind::NotConnected,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => FailureKind::ConnectionReset,
            io::ErrorKind::ConnectionRefused => FailureKind::ConnectionRefused,
            io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
                FailureKind::NoRoute
            }
            io::ErrorKind::UnexpectedEof => FailureKind::UnexpectedEof,
            io::ErrorKind::InvalidData => FailureKind::Protocol,
            _ => FailureKind::Other,
        };
        LinkError::new(kind, e.to_string())
    }
}

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

#[cfg(test)]
#[path = "link_tests.rs"]
mod tests;
