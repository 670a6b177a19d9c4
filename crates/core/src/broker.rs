// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Downstream broker collaborators.
//!
//! Two kinds of sink are supported:
//! - a streaming broker, which takes synchronous flushes of named channels;
//! - a message broker, which takes published messages on topics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::link::LinkResult;

/// Payload of one channel in a flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ChannelData {
    /// An encoded sample envelope.
    Bytes(Vec<u8>),
    Int32(i32),
    Int64(i64),
}

/// One timestamped channel entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub timestamp_ms: i64,
    pub data: ChannelData,
}

/// An ordered set of channel entries sent in one flush.
///
/// Channel names are unique; putting a name twice replaces the earlier entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelMap {
    channels: Vec<Channel>,
}

impl ChannelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, name: impl Into<String>, timestamp_ms: i64, data: ChannelData) {
        let entry = Channel {
            name: name.into(),
            timestamp_ms,
            data,
        };
        match self.channels.iter_mut().find(|c| c.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.channels.push(entry),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }
}

/// An open streaming-broker source.
pub trait StreamConnection: Send {
    /// Sends the channel map and returns the number of channels flushed.
    fn flush(&mut self, channels: &ChannelMap) -> LinkResult<usize>;

    /// Closes the source.
    fn close(&mut self) {}
}

/// Opens streaming-broker sources.
pub trait StreamingBroker: Send + Sync {
    fn open(&self, address: &str, client_name: &str) -> LinkResult<Box<dyn StreamConnection>>;
}

/// Delivery guarantee requested for a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl QoS {
    pub fn level(self) -> u8 {
        match self {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "qos{}", self.level())
    }
}

/// A connected message-broker client.
pub trait BrokerClient: Send {
    /// Publishes one message, returning once the broker has acknowledged it
    /// at the requested level.
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> LinkResult<()>;

    /// Whether the client still believes its session is up.
    fn is_connected(&self) -> bool {
        true
    }

    fn disconnect(&mut self) {}
}

/// Connects message-broker clients.
pub trait MessageBroker: Send + Sync {
    fn connect(
        &self,
        broker_uri: &str,
        client_id: &str,
        persistence_dir: &std::path::Path,
    ) -> LinkResult<Box<dyn BrokerClient>>;
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
