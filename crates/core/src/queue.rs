// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable delivery queue.
//!
//! Messages waiting for the message broker are held in memory in FIFO order
//! and written to disk as a record file. Before the file is overwritten it is
//! copied to a `.backup` sibling, so a crash mid-write always leaves one
//! complete copy behind.
//!
//! The queue itself is not synchronized. Producer and consumer share it
//! behind a single `Mutex`, held for one operation at a time and never
//! across a network call.

use std::collections::VecDeque;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::framing::{self, FrameError};

/// File kind written into the queue file's header frame.
pub const QUEUE_FILE_KIND: &str = "packet_queue";

/// Default file name of the persisted queue.
pub const QUEUE_FILE_NAME: &str = "packet_queue.data";

/// Error type for queue persistence.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The file exists but is not a queue file. Its contents are undelivered
    /// data, so this is never papered over with an empty queue.
    #[error("queue file {path} has the wrong shape: {source}")]
    WrongShape { path: PathBuf, source: FrameError },

    /// The file could not be read or parsed.
    #[error("unable to load queue file {path}: {source}")]
    Load { path: PathBuf, source: FrameError },

    /// The queue could not be written.
    #[error("unable to write queue file {path}: {source}")]
    Save { path: PathBuf, source: FrameError },

    /// The backup copy could not be made.
    #[error("unable to back up queue file to {path}: {source}")]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// One outbound message waiting for the message broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    /// Encoded sample envelope.
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
    /// Wall-clock time the message was enqueued, ms since the Unix epoch.
    pub enqueue_time_ms: i64,
    pub table: String,
    pub value_name: String,
}

impl QueuedMessage {
    pub fn new(
        payload: Vec<u8>,
        enqueue_time_ms: i64,
        table: impl Into<String>,
        value_name: impl Into<String>,
    ) -> Self {
        QueuedMessage {
            payload,
            enqueue_time_ms,
            table: table.into(),
            value_name: value_name.into(),
        }
    }

    /// Broker topic for this message under the given root.
    pub fn topic(&self, root: &str) -> String {
        format!("{}/{}/{}", root, self.table, self.value_name)
    }
}

/// Serde adapter storing payload bytes as a hex string.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// Ordered, disk-backed queue of pending outbound messages.
#[derive(Debug)]
pub struct DeliveryQueue {
    path: PathBuf,
    messages: VecDeque<QueuedMessage>,
}

impl DeliveryQueue {
    /// Loads the queue at `path`.
    ///
    /// - No file: an empty queue is created and persisted.
    /// - A file: it is first copied to the backup sibling, then parsed.
    ///   Anything that does not parse as a queue file is an error.
    pub fn load_from_disk(path: &Path) -> QueueResult<Self> {
        tracing::info!(path = %path.display(), "loading packet queue from disk");

        if !path.exists() {
            let queue = DeliveryQueue {
                path: path.to_path_buf(),
                messages: VecDeque::new(),
            };
            queue.drain_to_disk()?;
            tracing::info!("created empty packet queue");
            return Ok(queue);
        }

        backup(path)?;

        let messages = framing::read_file::<QueuedMessage>(path, QUEUE_FILE_KIND).map_err(|e| {
            if e.is_wrong_shape() {
                QueueError::WrongShape {
                    path: path.to_path_buf(),
                    source: e,
                }
            } else {
                QueueError::Load {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        if messages.is_empty() {
            tracing::info!("loaded empty packet queue from disk");
        } else {
            tracing::info!(queued = messages.len(), "loaded queued packets from disk");
        }

        Ok(DeliveryQueue {
            path: path.to_path_buf(),
            messages: messages.into(),
        })
    }

    /// Reads the messages in a queue file without backing up or creating it.
    pub fn read(path: &Path) -> Result<Vec<QueuedMessage>, FrameError> {
        framing::read_file(path, QUEUE_FILE_KIND)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the backup sibling.
    pub fn backup_path(&self) -> PathBuf {
        backup_path(&self.path)
    }

    /// Appends a message at the back.
    pub fn enqueue(&mut self, message: QueuedMessage) {
        self.messages.push_back(message);
    }

    /// The oldest message, left in place.
    pub fn peek(&self) -> Option<&QueuedMessage> {
        self.messages.front()
    }

    /// Removes and returns the oldest message.
    pub fn remove_front(&mut self) -> Option<QueuedMessage> {
        self.messages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterates messages from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedMessage> {
        self.messages.iter()
    }

    /// Writes the whole queue to disk, backing up the previous file first.
    pub fn drain_to_disk(&self) -> QueueResult<()> {
        if self.path.exists() {
            backup(&self.path)?;
        }
        framing::write_file(&self.path, QUEUE_FILE_KIND, self.messages.iter()).map_err(|e| {
            QueueError::Save {
                path: self.path.clone(),
                source: e,
            }
        })
    }
}

/// `<file>.backup` next to the given file.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".backup");
    path.with_file_name(name)
}

fn backup(path: &Path) -> QueueResult<()> {
    let target = backup_path(path);
    match fs::copy(path, &target) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(QueueError::Backup { path: target, source: e }),
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
