// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming broker over framed JSON.

use std::net::TcpStream;
use std::time::Duration;

use fl_core::{ChannelMap, FailureKind, LinkError, LinkResult, StreamConnection, StreamingBroker};
use serde::{Deserialize, Serialize};

use super::{exchange, open_tcp, IO_TIMEOUT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StreamRequest {
    Open { client_name: String },
    Flush { channels: ChannelMap },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StreamResponse {
    Opened,
    Flushed { count: usize },
    Error { kind: FailureKind, message: String },
}

/// Opens one TCP connection per client name.
#[derive(Debug, Clone)]
pub struct TcpStreamingBroker {
    timeout: Duration,
}

impl Default for TcpStreamingBroker {
    fn default() -> Self {
        TcpStreamingBroker { timeout: IO_TIMEOUT }
    }
}

impl TcpStreamingBroker {
    pub fn new(timeout: Duration) -> Self {
        TcpStreamingBroker { timeout }
    }
}

struct TcpStreamConnection {
    client_name: String,
    stream: Option<TcpStream>,
}

impl StreamingBroker for TcpStreamingBroker {
    fn open(&self, address: &str, client_name: &str) -> LinkResult<Box<dyn StreamConnection>> {
        let mut stream = open_tcp(address, self.timeout)?;
        let request = StreamRequest::Open {
            client_name: client_name.to_string(),
        };
        match exchange(&mut stream, &request)? {
            StreamResponse::Opened => {
                tracing::debug!(%address, %client_name, "streaming source opened");
                Ok(Box::new(TcpStreamConnection {
                    client_name: client_name.to_string(),
                    stream: Some(stream),
                }))
            }
            StreamResponse::Error { kind, message } => Err(LinkError::new(kind, message)),
            other => Err(LinkError::protocol(format!("unexpected answer to open: {other:?}"))),
        }
    }
}

impl StreamConnection for TcpStreamConnection {
    fn flush(&mut self, channels: &ChannelMap) -> LinkResult<usize> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| LinkError::not_connected("flush requires a connection"))?;
        let request = StreamRequest::Flush {
            channels: channels.clone(),
        };
        match exchange(stream, &request) {
            Ok(StreamResponse::Flushed { count }) => Ok(count),
            Ok(StreamResponse::Error { kind, message }) => Err(LinkError::new(kind, message)),
            Ok(other) => Err(LinkError::protocol(format!("unexpected answer to flush: {other:?}"))),
            Err(e) => {
                self.stream = None;
                Err(e)
            }
        }
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!(client_name = %self.client_name, "streaming source closed");
        }
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
