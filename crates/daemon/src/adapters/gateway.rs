// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Instrument access through a table gateway.
//!
//! The gateway owns the datalogger's link-layer protocol and exposes table
//! reads as framed JSON requests. Any I/O failure drops the connection, so
//! a half-read response can never be mistaken for the next one.

use std::net::TcpStream;
use std::time::Duration;

use fl_core::{FailureKind, Instrument, LinkError, LinkResult, Record, TableDescriptor};
use serde::{Deserialize, Serialize};

use super::{exchange, open_tcp, IO_TIMEOUT};

/// Request sent to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GatewayRequest {
    Connect { station_id: u16 },
    ListTables,
    FetchByRecordNo { table: String, from_record_no: i64 },
    FetchByDuration { table: String, days: u32 },
    FetchByTimestamp { table: String, from_timestamp_ms: i64 },
}

/// Response from the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GatewayResponse {
    Connected { answered: bool },
    Tables { tables: Vec<TableDescriptor> },
    Records { records: Vec<Record> },
    Error { kind: FailureKind, message: String },
}

/// [`Instrument`] backed by a gateway connection.
pub struct GatewayInstrument {
    stream: Option<TcpStream>,
    timeout: Duration,
}

impl Default for GatewayInstrument {
    fn default() -> Self {
        Self::new(IO_TIMEOUT)
    }
}

impl GatewayInstrument {
    pub fn new(timeout: Duration) -> Self {
        GatewayInstrument {
            stream: None,
            timeout,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn request(&mut self, request: &GatewayRequest) -> LinkResult<GatewayResponse> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| LinkError::not_connected("instrument request requires a connection"))?;
        match exchange(stream, request) {
            Ok(GatewayResponse::Error { kind, message }) => Err(LinkError::new(kind, message)),
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::debug!(error = %e, "gateway exchange failed, dropping connection");
                self.stream = None;
                Err(e)
            }
        }
    }

    fn fetch(&mut self, request: GatewayRequest) -> LinkResult<Vec<Record>> {
        match self.request(&request)? {
            GatewayResponse::Records { records } => Ok(records),
            other => Err(unexpected(&request, &other)),
        }
    }
}

fn unexpected(request: &GatewayRequest, response: &GatewayResponse) -> LinkError {
    LinkError::protocol(format!("gateway answered {response:?} to {request:?}"))
}

impl Instrument for GatewayInstrument {
    fn connect(&mut self, address: &str, station_id: u16) -> LinkResult<bool> {
        self.stream = None;
        self.stream = Some(open_tcp(address, self.timeout)?);
        let request = GatewayRequest::Connect { station_id };
        match self.request(&request)? {
            GatewayResponse::Connected { answered } => {
                if !answered {
                    self.stream = None;
                }
                Ok(answered)
            }
            other => {
                self.stream = None;
                Err(unexpected(&request, &other))
            }
        }
    }

    fn list_tables(&mut self) -> LinkResult<Vec<TableDescriptor>> {
        let request = GatewayRequest::ListTables;
        match self.request(&request)? {
            GatewayResponse::Tables { tables } => Ok(tables),
            other => Err(unexpected(&request, &other)),
        }
    }

    fn fetch_by_record_no(&mut self, table: &str, from_record_no: i64) -> LinkResult<Vec<Record>> {
        self.fetch(GatewayRequest::FetchByRecordNo {
            table: table.to_string(),
            from_record_no,
        })
    }

    fn fetch_by_duration(&mut self, table: &str, days: u32) -> LinkResult<Vec<Record>> {
        self.fetch(GatewayRequest::FetchByDuration {
            table: table.to_string(),
            days,
        })
    }

    fn fetch_by_timestamp(&mut self, table: &str, from_timestamp_ms: i64) -> LinkResult<Vec<Record>> {
        self.fetch(GatewayRequest::FetchByTimestamp {
            table: table.to_string(),
            from_timestamp_ms,
        })
    }

    fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("gateway connection closed");
        }
    }
}

impl From<LinkError> for GatewayResponse {
    fn from(e: LinkError) -> Self {
        GatewayResponse::Error {
            kind: e.kind,
            message: e.message,
        }
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
