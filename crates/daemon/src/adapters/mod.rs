// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Concrete collaborators.
//!
//! - [`gateway`]: the instrument, reached through a table gateway that
//!   speaks framed JSON over TCP;
//! - [`stream`]: the streaming broker, same framing;
//! - [`mqtt`]: the message broker, via `rumqttc`;
//! - [`spool`]: operator alerts, spooled for an external mailer.
//!
//! Both TCP adapters use the length-prefixed JSON frames of
//! [`fl_core::framing`]: one request frame, one response frame.

pub mod gateway;
pub mod mqtt;
pub mod spool;
pub mod stream;

pub use gateway::GatewayInstrument;
pub use mqtt::MqttBroker;
pub use spool::SpoolAlerter;
pub use stream::TcpStreamingBroker;

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use fl_core::framing::{self, FrameError};
use fl_core::{FailureKind, LinkError, LinkResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Connect and per-request timeout for the TCP adapters.
pub const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens a TCP connection with read and write timeouts set.
pub(crate) fn open_tcp(address: &str, timeout: Duration) -> LinkResult<TcpStream> {
    let addr = address.to_socket_addrs()?.next().ok_or_else(|| {
        LinkError::new(FailureKind::NoRoute, format!("{address} did not resolve"))
    })?;
    let stream = TcpStream::connect_timeout(&addr, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Sends one request frame and reads one response frame.
pub(crate) fn exchange<Req, Resp>(stream: &mut TcpStream, request: &Req) -> LinkResult<Resp>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    framing::write_frame(&mut *stream, request).map_err(frame_error)?;
    match framing::read_frame(&mut *stream).map_err(frame_error)? {
        Some(response) => Ok(response),
        None => Err(LinkError::new(FailureKind::UnexpectedEof, "peer closed the connection")),
    }
}

pub(crate) fn frame_error(e: FrameError) -> LinkError {
    match e {
        FrameError::Io(io) => LinkError::from(io),
        FrameError::Truncated => LinkError::new(FailureKind::UnexpectedEof, e.to_string()),
        other => LinkError::protocol(other.to_string()),
    }
}
