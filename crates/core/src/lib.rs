// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! fl-core: shared library for the fieldlink datalogger pipeline
//!
//! This crate provides the sample codec, the persisted cursor store and
//! delivery queue, the reconnect policy, and the collaborator traits used by
//! both the fieldlinkd daemon and the fieldlink operator tool.

pub mod alert;
pub mod broker;
pub mod cancel;
pub mod clock;
pub mod codec;
pub mod cursor;
pub mod error;
pub mod framing;
pub mod instrument;
pub mod link;
pub mod queue;
pub mod reconnect;
pub mod sample;

pub use alert::{AlertCategory, Alerter};
pub use broker::{
    BrokerClient, Channel, ChannelData, ChannelMap, MessageBroker, QoS, StreamConnection, StreamingBroker,
};
pub use cancel::CancelToken;
pub use clock::{delivery_timestamp_ms, ClockSource, SystemClock, EPOCH_OFFSET_SECONDS};
pub use codec::{CodecError, Decoded};
pub use cursor::{CursorStore, TableCursor};
pub use error::{Error, ExitReason, Result};
pub use instrument::{Instrument, NamedValue, Record, TableDescriptor};
pub use link::{FailureKind, LinkError, LinkResult};
pub use queue::{DeliveryQueue, QueueError, QueuedMessage};
pub use reconnect::{ReconnectOutcome, ReconnectPolicy, ReconnectSupervisor};
pub use sample::{Sample, TypeTag, TypedScalar};
