// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming delivery.
//!
//! Each sample is flushed to the streaming broker as soon as it is ingested,
//! on the channel `table/value`. After a pass that flushed anything, a sync
//! frame goes out on a second connection:
//!
//! | channel | type  | value                                  |
//! |---------|-------|----------------------------------------|
//! | `chan`  | int32 | distinct channels flushed in the pass  |
//! | `frame` | int64 | passes with data since the sink opened |
//!
//! Samples from a table's first batch keep their own timestamp; later
//! samples are stamped with the pass's wall-clock time, so a catch-up batch
//! lands on a single instant downstream.

use std::collections::BTreeSet;
use std::sync::Arc;

use fl_core::{
    CancelToken, ChannelData, ChannelMap, Error, ExitReason, FailureKind, LinkError,
    ReconnectOutcome, ReconnectSupervisor, Result, Sample, StreamConnection, StreamingBroker,
};

use super::SampleSink;
use crate::config::Config;

/// Where the streaming sink connects.
#[derive(Debug, Clone)]
pub struct StreamingSettings {
    pub address: String,
    pub client_name: String,
    pub sync_client_name: String,
}

impl StreamingSettings {
    pub fn from_config(config: &Config) -> Self {
        StreamingSettings {
            address: config.streaming.address.clone(),
            client_name: config.streaming.client_name.clone(),
            sync_client_name: config.streaming.sync_client_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Data,
    Sync,
}

pub struct StreamingSink {
    broker: Arc<dyn StreamingBroker>,
    data: Option<Box<dyn StreamConnection>>,
    sync: Option<Box<dyn StreamConnection>>,
    supervisor: ReconnectSupervisor,
    cancel: CancelToken,
    settings: StreamingSettings,
    flush_time_ms: i64,
    flush_count: usize,
    frame_count: i64,
    channels: BTreeSet<String>,
    /// Consecutive flushes that broke the link, across reconnects.
    broken_flushes: u32,
}

impl StreamingSink {
    pub fn new(
        broker: Arc<dyn StreamingBroker>,
        supervisor: ReconnectSupervisor,
        cancel: CancelToken,
        settings: StreamingSettings,
    ) -> Self {
        StreamingSink {
            broker,
            data: None,
            sync: None,
            supervisor,
            cancel,
            settings,
            flush_time_ms: 0,
            flush_count: 0,
            frame_count: 0,
            channels: BTreeSet::new(),
            broken_flushes: 0,
        }
    }

    pub fn frame_count(&self) -> i64 {
        self.frame_count
    }

    pub fn is_connected(&self) -> bool {
        self.data.is_some() && self.sync.is_some()
    }

    fn ensure_connected(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.close_connections();

        let broker = Arc::clone(&self.broker);
        let settings = &self.settings;
        let outcome = self.supervisor.attempt_reconnect(&self.cancel, |attempt| {
            tracing::info!(address = %settings.address, attempt, "connecting to streaming broker");
            let mut data = broker.open(&settings.address, &settings.client_name)?;
            match broker.open(&settings.address, &settings.sync_client_name) {
                Ok(sync) => Ok((data, sync)),
                Err(e) => {
                    data.close();
                    Err(e)
                }
            }
        });

        match outcome {
            ReconnectOutcome::Connected((data, sync)) => {
                self.data = Some(data);
                self.sync = Some(sync);
                Ok(())
            }
            ReconnectOutcome::Exhausted { attempts, .. } => Err(Error::Fatal(ExitReason::ReconnectExhausted {
                link: self.supervisor.link().to_string(),
                attempts,
            })),
            ReconnectOutcome::Cancelled => Err(interrupted()),
        }
    }

    /// Flushes on one connection, reconnecting both on a broken link.
    ///
    /// Broken flushes count against the reconnect budget until a flush
    /// succeeds, so a broker that accepts connections but fails every flush
    /// still ends in `ReconnectExhausted`.
    fn flush(&mut self, target: Target, channels: &ChannelMap) -> Result<usize> {
        loop {
            self.ensure_connected()?;
            let conn = match target {
                Target::Data => self.data.as_mut(),
                Target::Sync => self.sync.as_mut(),
            };
            let Some(conn) = conn else {
                continue;
            };

            match conn.flush(channels) {
                Ok(sent) => {
                    self.broken_flushes = 0;
                    return Ok(sent);
                }
                Err(e) if e.warrants_reconnect() || e.kind == FailureKind::NotConnected => {
                    self.close_connections();
                    self.broken_flushes = self.broken_flushes.saturating_add(1);
                    let attempt = self.broken_flushes;
                    tracing::warn!(error = %e, ?target, attempt, "streaming flush failed, reconnecting");
                    if attempt == 1 {
                        self.supervisor.report_lost(&e);
                    }
                    if self.supervisor.policy().exhausted(attempt) {
                        tracing::error!(attempts = attempt, "streaming flush retries exhausted");
                        self.broken_flushes = 0;
                        return Err(Error::Fatal(ExitReason::ReconnectExhausted {
                            link: self.supervisor.link().to_string(),
                            attempts: attempt,
                        }));
                    }
                    if !self.cancel.sleep(self.supervisor.policy().delay) {
                        return Err(interrupted());
                    }
                }
                Err(e) if e.kind == FailureKind::Interrupted => return Err(Error::Link(e)),
                Err(e) => {
                    tracing::error!(error = %e, ?target, "streaming flush failed");
                    return Err(Error::Fatal(ExitReason::WorkerFailed(format!("streaming broker: {e}"))));
                }
            }
        }
    }

    fn close_connections(&mut self) {
        for mut conn in [self.data.take(), self.sync.take()].into_iter().flatten() {
            conn.close();
        }
    }
}

fn interrupted() -> Error {
    Error::Link(LinkError::new(FailureKind::Interrupted, "shutdown in progress"))
}

impl SampleSink for StreamingSink {
    fn begin_pass(&mut self, now_ms: i64) -> Result<()> {
        self.flush_time_ms = now_ms;
        self.flush_count = 0;
        self.channels.clear();
        self.ensure_connected()
    }

    fn deliver(&mut self, sample: &Sample, first_run: bool) -> Result<()> {
        let Some(envelope) = sample.envelope() else {
            tracing::warn!(channel = %sample.channel(), "sample could not be encoded, dropping it");
            return Ok(());
        };
        let channel = sample.channel();
        let timestamp_ms = if first_run { sample.timestamp_ms } else { self.flush_time_ms };

        let mut map = ChannelMap::new();
        map.put(channel.as_str(), timestamp_ms, ChannelData::Bytes(envelope));
        self.flush_count += self.flush(Target::Data, &map)?;
        self.channels.insert(channel);
        Ok(())
    }

    fn end_pass(&mut self) -> Result<()> {
        if self.flush_count == 0 {
            return Ok(());
        }
        self.frame_count += 1;
        let distinct = i32::try_from(self.channels.len()).unwrap_or(i32::MAX);

        let mut map = ChannelMap::new();
        map.put("chan", self.flush_time_ms, ChannelData::Int32(distinct));
        map.put("frame", self.flush_time_ms, ChannelData::Int64(self.frame_count));
        self.flush(Target::Sync, &map)?;

        tracing::debug!(
            flushed = self.flush_count,
            channels = distinct,
            frame = self.frame_count,
            "sync frame sent"
        );
        Ok(())
    }

    fn close(&mut self) {
        self.close_connections();
    }
}

#[cfg(test)]
#[path = "streaming_tests.rs"]
mod tests;
