// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The ingestion loop.
//!
//! ```text
//! Disconnected -> FetchingTables -> FetchingRecords -> Emitting -> IdleWait
//!                                        ^                            |
//!                                        +----------------------------+
//! ```
//!
//! Every table is fetched once per pass, using one of three strategies:
//! - bootstrap: no cursor yet, fetch the last N days;
//! - replay: an operator-supplied start time, used for the first pass only;
//! - resume: everything after the cursor's record number.
//!
//! A network failure from the instrument wipes every cursor (the instrument
//! may have been reprogrammed) and sends the loop back to `Disconnected`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use fl_core::{
    delivery_timestamp_ms, CancelToken, ClockSource, CursorStore, Error, ExitReason, FailureKind,
    Instrument, LinkError, ReconnectOutcome, ReconnectSupervisor, Record, Result, Sample,
    TableCursor, TableDescriptor, TypedScalar,
};

use crate::backend::SampleSink;
use crate::config::{Config, ValueEncoding};
use crate::runtime::Job;

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Disconnected,
    FetchingTables,
    FetchingRecords,
    Emitting,
    IdleWait,
}

/// Settings the loop takes from the daemon configuration.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub address: String,
    pub station_id: u16,
    pub bootstrap_days: u32,
    pub replay_from_ms: Option<i64>,
    pub raw_offset_ms: i64,
    pub value_encoding: ValueEncoding,
    /// Poll interval when no table reports a sampling interval.
    pub fallback_poll: Duration,
}

impl IngestSettings {
    pub fn from_config(config: &Config) -> Self {
        IngestSettings {
            address: config.instrument.address.clone(),
            station_id: config.instrument.station_id,
            bootstrap_days: config.bootstrap_days,
            replay_from_ms: config.replay_from_ms,
            raw_offset_ms: config.raw_offset_ms(),
            value_encoding: config.value_encoding,
            fallback_poll: config.fallback_poll(),
        }
    }
}

/// How a table is fetched this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchStrategy {
    Bootstrap { days: u32 },
    Replay { from_ms: i64 },
    Resume { after: i64 },
}

/// Polls the instrument and hands samples to the active sink.
pub struct IngestLoop {
    instrument: Box<dyn Instrument>,
    sink: Box<dyn SampleSink>,
    cursors: Arc<Mutex<CursorStore>>,
    supervisor: ReconnectSupervisor,
    clock: Arc<dyn ClockSource>,
    cancel: CancelToken,
    settings: IngestSettings,
    state: IngestState,
    tables: Vec<TableDescriptor>,
}

impl IngestLoop {
    /// In replay mode the cursor store is wiped here, before the first pass.
    pub fn new(
        instrument: Box<dyn Instrument>,
        sink: Box<dyn SampleSink>,
        cursors: Arc<Mutex<CursorStore>>,
        supervisor: ReconnectSupervisor,
        clock: Arc<dyn ClockSource>,
        cancel: CancelToken,
        settings: IngestSettings,
    ) -> Self {
        if let Some(from_ms) = settings.replay_from_ms {
            tracing::info!(from_ms, "replay mode: discarding table cursors");
            lock(&cursors).reset();
        }
        IngestLoop {
            instrument,
            sink,
            cursors,
            supervisor,
            clock,
            cancel,
            settings,
            state: IngestState::Disconnected,
            tables: Vec::new(),
        }
    }

    pub fn state(&self) -> IngestState {
        self.state
    }

    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    /// Runs until cancelled or a fatal error.
    pub fn run(&mut self) -> Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("ingestion stopped");
                return Ok(());
            }
            if self.state == IngestState::Disconnected && !self.establish()? {
                return Ok(());
            }
            match self.pass() {
                Ok(wait) => {
                    self.state = IngestState::IdleWait;
                    tracing::debug!(wait_ms = wait.as_millis(), "pass complete");
                    if !self.cancel.sleep(wait) {
                        continue;
                    }
                    self.state = IngestState::FetchingRecords;
                }
                Err(e) => self.handle_failure(e)?,
            }
        }
    }

    /// Connects to the instrument and reads its catalog.
    ///
    /// Returns false if cancelled while reconnecting.
    pub fn establish(&mut self) -> Result<bool> {
        self.state = IngestState::Disconnected;
        let address = self.settings.address.clone();
        let station_id = self.settings.station_id;
        let instrument = &mut self.instrument;

        let outcome = self.supervisor.attempt_reconnect(&self.cancel, |attempt| {
            tracing::info!(%address, station_id, attempt, "connecting to instrument");
            if !instrument.connect(&address, station_id)? {
                return Err(LinkError::new(
                    FailureKind::ConnectionRefused,
                    format!("instrument at {address} did not answer"),
                ));
            }
            instrument.list_tables()
        });

        match outcome {
            ReconnectOutcome::Connected(tables) => {
                self.state = IngestState::FetchingTables;
                for table in &tables {
                    tracing::info!(
                        table = %table.name,
                        interval_ms = table.sampling_interval.as_millis(),
                        "instrument table"
                    );
                }
                self.tables = tables;
                self.state = IngestState::FetchingRecords;
                Ok(true)
            }
            ReconnectOutcome::Exhausted { attempts, .. } => {
                Err(Error::Fatal(ExitReason::ReconnectExhausted {
                    link: self.supervisor.link().to_string(),
                    attempts,
                }))
            }
            ReconnectOutcome::Cancelled => Ok(false),
        }
    }

    /// Fetches and delivers every table once.
    ///
    /// Returns how long to wait before the next pass.
    pub fn pass(&mut self) -> Result<Duration> {
        let now_ms = self.clock.now_ms();
        self.sink.begin_pass(now_ms)?;

        let mut fastest: Option<Duration> = None;
        let tables = self.tables.clone();
        for table in &tables {
            if self.cancel.is_cancelled() {
                return Err(Error::Link(LinkError::new(
                    FailureKind::Interrupted,
                    "shutdown in progress",
                )));
            }
            if !table.sampling_interval.is_zero() {
                fastest = Some(fastest.map_or(table.sampling_interval, |f| f.min(table.sampling_interval)));
            }
            self.state = IngestState::FetchingRecords;
            let (records, cursor) = self.fetch(&table.name)?;
            self.state = IngestState::Emitting;
            self.apply(&table.name, cursor, records)?;
        }

        if self.settings.replay_from_ms.take().is_some() {
            tracing::info!("replay pass complete, resuming from cursors");
        }
        self.sink.end_pass()?;

        Ok(fastest.map_or(self.settings.fallback_poll, |f| f / 2))
    }

    fn strategy(&self, cursor: Option<&TableCursor>) -> FetchStrategy {
        match (self.settings.replay_from_ms, cursor) {
            (Some(from_ms), _) => FetchStrategy::Replay { from_ms },
            (None, None) => FetchStrategy::Bootstrap {
                days: self.settings.bootstrap_days,
            },
            (None, Some(c)) => FetchStrategy::Resume {
                after: c.last_record_no,
            },
        }
    }

    /// Fetches one table, creating its cursor first if it has none.
    fn fetch(&mut self, table: &str) -> Result<(Vec<Record>, TableCursor)> {
        let (strategy, cursor) = {
            let mut store = lock(&self.cursors);
            let existing = store.get(table).cloned();
            let strategy = self.strategy(existing.as_ref());
            let cursor = match existing {
                Some(cursor) => cursor,
                None => {
                    tracing::info!(%table, "executing initial fetch");
                    store.get_or_create(table).clone()
                }
            };
            (strategy, cursor)
        };

        let records = match strategy {
            FetchStrategy::Bootstrap { days } => self.instrument.fetch_by_duration(table, days)?,
            FetchStrategy::Replay { from_ms } => self.instrument.fetch_by_timestamp(table, from_ms)?,
            FetchStrategy::Resume { after } => self.instrument.fetch_by_record_no(table, after)?,
        };
        tracing::debug!(%table, ?strategy, records = records.len(), "fetched");
        Ok((records, cursor))
    }

    /// Delivers the new records of one table, then persists its cursor
    /// once the sink reports the samples durable.
    fn apply(&mut self, table: &str, mut cursor: TableCursor, records: Vec<Record>) -> Result<()> {
        let mut accepted = 0usize;
        for record in records {
            if record.values.is_empty() || !cursor.advance(record.record_no) {
                continue;
            }
            let timestamp_ms =
                delivery_timestamp_ms(record.instrument_epoch_seconds, self.settings.raw_offset_ms);
            for value in record.values {
                let sample = Sample::new(table, value.name, timestamp_ms, self.normalise(value.raw_value));
                self.sink.deliver(&sample, cursor.first_run)?;
            }
            accepted += 1;
        }

        if accepted > 0 && cursor.first_run {
            cursor.complete_first_run();
            tracing::info!(%table, "initial fetch completed");
        }
        if accepted > 0 {
            tracing::debug!(%table, accepted, last_record_no = cursor.last_record_no, "records delivered");
        }

        // the cursor must not reach disk ahead of the table's samples
        let durable = self.sink.end_table(table);
        let mut store = lock(&self.cursors);
        *store.get_or_create(table) = cursor;
        if durable {
            store.save_logged();
        } else {
            tracing::warn!(%table, "samples not persisted, keeping cursor in memory only");
        }
        Ok(())
    }

    fn normalise(&self, value: TypedScalar) -> TypedScalar {
        match self.settings.value_encoding {
            ValueEncoding::Float32 => TypedScalar::Float32(value.to_f32()),
            ValueEncoding::Native => value,
        }
    }

    /// Decides what a failed pass means for the loop.
    fn handle_failure(&mut self, e: Error) -> Result<()> {
        let link = match e {
            Error::Link(link) => link,
            Error::Fatal(_) => return Err(e),
            other => {
                tracing::error!(error = %other, "unexpected ingestion failure");
                return Err(Error::Fatal(ExitReason::WorkerFailed(other.to_string())));
            }
        };

        match link.kind {
            FailureKind::Interrupted if self.cancel.is_cancelled() => Ok(()),
            FailureKind::Interrupted => {
                tracing::warn!(error = %link, "instrument request interrupted");
                self.cancel.sleep(self.settings.fallback_poll);
                Ok(())
            }
            FailureKind::NotConnected => {
                tracing::warn!(error = %link, "instrument link is down");
                self.disconnect();
                Ok(())
            }
            kind if kind.is_network() => {
                tracing::error!(error = %link, "communication error, was the datalogger reprogrammed?");
                lock(&self.cursors).reset();
                self.disconnect();
                Ok(())
            }
            kind if kind.warrants_reconnect() => {
                tracing::warn!(error = %link, "instrument client needs a new connection");
                self.disconnect();
                Ok(())
            }
            _ => {
                tracing::error!(error = %link, "instrument failure does not warrant a reconnect");
                Err(Error::Fatal(ExitReason::WorkerFailed(link.to_string())))
            }
        }
    }

    fn disconnect(&mut self) {
        self.instrument.disconnect();
        self.tables.clear();
        self.state = IngestState::Disconnected;
    }

    /// Closes the instrument link and the sink.
    pub fn close(&mut self) {
        self.instrument.disconnect();
        self.sink.close();
    }
}

impl Job for IngestLoop {
    fn name(&self) -> &str {
        "ingest"
    }

    fn run(&mut self) -> Result<()> {
        IngestLoop::run(self)
    }

    fn close(&mut self) {
        IngestLoop::close(self);
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
