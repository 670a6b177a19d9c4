// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory collaborators shared by daemon tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fl_core::{
    AlertCategory, Alerter, BrokerClient, ChannelMap, ClockSource, CursorStore, DeliveryQueue, FailureKind,
    Instrument, LinkError, LinkResult, MessageBroker, NamedValue, QoS, Record, Sample,
    StreamConnection, StreamingBroker, TableCursor, TableDescriptor, TypedScalar,
};

use crate::backend::SampleSink;

/// Clock whose time only moves when told to.
pub struct MockClock {
    time_ms: AtomicI64,
}

impl MockClock {
    pub fn new(initial_ms: i64) -> Arc<Self> {
        Arc::new(MockClock {
            time_ms: AtomicI64::new(initial_ms),
        })
    }

    pub fn advance(&self, duration: Duration) {
        self.time_ms
            .fetch_add(i64::try_from(duration.as_millis()).unwrap(), Ordering::SeqCst);
    }
}

impl ClockSource for MockClock {
    fn now_ms(&self) -> i64 {
        self.time_ms.load(Ordering::SeqCst)
    }
}

/// One alert as recorded by [`RecordingAlerter`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentAlert {
    pub source: String,
    pub category: AlertCategory,
    pub detail: String,
    pub text: bool,
}

#[derive(Default)]
pub struct RecordingAlerter {
    pub alerts: Mutex<Vec<SentAlert>>,
}

impl RecordingAlerter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<SentAlert> {
        self.alerts.lock().unwrap().clone()
    }

    fn record(&self, source: &str, category: AlertCategory, detail: &str, text: bool) -> bool {
        self.alerts.lock().unwrap().push(SentAlert {
            source: source.to_string(),
            category,
            detail: detail.to_string(),
            text,
        });
        true
    }
}

impl Alerter for RecordingAlerter {
    fn send_alert(&self, source: &str, category: AlertCategory, detail: &str) -> bool {
        self.record(source, category, detail, false)
    }

    fn send_text(&self, source: &str, category: AlertCategory, detail: &str) -> bool {
        self.record(source, category, detail, true)
    }
}

/// Builds a record with float values named `v0`, `v1`, ...
pub fn record(record_no: i64, secs: i64, values: &[f32]) -> Record {
    Record {
        record_no,
        instrument_epoch_seconds: secs,
        values: values
            .iter()
            .enumerate()
            .map(|(i, v)| NamedValue::new(format!("v{i}"), TypedScalar::Float32(*v)))
            .collect(),
    }
}

/// Scripted behaviour and call log of a [`FakeInstrument`].
#[derive(Default)]
pub struct InstrumentScript {
    pub tables: Vec<TableDescriptor>,
    pub records: HashMap<String, Vec<Record>>,
    /// Results for upcoming `connect` calls; `Ok(true)` once exhausted.
    pub connect_results: VecDeque<LinkResult<bool>>,
    /// Errors for upcoming fetches; fetches succeed once exhausted.
    pub fetch_errors: VecDeque<LinkError>,
    pub calls: Vec<String>,
    /// Cursor for the fetched table as seen from inside each fetch.
    pub observed: Vec<(String, Option<TableCursor>, usize)>,
    pub cursors: Option<Arc<Mutex<CursorStore>>>,
    /// Cursor store and queue files to read from inside each fetch.
    pub disk: Option<(PathBuf, PathBuf)>,
    /// `(table, cursors on disk, queued messages on disk)` per fetch.
    pub disk_seen: Vec<(String, Vec<TableCursor>, usize)>,
}

impl InstrumentScript {
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }
}

pub struct FakeInstrument {
    pub script: Arc<Mutex<InstrumentScript>>,
}

impl FakeInstrument {
    pub fn new(tables: Vec<TableDescriptor>) -> (Self, Arc<Mutex<InstrumentScript>>) {
        let script = Arc::new(Mutex::new(InstrumentScript {
            tables,
            ..InstrumentScript::default()
        }));
        (
            FakeInstrument {
                script: Arc::clone(&script),
            },
            script,
        )
    }

    fn fetch(&mut self, call: String, table: &str, after: i64) -> LinkResult<Vec<Record>> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(call);
        if let Some(cursors) = script.cursors.clone() {
            let store = cursors.lock().unwrap();
            let seen = (table.to_string(), store.get(table).cloned(), store.len());
            drop(store);
            script.observed.push(seen);
        }
        if let Some((cursor_path, queue_path)) = script.disk.clone() {
            let cursors = CursorStore::read(&cursor_path).unwrap_or_default();
            let queued = DeliveryQueue::read(&queue_path).map_or(0, |q| q.len());
            script.disk_seen.push((table.to_string(), cursors, queued));
        }
        if let Some(err) = script.fetch_errors.pop_front() {
            return Err(err);
        }
        Ok(script
            .records
            .get(table)
            .map(|rs| rs.iter().filter(|r| r.record_no > after).cloned().collect())
            .unwrap_or_default())
    }
}

impl Instrument for FakeInstrument {
    fn connect(&mut self, address: &str, station_id: u16) -> LinkResult<bool> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(format!("connect {address} {station_id}"));
        script.connect_results.pop_front().unwrap_or(Ok(true))
    }

    fn list_tables(&mut self) -> LinkResult<Vec<TableDescriptor>> {
        let mut script = self.script.lock().unwrap();
        script.calls.push("list_tables".to_string());
        Ok(script.tables.clone())
    }

    fn fetch_by_record_no(&mut self, table: &str, from_record_no: i64) -> LinkResult<Vec<Record>> {
        self.fetch(format!("by_record_no {table} {from_record_no}"), table, from_record_no)
    }

    fn fetch_by_duration(&mut self, table: &str, days: u32) -> LinkResult<Vec<Record>> {
        self.fetch(format!("by_duration {table} {days}"), table, i64::MIN)
    }

    fn fetch_by_timestamp(&mut self, table: &str, from_timestamp_ms: i64) -> LinkResult<Vec<Record>> {
        self.fetch(format!("by_timestamp {table} {from_timestamp_ms}"), table, i64::MIN)
    }

    fn disconnect(&mut self) {
        self.script.lock().unwrap().calls.push("disconnect".to_string());
    }
}

/// Everything a [`RecordingSink`] was given.
#[derive(Default)]
pub struct SinkLog {
    pub passes_begun: Vec<i64>,
    pub passes_ended: usize,
    pub delivered: Vec<(Sample, bool)>,
    pub tables_ended: Vec<String>,
    /// Makes `end_table` report the samples as not yet durable.
    pub not_durable: bool,
    pub closed: bool,
}

pub struct RecordingSink {
    pub log: Arc<Mutex<SinkLog>>,
}

impl RecordingSink {
    pub fn new() -> (Self, Arc<Mutex<SinkLog>>) {
        let log = Arc::new(Mutex::new(SinkLog::default()));
        (RecordingSink { log: Arc::clone(&log) }, log)
    }
}

impl SampleSink for RecordingSink {
    fn begin_pass(&mut self, now_ms: i64) -> fl_core::Result<()> {
        self.log.lock().unwrap().passes_begun.push(now_ms);
        Ok(())
    }

    fn deliver(&mut self, sample: &Sample, first_run: bool) -> fl_core::Result<()> {
        self.log.lock().unwrap().delivered.push((sample.clone(), first_run));
        Ok(())
    }

    fn end_table(&mut self, table: &str) -> bool {
        let mut log = self.log.lock().unwrap();
        log.tables_ended.push(table.to_string());
        !log.not_durable
    }

    fn end_pass(&mut self) -> fl_core::Result<()> {
        self.log.lock().unwrap().passes_ended += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closed = true;
    }
}

/// Everything sent to a [`FakeStreamingBroker`].
#[derive(Default)]
pub struct StreamLog {
    pub opened: Vec<String>,
    pub closed: Vec<String>,
    /// `(client_name, channels)` per successful flush.
    pub flushes: Vec<(String, ChannelMap)>,
    /// Upcoming `open` calls that fail.
    pub open_failures: usize,
    /// Errors for upcoming flushes.
    pub flush_errors: VecDeque<LinkError>,
}

#[derive(Default)]
pub struct FakeStreamingBroker {
    pub log: Arc<Mutex<StreamLog>>,
}

struct FakeStream {
    client_name: String,
    log: Arc<Mutex<StreamLog>>,
}

impl StreamingBroker for FakeStreamingBroker {
    fn open(&self, _address: &str, client_name: &str) -> LinkResult<Box<dyn StreamConnection>> {
        let mut log = self.log.lock().unwrap();
        if log.open_failures > 0 {
            log.open_failures -= 1;
            return Err(LinkError::new(FailureKind::ConnectionRefused, "streaming broker down"));
        }
        log.opened.push(client_name.to_string());
        Ok(Box::new(FakeStream {
            client_name: client_name.to_string(),
            log: Arc::clone(&self.log),
        }))
    }
}

impl StreamConnection for FakeStream {
    fn flush(&mut self, channels: &ChannelMap) -> LinkResult<usize> {
        let mut log = self.log.lock().unwrap();
        if let Some(err) = log.flush_errors.pop_front() {
            return Err(err);
        }
        log.flushes.push((self.client_name.clone(), channels.clone()));
        Ok(channels.len())
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closed.push(self.client_name.clone());
    }
}

/// Everything sent to a [`FakeMessageBroker`].
#[derive(Default)]
pub struct BrokerLog {
    pub connects: usize,
    pub connect_failures: usize,
    /// Every publish attempt fails while set.
    pub fail_publishes: bool,
    pub published: Vec<(String, Vec<u8>, QoS)>,
    pub disconnects: usize,
}

#[derive(Default)]
pub struct FakeMessageBroker {
    pub log: Arc<Mutex<BrokerLog>>,
}

struct FakeClient {
    log: Arc<Mutex<BrokerLog>>,
}

impl MessageBroker for FakeMessageBroker {
    fn connect(
        &self,
        _broker_uri: &str,
        _client_id: &str,
        _persistence_dir: &Path,
    ) -> LinkResult<Box<dyn BrokerClient>> {
        let mut log = self.log.lock().unwrap();
        log.connects += 1;
        if log.connect_failures > 0 {
            log.connect_failures -= 1;
            return Err(LinkError::new(FailureKind::ConnectionRefused, "broker down"));
        }
        Ok(Box::new(FakeClient {
            log: Arc::clone(&self.log),
        }))
    }
}

impl BrokerClient for FakeClient {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> LinkResult<()> {
        let mut log = self.log.lock().unwrap();
        if log.fail_publishes {
            return Err(LinkError::new(FailureKind::ConnectionReset, "publish failed"));
        }
        log.published.push((topic.to_string(), payload.to_vec(), qos));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.log.lock().unwrap().disconnects += 1;
    }
}
