// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued delivery to the message broker.
//!
//! The ingestion side only appends to the [`DeliveryQueue`]; the
//! [`DeliveryWorker`] publishes from the front of the queue with
//! exactly-once QoS and removes a message only after the broker has
//! acknowledged it. The queue lock is held per operation, never across a
//! publish.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fl_core::{
    BrokerClient, CancelToken, ClockSource, DeliveryQueue, Error, ExitReason, MessageBroker, QoS,
    QueuedMessage, ReconnectOutcome, ReconnectSupervisor, Result, Sample,
};

use super::watchdog::Watchdog;
use super::SampleSink;
use crate::config::Config;
use crate::ingest::lock;
use crate::runtime::Job;

/// Sink that appends each sample to the durable queue.
pub struct QueueSink {
    queue: Arc<Mutex<DeliveryQueue>>,
    clock: Arc<dyn ClockSource>,
    /// Messages enqueued since the queue was last persisted.
    unsaved: usize,
}

impl QueueSink {
    pub fn new(queue: Arc<Mutex<DeliveryQueue>>, clock: Arc<dyn ClockSource>) -> Self {
        QueueSink {
            queue,
            clock,
            unsaved: 0,
        }
    }
}

impl SampleSink for QueueSink {
    fn begin_pass(&mut self, _now_ms: i64) -> Result<()> {
        Ok(())
    }

    fn deliver(&mut self, sample: &Sample, _first_run: bool) -> Result<()> {
        let Some(payload) = sample.envelope() else {
            tracing::warn!(channel = %sample.channel(), "sample could not be encoded, dropping it");
            return Ok(());
        };
        let message = QueuedMessage::new(
            payload,
            self.clock.now_ms(),
            sample.table.as_str(),
            sample.value_name.as_str(),
        );
        lock(&self.queue).enqueue(message);
        self.unsaved += 1;
        Ok(())
    }

    /// Persists the queue so it is on disk before the table's cursor.
    fn end_table(&mut self, _table: &str) -> bool {
        self.persist()
    }

    /// Retries persistence for anything a failed `end_table` left behind.
    fn end_pass(&mut self) -> Result<()> {
        self.persist();
        Ok(())
    }
}

impl QueueSink {
    fn persist(&mut self) -> bool {
        if self.unsaved == 0 {
            return true;
        }
        let queue = lock(&self.queue);
        match queue.drain_to_disk() {
            Ok(()) => {
                tracing::debug!(added = self.unsaved, queued = queue.len(), "samples queued");
                self.unsaved = 0;
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "unable to persist packet queue");
                false
            }
        }
    }
}

/// Where and how the delivery worker reaches the broker.
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub broker_uri: String,
    pub client_id: String,
    pub topic_root: String,
    pub persistence_dir: PathBuf,
    /// Pause between drain passes.
    pub drain_interval: Duration,
}

impl DeliverySettings {
    pub fn from_config(config: &Config) -> Self {
        DeliverySettings {
            broker_uri: config.broker.uri.clone(),
            client_id: config.broker.client_id.clone(),
            topic_root: config.broker.topic_root.clone(),
            persistence_dir: config.mqtt_persistence_dir(),
            drain_interval: config.drain_interval(),
        }
    }
}

/// Drains the durable queue to the message broker.
pub struct DeliveryWorker {
    broker: Arc<dyn MessageBroker>,
    client: Option<Box<dyn BrokerClient>>,
    queue: Arc<Mutex<DeliveryQueue>>,
    watchdog: Arc<Watchdog>,
    supervisor: ReconnectSupervisor,
    cancel: CancelToken,
    settings: DeliverySettings,
}

impl DeliveryWorker {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        queue: Arc<Mutex<DeliveryQueue>>,
        watchdog: Arc<Watchdog>,
        supervisor: ReconnectSupervisor,
        cancel: CancelToken,
        settings: DeliverySettings,
    ) -> Self {
        DeliveryWorker {
            broker,
            client: None,
            queue,
            watchdog,
            supervisor,
            cancel,
            settings,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|c| c.is_connected())
    }

    /// Connects through the reconnect supervisor.
    ///
    /// Returns false if cancelled while reconnecting.
    fn connect(&mut self) -> Result<bool> {
        let broker = Arc::clone(&self.broker);
        let settings = &self.settings;
        let outcome = self.supervisor.attempt_reconnect(&self.cancel, |attempt| {
            tracing::info!(uri = %settings.broker_uri, client_id = %settings.client_id, attempt, "connecting to message broker");
            broker.connect(&settings.broker_uri, &settings.client_id, &settings.persistence_dir)
        });
        match outcome {
            ReconnectOutcome::Connected(client) => {
                self.client = Some(client);
                Ok(true)
            }
            ReconnectOutcome::Exhausted { attempts, .. } => Err(Error::Fatal(ExitReason::ReconnectExhausted {
                link: self.supervisor.link().to_string(),
                attempts,
            })),
            ReconnectOutcome::Cancelled => Ok(false),
        }
    }

    /// Publishes from the front of the queue until it is empty or a
    /// publish fails. Returns the number of messages delivered.
    pub fn drain(&mut self) -> usize {
        let mut published = 0usize;
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            let Some(message) = lock(&self.queue).peek().cloned() else {
                self.watchdog.disarm();
                break;
            };
            self.watchdog.arm();
            let Some(client) = self.client.as_mut() else {
                break;
            };

            let topic = message.topic(&self.settings.topic_root);
            match client.publish(&topic, &message.payload, QoS::ExactlyOnce) {
                Ok(()) => {
                    lock(&self.queue).remove_front();
                    published += 1;
                }
                Err(e) => {
                    tracing::warn!(%topic, error = %e, "publish failed, dropping broker connection");
                    client.disconnect();
                    self.client = None;
                    break;
                }
            }
        }

        if published > 0 {
            let queue = lock(&self.queue);
            tracing::debug!(published, remaining = queue.len(), "queue drained");
            if let Err(e) = queue.drain_to_disk() {
                tracing::error!(error = %e, "unable to persist packet queue");
            }
        }
        published
    }
}

impl Job for DeliveryWorker {
    fn name(&self) -> &str {
        "delivery"
    }

    fn run(&mut self) -> Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }
            if !self.is_connected() {
                if let Some(mut stale) = self.client.take() {
                    stale.disconnect();
                }
                // time spent reconnecting counts against the watchdog
                if !lock(&self.queue).is_empty() {
                    self.watchdog.arm();
                }
                if !self.connect()? {
                    return Ok(());
                }
            }
            self.drain();
            if !self.cancel.sleep(self.settings.drain_interval) {
                return Ok(());
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.disconnect();
        }
    }
}

#[cfg(test)]
#[path = "queued_tests.rs"]
mod tests;
