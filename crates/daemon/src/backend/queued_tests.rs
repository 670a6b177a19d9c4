// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::backend::watchdog::WatchdogMonitor;
use crate::test_helpers::{BrokerLog, FakeMessageBroker, MockClock, RecordingAlerter};
use fl_core::{Alerter, ReconnectPolicy, TypedScalar};
use tempfile::{tempdir, TempDir};

const START_MS: i64 = 1_700_000_000_000;

struct Harness {
    worker: DeliveryWorker,
    queue: Arc<Mutex<DeliveryQueue>>,
    broker: Arc<Mutex<BrokerLog>>,
    watchdog: Arc<Watchdog>,
    clock: Arc<MockClock>,
    dir: TempDir,
}

fn harness() -> Harness {
    let dir = tempdir().unwrap();
    let queue = Arc::new(Mutex::new(
        DeliveryQueue::load_from_disk(&dir.path().join("packet_queue.data")).unwrap(),
    ));
    let clock = MockClock::new(START_MS);
    let watchdog = Arc::new(Watchdog::new(Duration::from_secs(600), clock.clone()));
    let broker = FakeMessageBroker::default();
    let log = Arc::clone(&broker.log);
    let supervisor = ReconnectSupervisor::new(
        "message broker",
        "sitea",
        ReconnectPolicy::new(2, Duration::from_millis(1)),
        RecordingAlerter::new() as Arc<dyn Alerter>,
    );
    let worker = DeliveryWorker::new(
        Arc::new(broker),
        Arc::clone(&queue),
        Arc::clone(&watchdog),
        supervisor,
        CancelToken::new(),
        DeliverySettings {
            broker_uri: "tcp://localhost:1883".to_string(),
            client_id: "sitea/data_publisher/cr1000".to_string(),
            topic_root: "sitea/data/cr1000".to_string(),
            persistence_dir: dir.path().join("mqtt"),
            drain_interval: Duration::from_millis(1),
        },
    );
    Harness {
        worker,
        queue,
        broker: log,
        watchdog,
        clock,
        dir,
    }
}

impl Harness {
    fn enqueue(&self, names: &[&str]) {
        let mut queue = self.queue.lock().unwrap();
        for (i, name) in names.iter().enumerate() {
            let payload = vec![u8::try_from(i).unwrap()];
            queue.enqueue(QueuedMessage::new(payload, START_MS, "Met", *name));
        }
    }

    fn queue_path(&self) -> PathBuf {
        self.dir.path().join("packet_queue.data")
    }
}

fn sample(name: &str, value: f32) -> Sample {
    Sample::new("Met", name, 1_000, TypedScalar::Float32(value))
}

#[test]
fn sink_enqueues_envelopes_with_enqueue_time() {
    let h = harness();
    let mut sink = QueueSink::new(Arc::clone(&h.queue), h.clock.clone());

    sink.begin_pass(START_MS).unwrap();
    sink.deliver(&sample("AirTC", 21.5), true).unwrap();
    h.clock.advance(Duration::from_millis(7));
    sink.deliver(&sample("RH", 40.0), false).unwrap();

    let queue = h.queue.lock().unwrap();
    let messages: Vec<_> = queue.iter().cloned().collect();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].value_name, "AirTC");
    assert_eq!(messages[0].enqueue_time_ms, START_MS);
    assert_eq!(messages[1].enqueue_time_ms, START_MS + 7);
    assert_eq!(messages[0].payload, sample("AirTC", 21.5).envelope().unwrap());
}

#[test]
fn sink_persists_at_end_of_pass() {
    let h = harness();
    let mut sink = QueueSink::new(Arc::clone(&h.queue), h.clock.clone());

    sink.begin_pass(START_MS).unwrap();
    sink.deliver(&sample("AirTC", 1.0), true).unwrap();
    assert!(DeliveryQueue::read(&h.queue_path()).unwrap().is_empty());

    sink.end_pass().unwrap();
    assert_eq!(DeliveryQueue::read(&h.queue_path()).unwrap().len(), 1);
}

#[test]
fn end_table_persists_before_the_cursor_is_saved() {
    let h = harness();
    let mut sink = QueueSink::new(Arc::clone(&h.queue), h.clock.clone());

    sink.begin_pass(START_MS).unwrap();
    sink.deliver(&sample("AirTC", 1.0), true).unwrap();
    sink.deliver(&sample("RH", 2.0), true).unwrap();

    assert!(sink.end_table("Met"));
    assert_eq!(DeliveryQueue::read(&h.queue_path()).unwrap().len(), 2);
}

#[test]
fn failed_persist_reports_samples_not_durable() {
    let h = harness();
    let mut sink = QueueSink::new(Arc::clone(&h.queue), h.clock.clone());
    sink.begin_pass(START_MS).unwrap();
    sink.deliver(&sample("AirTC", 1.0), true).unwrap();
    std::fs::remove_file(h.queue_path()).unwrap();
    std::fs::create_dir(h.queue_path()).unwrap();

    assert!(!sink.end_table("Met"));

    std::fs::remove_dir(h.queue_path()).unwrap();
    sink.end_pass().unwrap();
    assert_eq!(DeliveryQueue::read(&h.queue_path()).unwrap().len(), 1);
}

#[test]
fn drain_publishes_in_order_with_exactly_once() {
    let mut h = harness();
    h.enqueue(&["a", "b", "c"]);
    assert!(h.worker.connect().unwrap());

    assert_eq!(h.worker.drain(), 3);

    let log = h.broker.lock().unwrap();
    let topics: Vec<_> = log.published.iter().map(|(t, _, _)| t.as_str()).collect();
    assert_eq!(topics, vec!["sitea/data/cr1000/Met/a", "sitea/data/cr1000/Met/b", "sitea/data/cr1000/Met/c"]);
    assert!(log.published.iter().all(|(_, _, qos)| *qos == QoS::ExactlyOnce));
    assert!(h.queue.lock().unwrap().is_empty());
    assert!(DeliveryQueue::read(&h.queue_path()).unwrap().is_empty());
    assert!(!h.watchdog.is_armed());
}

#[test]
fn failed_publish_keeps_message_at_front() {
    let mut h = harness();
    h.enqueue(&["a", "b"]);
    h.worker.connect().unwrap();
    h.broker.lock().unwrap().fail_publishes = true;

    assert_eq!(h.worker.drain(), 0);

    let queue = h.queue.lock().unwrap();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.peek().unwrap().value_name, "a");
    assert!(!h.worker.is_connected());
    assert_eq!(h.broker.lock().unwrap().disconnects, 1);
    assert!(h.watchdog.is_armed());
}

#[test]
fn delivery_resumes_after_reconnect() {
    let mut h = harness();
    h.enqueue(&["a"]);
    h.worker.connect().unwrap();
    h.broker.lock().unwrap().fail_publishes = true;
    h.worker.drain();

    h.broker.lock().unwrap().fail_publishes = false;
    h.worker.connect().unwrap();
    assert_eq!(h.worker.drain(), 1);
    assert_eq!(h.broker.lock().unwrap().published.len(), 1);
}

#[test]
fn stuck_queue_trips_the_watchdog() {
    let mut h = harness();
    h.enqueue(&["a", "b", "c"]);
    h.worker.connect().unwrap();
    h.broker.lock().unwrap().fail_publishes = true;
    let monitor = WatchdogMonitor::new(Arc::clone(&h.watchdog), Arc::clone(&h.queue), CancelToken::new());

    for _ in 0..11 {
        h.worker.drain();
        h.worker.connect().unwrap();
        h.clock.advance(Duration::from_secs(60));
    }

    assert_eq!(monitor.check(), Some(ExitReason::WatchdogExpired { queued: 3 }));
}

#[test]
fn exhausted_connect_is_fatal() {
    let mut h = harness();
    h.broker.lock().unwrap().connect_failures = 5;

    let err = h.worker.run().unwrap_err();

    assert_eq!(
        err.exit_reason(),
        Some(&ExitReason::ReconnectExhausted {
            link: "message broker".to_string(),
            attempts: 2
        })
    );
}

#[test]
fn reconnect_time_counts_against_watchdog() {
    let mut h = harness();
    h.enqueue(&["a"]);
    h.broker.lock().unwrap().connect_failures = 5;

    assert!(h.worker.run().is_err());
    assert!(h.watchdog.is_armed());
}

#[test]
fn close_disconnects_client() {
    let mut h = harness();
    h.worker.connect().unwrap();

    h.worker.close();

    assert_eq!(h.broker.lock().unwrap().disconnects, 1);
    assert!(!h.worker.is_connected());
}
