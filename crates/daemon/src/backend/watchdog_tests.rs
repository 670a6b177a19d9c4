// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::test_helpers::MockClock;
use fl_core::QueuedMessage;

const CEILING: Duration = Duration::from_secs(600);

#[test]
fn unarmed_watchdog_never_expires() {
    let clock = MockClock::new(0);
    let watchdog = Watchdog::new(CEILING, clock.clone());

    clock.advance(Duration::from_secs(3600));

    assert!(!watchdog.is_armed());
    assert!(!watchdog.expired());
}

#[test]
fn expires_at_the_ceiling() {
    let clock = MockClock::new(1_000);
    let watchdog = Watchdog::new(CEILING, clock.clone());
    watchdog.arm();

    clock.advance(CEILING - Duration::from_millis(1));
    assert!(!watchdog.expired());

    clock.advance(Duration::from_millis(1));
    assert!(watchdog.expired());
}

#[test]
fn arming_twice_keeps_the_first_time() {
    let clock = MockClock::new(0);
    let watchdog = Watchdog::new(CEILING, clock.clone());
    watchdog.arm();
    clock.advance(Duration::from_secs(500));
    watchdog.arm();
    clock.advance(Duration::from_secs(100));

    assert!(watchdog.expired());
}

#[test]
fn disarm_resets_the_countdown() {
    let clock = MockClock::new(0);
    let watchdog = Watchdog::new(CEILING, clock.clone());
    watchdog.arm();
    clock.advance(Duration::from_secs(500));
    watchdog.disarm();
    watchdog.arm();
    clock.advance(Duration::from_secs(500));

    assert!(!watchdog.expired());
}

#[test]
fn monitor_reports_queue_length() {
    let dir = tempfile::tempdir().unwrap();
    let mut queue = DeliveryQueue::load_from_disk(&dir.path().join("packet_queue.data")).unwrap();
    for i in 0..3 {
        queue.enqueue(QueuedMessage::new(vec![i], 0, "T", "v"));
    }
    let queue = Arc::new(Mutex::new(queue));
    let clock = MockClock::new(0);
    let watchdog = Arc::new(Watchdog::new(CEILING, clock.clone()));
    let monitor = WatchdogMonitor::new(Arc::clone(&watchdog), queue, CancelToken::new());

    assert_eq!(monitor.check(), None);
    watchdog.arm();
    clock.advance(Duration::from_secs(601));

    assert_eq!(monitor.check(), Some(ExitReason::WatchdogExpired { queued: 3 }));
}

#[test]
fn monitor_run_ends_with_fatal_error() {
    let dir = tempfile::tempdir().unwrap();
    let queue = DeliveryQueue::load_from_disk(&dir.path().join("packet_queue.data")).unwrap();
    let clock = MockClock::new(0);
    let watchdog = Arc::new(Watchdog::new(CEILING, clock.clone()));
    watchdog.arm();
    clock.advance(CEILING);
    let mut monitor = WatchdogMonitor::new(watchdog, Arc::new(Mutex::new(queue)), CancelToken::new())
        .with_interval(Duration::from_millis(1));

    let err = monitor.run().unwrap_err();

    assert_eq!(err.exit_reason(), Some(&ExitReason::WatchdogExpired { queued: 0 }));
}

#[test]
fn monitor_run_returns_when_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let queue = DeliveryQueue::load_from_disk(&dir.path().join("packet_queue.data")).unwrap();
    let cancel = CancelToken::new();
    let watchdog = Arc::new(Watchdog::new(CEILING, MockClock::new(0)));
    let mut monitor = WatchdogMonitor::new(watchdog, Arc::new(Mutex::new(queue)), cancel.clone());
    cancel.cancel();

    assert!(monitor.run().is_ok());
}
