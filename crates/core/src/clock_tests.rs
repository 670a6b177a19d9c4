// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    instrument_epoch_utc = { 0, 0, 631_152_000_000 },
    instrument_epoch_arizona = { 0, -25_200_000, 631_177_200_000 },
    one_day_arizona = { 86_400, -25_200_000, 631_263_600_000 },
    east_of_utc = { 10, 3_600_000, 631_148_410_000 },
)]
fn delivery_timestamp_applies_epoch_and_raw_offset(secs: i64, offset_ms: i64, expected: i64) {
    assert_eq!(delivery_timestamp_ms(secs, offset_ms), expected);
}

#[test]
fn instrument_epoch_is_1990() {
    let epoch = chrono::DateTime::from_timestamp(EPOCH_OFFSET_SECONDS, 0).map(|d| d.to_rfc3339());
    assert_eq!(epoch.as_deref(), Some("1990-01-01T00:00:00+00:00"));
}

#[test]
fn system_clock_is_after_2020() {
    assert!(SystemClock.now_ms() > 1_577_836_800_000);
}

#[test]
fn clock_works_through_references_and_arcs() {
    let clock = Arc::new(SystemClock);
    let by_ref = &SystemClock;
    assert!(clock.now_ms() > 0);
    assert!(by_ref.now_ms() > 0);
}
