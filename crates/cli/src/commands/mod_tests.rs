// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    epoch = { 0, "1970-01-01T00:00:00.000Z" },
    with_millis = { 1_583_020_800_500, "2020-03-01T00:00:00.500Z" },
    before_epoch = { -1_000, "1969-12-31T23:59:59.000Z" },
    out_of_range = { i64::MAX, "9223372036854775807ms" },
)]
fn formats_times(ms: i64, expected: &str) {
    assert_eq!(format_time(ms), expected);
}
