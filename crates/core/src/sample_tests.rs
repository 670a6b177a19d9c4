// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[test]
fn tags_round_trip_through_their_byte() {
    for byte in 1..=7u8 {
        assert_eq!(TypeTag::from_byte(byte).unwrap().as_byte(), byte);
    }
    assert_eq!(TypeTag::from_byte(0), None);
    assert_eq!(TypeTag::from_byte(8), None);
}

#[parameterized(
    int8 = { TypedScalar::Int8(-3), -3.0 },
    int16 = { TypedScalar::Int16(300), 300.0 },
    int32 = { TypedScalar::Int32(70_000), 70_000.0 },
    int64 = { TypedScalar::Int64(1 << 40), 1_099_511_627_776.0 },
    float64 = { TypedScalar::Float64(12.5), 12.5 },
    numeric_string = { TypedScalar::String(" 4.25 ".to_string()), 4.25 },
)]
fn to_f32_converts_numbers(value: TypedScalar, expected: f32) {
    assert_eq!(value.to_f32(), expected);
}

#[test]
fn non_numeric_string_becomes_nan() {
    assert!(TypedScalar::String("OFF".to_string()).to_f32().is_nan());
}

#[test]
fn channel_joins_table_and_value() {
    let sample = Sample::new("Met", "AirTC", 0, TypedScalar::Float32(1.0));
    assert_eq!(sample.channel(), "Met/AirTC");
}

#[test]
fn strings_display_quoted() {
    assert_eq!(TypedScalar::String("ok".to_string()).to_string(), "\"ok\"");
    assert_eq!(TypedScalar::Int16(-2).to_string(), "-2");
    assert_eq!(TypeTag::Float64.to_string(), "float64");
}
