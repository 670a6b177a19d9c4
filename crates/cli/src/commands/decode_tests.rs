// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::error::Error;
use yare::parameterized;

fn decode_to_string(hex: &str, broker_time: f64) -> Result<String> {
    let mut out = Vec::new();
    run(&mut out, hex, broker_time)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn prints_every_field() {
    let text = decode_to_string("05000001709364780041ac0000", 1_583_020_800.5).unwrap();

    assert_eq!(
        text,
        "delivered: 2020-03-01T00:00:00.500Z\n\
         sample:    2020-03-01T00:00:00.000Z\n\
         type:      float32\n\
         value:     21.5\n"
    );
}

#[parameterized(
    int32 = { "030000017093647800fffffff9", "int32", "-7" },
    string = { "0700000170936478006f6b", "string", "\"ok\"" },
    upper_case_hex = { "05000001709364780041AC0000", "float32", "21.5" },
)]
fn decodes_each_type(hex: &str, tag: &str, value: &str) {
    let text = decode_to_string(hex, 0.0).unwrap();

    assert!(text.contains(&format!("type:      {tag}\n")), "{text}");
    assert!(text.contains(&format!("value:     {value}\n")), "{text}");
}

#[test]
fn surrounding_whitespace_is_ignored() {
    assert!(decode_to_string("  05000001709364780041ac0000\n", 0.0).is_ok());
}

#[test]
fn odd_length_hex_is_rejected() {
    let err = decode_to_string("050", 0.0).unwrap_err();
    assert!(matches!(err, Error::InvalidHex(_)));
}

#[test]
fn short_envelope_is_rejected() {
    let err = decode_to_string("0500", 0.0).unwrap_err();
    assert!(matches!(
        err,
        Error::Codec(fl_core::CodecError::Truncated { len: 2 })
    ));
}

#[test]
fn unknown_tag_is_rejected() {
    let err = decode_to_string("090000017093647800", 0.0).unwrap_err();
    assert_eq!(err.to_string(), "cannot decode envelope: unknown type tag 9");
}
