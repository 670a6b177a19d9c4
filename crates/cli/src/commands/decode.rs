// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use fl_core::codec;

use super::format_time;
use crate::error::Result;

pub fn run(out: &mut impl Write, hex: &str, broker_time: f64) -> Result<()> {
    let bytes = hex::decode(hex.trim())?;
    let decoded = codec::decode(broker_time, &bytes)?;

    writeln!(out, "delivered: {}", format_time(decoded.delivery_timestamp_ms))?;
    writeln!(out, "sample:    {}", format_time(decoded.sample_timestamp_ms))?;
    writeln!(out, "type:      {}", decoded.value.tag())?;
    writeln!(out, "value:     {}", decoded.value)?;
    Ok(())
}

#[cfg(test)]
#[path = "decode_tests.rs"]
mod tests;
