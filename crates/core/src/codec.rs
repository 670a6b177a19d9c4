// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sample envelope codec.
//!
//! Layout:
//! - 1 byte: type tag (see [`TypeTag`])
//! - 8 bytes: sample timestamp, big-endian `i64`, ms since the Unix epoch
//! - N bytes: the value, big-endian for numbers, raw UTF-8 for strings
//!
//! Strings carry no length prefix; the reader takes the rest of the buffer.

use crate::sample::{TypeTag, TypedScalar};

/// Size of the tag plus timestamp prefix.
pub const HEADER_LEN: usize = 9;

/// Error type for envelope decoding.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("envelope too short: {len} bytes")]
    Truncated { len: usize },

    #[error("unknown type tag {0}")]
    UnknownTag(u8),

    #[error("{tag} value has {actual} bytes, expected {expected}")]
    WrongWidth {
        tag: TypeTag,
        actual: usize,
        expected: usize,
    },

    #[error("string value is not valid UTF-8")]
    InvalidUtf8,
}

/// A decoded envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Timestamp assigned by the broker the envelope was read from.
    pub delivery_timestamp_ms: i64,
    /// Timestamp carried inside the envelope.
    pub sample_timestamp_ms: i64,
    pub value: TypedScalar,
}

/// Encodes a value under the given raw type tag.
///
/// Returns `None` (and logs) when the tag is unknown or does not match the
/// value's type.
pub fn encode(tag: u8, timestamp_ms: i64, value: &TypedScalar) -> Option<Vec<u8>> {
    let Some(tag) = TypeTag::from_byte(tag) else {
        tracing::warn!(tag, "cannot encode value with unsupported type tag");
        return None;
    };
    if tag != value.tag() {
        tracing::warn!(%tag, actual = %value.tag(), "type tag does not match value");
        return None;
    }

    let mut out = Vec::with_capacity(HEADER_LEN + tag.value_width().unwrap_or(16));
    out.push(tag.as_byte());
    out.extend_from_slice(&timestamp_ms.to_be_bytes());
    match value {
        TypedScalar::Int8(v) => out.extend_from_slice(&v.to_be_bytes()),
        TypedScalar::Int16(v) => out.extend_from_slice(&v.to_be_bytes()),
        TypedScalar::Int32(v) => out.extend_from_slice(&v.to_be_bytes()),
        TypedScalar::Int64(v) => out.extend_from_slice(&v.to_be_bytes()),
        TypedScalar::Float32(v) => out.extend_from_slice(&v.to_be_bytes()),
        TypedScalar::Float64(v) => out.extend_from_slice(&v.to_be_bytes()),
        TypedScalar::String(s) => out.extend_from_slice(s.as_bytes()),
    }
    Some(out)
}

/// Decodes an envelope.
///
/// `broker_timestamp` is the broker's time for the envelope in seconds, as
/// streaming brokers report it; it is converted to milliseconds.
pub fn decode(broker_timestamp: f64, bytes: &[u8]) -> Result<Decoded, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Truncated { len: bytes.len() });
    }
    let tag = TypeTag::from_byte(bytes[0]).ok_or(CodecError::UnknownTag(bytes[0]))?;

    let mut ts = [0u8; 8];
    ts.copy_from_slice(&bytes[1..HEADER_LEN]);
    let sample_timestamp_ms = i64::from_be_bytes(ts);

    let body = &bytes[HEADER_LEN..];
    if let Some(expected) = tag.value_width() {
        if body.len() != expected {
            return Err(CodecError::WrongWidth {
                tag,
                actual: body.len(),
                expected,
            });
        }
    }

    let value = match tag {
        TypeTag::Int8 => TypedScalar::Int8(i8::from_be_bytes(fixed(body))),
        TypeTag::Int16 => TypedScalar::Int16(i16::from_be_bytes(fixed(body))),
        TypeTag::Int32 => TypedScalar::Int32(i32::from_be_bytes(fixed(body))),
        TypeTag::Int64 => TypedScalar::Int64(i64::from_be_bytes(fixed(body))),
        TypeTag::Float32 => TypedScalar::Float32(f32::from_be_bytes(fixed(body))),
        TypeTag::Float64 => TypedScalar::Float64(f64::from_be_bytes(fixed(body))),
        TypeTag::String => TypedScalar::String(
            String::from_utf8(body.to_vec()).map_err(|_| CodecError::InvalidUtf8)?,
        ),
    };

    // CORRECTNESS: broker times are seconds with ms precision, well inside i64
    #[allow(clippy::cast_possible_truncation)]
    let delivery_timestamp_ms = (broker_timestamp * 1000.0) as i64;

    Ok(Decoded {
        delivery_timestamp_ms,
        sample_timestamp_ms,
        value,
    })
}

/// Copies a width-checked body into a fixed array.
fn fixed<const N: usize>(body: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&body[..N]);
    buf
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
