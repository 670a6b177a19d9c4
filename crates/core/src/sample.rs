// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed samples leaving the ingestion loop.
//!
//! A [`Sample`] is one named value of one table record, stamped with the
//! record's delivery timestamp. Its payload is a [`TypedScalar`], whose
//! variant determines the one-byte [`TypeTag`] used in the wire envelope.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type codes carried in the first byte of an envelope.
///
/// The numbering follows the streaming broker's channel type codes so that
/// envelopes can be replayed by readers that only know those codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeTag {
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    Float32 = 5,
    Float64 = 6,
    String = 7,
}

impl TypeTag {
    /// Returns the raw byte for this tag.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Looks up a tag by its raw byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(TypeTag::Int8),
            2 => Some(TypeTag::Int16),
            3 => Some(TypeTag::Int32),
            4 => Some(TypeTag::Int64),
            5 => Some(TypeTag::Float32),
            6 => Some(TypeTag::Float64),
            7 => Some(TypeTag::String),
            _ => None,
        }
    }

    /// Width of the encoded value in bytes, `None` for variable width.
    pub fn value_width(self) -> Option<usize> {
        match self {
            TypeTag::Int8 => Some(1),
            TypeTag::Int16 => Some(2),
            TypeTag::Int32 | TypeTag::Float32 => Some(4),
            TypeTag::Int64 | TypeTag::Float64 => Some(8),
            TypeTag::String => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Int8 => "int8",
            TypeTag::Int16 => "int16",
            TypeTag::Int32 => "int32",
            TypeTag::Int64 => "int64",
            TypeTag::Float32 => "float32",
            TypeTag::Float64 => "float64",
            TypeTag::String => "string",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar value of one of the supported envelope types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedScalar {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
}

impl TypedScalar {
    /// The tag matching this value's variant.
    pub fn tag(&self) -> TypeTag {
        match self {
            TypedScalar::Int8(_) => TypeTag::Int8,
            TypedScalar::Int16(_) => TypeTag::Int16,
            TypedScalar::Int32(_) => TypeTag::Int32,
            TypedScalar::Int64(_) => TypeTag::Int64,
            TypedScalar::Float32(_) => TypeTag::Float32,
            TypedScalar::Float64(_) => TypeTag::Float64,
            TypedScalar::String(_) => TypeTag::String,
        }
    }

    /// Converts the value to `f32`.
    ///
    /// Strings are parsed; anything that cannot be represented becomes NaN.
    // CORRECTNESS: narrowing to f32 is the documented float32 normalisation
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn to_f32(&self) -> f32 {
        match self {
            TypedScalar::Int8(v) => f32::from(*v),
            TypedScalar::Int16(v) => f32::from(*v),
            TypedScalar::Int32(v) => *v as f32,
            TypedScalar::Int64(v) => *v as f32,
            TypedScalar::Float32(v) => *v,
            TypedScalar::Float64(v) => *v as f32,
            TypedScalar::String(s) => s.trim().parse::<f32>().unwrap_or(f32::NAN),
        }
    }
}

impl fmt::Display for TypedScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedScalar::Int8(v) => write!(f, "{v}"),
            TypedScalar::Int16(v) => write!(f, "{v}"),
            TypedScalar::Int32(v) => write!(f, "{v}"),
            TypedScalar::Int64(v) => write!(f, "{v}"),
            TypedScalar::Float32(v) => write!(f, "{v}"),
            TypedScalar::Float64(v) => write!(f, "{v}"),
            TypedScalar::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// One value of one table record, ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub table: String,
    pub value_name: String,
    /// Delivery timestamp in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub value: TypedScalar,
}

impl Sample {
    pub fn new(
        table: impl Into<String>,
        value_name: impl Into<String>,
        timestamp_ms: i64,
        value: TypedScalar,
    ) -> Self {
        Sample {
            table: table.into(),
            value_name: value_name.into(),
            timestamp_ms,
            value,
        }
    }

    /// The `table/value_name` channel this sample is delivered on.
    pub fn channel(&self) -> String {
        format!("{}/{}", self.table, self.value_name)
    }

    /// Encodes this sample's payload into an envelope.
    pub fn envelope(&self) -> Option<Vec<u8>> {
        crate::codec::encode(self.value.tag().as_byte(), self.timestamp_ms, &self.value)
    }
}

#[cfg(test)]
#[path = "sample_tests.rs"]
mod tests;
