// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The datalogger collaborator.
//!
//! An [`Instrument`] exposes append-only tables of numbered records. All
//! calls block until the instrument has answered; failures come back as
//! classified [`LinkError`]s.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::link::LinkResult;
use crate::sample::TypedScalar;

/// One table as listed in the instrument's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    /// How often the instrument appends a record. Zero for event-driven tables.
    #[serde(with = "duration_ms")]
    pub sampling_interval: Duration,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, sampling_interval: Duration) -> Self {
        TableDescriptor {
            name: name.into(),
            sampling_interval,
        }
    }
}

/// One named value within a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub raw_value: TypedScalar,
}

impl NamedValue {
    pub fn new(name: impl Into<String>, raw_value: TypedScalar) -> Self {
        NamedValue {
            name: name.into(),
            raw_value,
        }
    }
}

/// One row of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub record_no: i64,
    /// Collection time in seconds since the instrument epoch.
    pub instrument_epoch_seconds: i64,
    pub values: Vec<NamedValue>,
}

/// Blocking access to a datalogger.
pub trait Instrument: Send {
    /// Opens the link. Returns false if the instrument did not answer.
    fn connect(&mut self, address: &str, station_id: u16) -> LinkResult<bool>;

    /// Lists the tables the instrument currently has.
    fn list_tables(&mut self) -> LinkResult<Vec<TableDescriptor>>;

    /// Records with a number greater than `from_record_no`.
    fn fetch_by_record_no(&mut self, table: &str, from_record_no: i64) -> LinkResult<Vec<Record>>;

    /// Records from the last `days` days.
    fn fetch_by_duration(&mut self, table: &str, days: u32) -> LinkResult<Vec<Record>>;

    /// Records newer than `from_timestamp_ms` (Unix epoch milliseconds).
    fn fetch_by_timestamp(&mut self, table: &str, from_timestamp_ms: i64) -> LinkResult<Vec<Record>>;

    /// Closes the link. Errors are not interesting at this point.
    fn disconnect(&mut self) {}
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
