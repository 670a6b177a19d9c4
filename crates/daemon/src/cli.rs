// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

use crate::config::{BackendKind, ValueEncoding};

/// Command-line flags. Every flag overrides the matching config file entry.
#[derive(Debug, Default, Parser)]
#[command(name = "fieldlinkd", version, about = "Datalogger ingestion and delivery daemon")]
pub struct Args {
    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Root directory for persisted state, logs and the alert spool
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Site name used in topics, client ids and alerts
    #[arg(long)]
    pub site: Option<String>,

    /// Instrument gateway address
    #[arg(long, value_name = "HOST:PORT")]
    pub address: Option<String>,

    /// Instrument station id
    #[arg(long)]
    pub station_id: Option<u16>,

    /// Delivery backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// How instrument values are typed on the wire
    #[arg(long, value_enum)]
    pub value_encoding: Option<ValueEncoding>,

    /// Re-fetch every table from this time (ms since 1970, or RFC 3339)
    #[arg(long, value_name = "TIMESTAMP")]
    pub replay_from: Option<String>,

    /// Days of history fetched for a table seen for the first time
    #[arg(long, value_name = "DAYS")]
    pub bootstrap_days: Option<u32>,

    /// Message broker URI
    #[arg(long, value_name = "URI")]
    pub broker_uri: Option<String>,

    /// Streaming broker address
    #[arg(long, value_name = "HOST:PORT")]
    pub streaming_address: Option<String>,

    /// Mirror the log to stderr
    #[arg(long)]
    pub debug: bool,
}
