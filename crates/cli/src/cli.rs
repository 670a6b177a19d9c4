// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};

const EXAMPLES_HELP: &str = "\
Examples:
  fieldlink decode 05000001709364780041ac0000
  fieldlink queue /var/lib/fieldlink/packet_queue.data --json
  fieldlink cursors /var/lib/fieldlink/cursor_store.data";

#[derive(Parser)]
#[command(name = "fieldlink")]
#[command(about = "Inspect fieldlink envelopes and persisted daemon state")]
#[command(
    long_about = "Inspect fieldlink envelopes and persisted daemon state.\n\n\
    All commands are read-only: files are never created, backed up, or repaired."
)]
#[command(after_help = EXAMPLES_HELP)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Decode one hex-encoded sample envelope
    #[command(after_help = "Examples:\n  \
        fieldlink decode 05000001709364780041ac0000\n  \
        fieldlink decode 05000001709364780041ac0000 --broker-time 1583020800.5")]
    Decode {
        /// Envelope bytes as hex
        hex: String,

        /// Broker timestamp in seconds, reported as the delivery time
        #[arg(long = "broker-time", default_value_t = 0.0)]
        broker_time: f64,
    },

    /// List the messages waiting in a persisted packet queue
    Queue {
        /// Path to the packet queue file
        file: PathBuf,

        /// Print one JSON object per message
        #[arg(long)]
        json: bool,
    },

    /// List the table cursors in a persisted cursor store
    Cursors {
        /// Path to the cursor store file
        file: PathBuf,

        /// Print one JSON object per cursor
        #[arg(long)]
        json: bool,
    },
}
