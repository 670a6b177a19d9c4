// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! fieldlink - operator tool for the fieldlink datalogger pipeline.
//!
//! Reads what the `fieldlinkd` daemon leaves behind without needing the
//! daemon, the instrument, or any broker:
//!
//! - `decode` a single sample envelope given as hex
//! - list the messages in a persisted packet `queue`
//! - list the table `cursors` in a persisted cursor store

mod cli;
mod commands;

pub mod error;

pub use cli::{Cli, Command};
pub use error::{Error, Result};

/// Execute a CLI command, writing its output to stdout.
pub fn run(command: Command) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match command {
        Command::Decode { hex, broker_time } => commands::decode::run(&mut out, &hex, broker_time),
        Command::Queue { file, json } => commands::queue::run(&mut out, &file, json),
        Command::Cursors { file, json } => commands::cursors::run(&mut out, &file, json),
    }
}
