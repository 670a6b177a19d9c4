// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;
use std::path::Path;

use fl_core::CursorStore;

use crate::error::{Error, Result};

pub fn run(out: &mut impl Write, path: &Path, json: bool) -> Result<()> {
    let mut cursors = CursorStore::read(path).map_err(|e| Error::read(path, e))?;
    cursors.sort_by(|a, b| a.name.cmp(&b.name));

    if json {
        for cursor in &cursors {
            writeln!(out, "{}", serde_json::to_string(cursor)?)?;
        }
        return Ok(());
    }

    if cursors.is_empty() {
        writeln!(out, "No table cursors")?;
        return Ok(());
    }
    let width = cursors.iter().map(|c| c.name.len()).max().unwrap_or(0);
    for cursor in &cursors {
        let marker = if cursor.first_run { "  (awaiting first batch)" } else { "" };
        writeln!(
            out,
            "{:<width$}  record {}{marker}",
            cursor.name, cursor.last_record_no
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "cursors_tests.rs"]
mod tests;
