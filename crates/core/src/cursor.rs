// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-table cursors and their persisted store.
//!
//! A cursor remembers the highest record number already delivered for one
//! table, so a restart resumes from there instead of re-fetching history.
//! The store is rewritten in place after every table completes a fetch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::framing::{self, FrameError};

/// File kind written into the store's header frame.
pub const CURSOR_FILE_KIND: &str = "cursor_store";

/// Default file name of the cursor store.
pub const CURSOR_FILE_NAME: &str = "cursor_store.data";

/// Bookmark into one instrument table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCursor {
    pub name: String,
    pub last_record_no: i64,
    pub first_run: bool,
}

impl TableCursor {
    /// A cursor for a table seen for the first time.
    pub fn new(name: impl Into<String>) -> Self {
        TableCursor {
            name: name.into(),
            last_record_no: 0,
            first_run: true,
        }
    }

    /// True if a record with this number has not been delivered yet.
    pub fn accepts(&self, record_no: i64) -> bool {
        record_no > self.last_record_no
    }

    /// Moves the cursor forward. Never moves it backwards.
    ///
    /// Returns true if the cursor moved.
    pub fn advance(&mut self, record_no: i64) -> bool {
        if self.accepts(record_no) {
            self.last_record_no = record_no;
            true
        } else {
            false
        }
    }

    /// Marks the table as having received its first batch.
    pub fn complete_first_run(&mut self) {
        self.first_run = false;
    }
}

/// Persisted mapping of table name to cursor.
#[derive(Debug)]
pub struct CursorStore {
    path: PathBuf,
    cursors: BTreeMap<String, TableCursor>,
}

impl CursorStore {
    /// Loads the store at `path`.
    ///
    /// A missing, corrupt, empty, or wrong-shaped file yields an empty store,
    /// which is immediately persisted so the file exists for the next run.
    pub fn load(path: &Path) -> Self {
        let mut store = CursorStore {
            path: path.to_path_buf(),
            cursors: BTreeMap::new(),
        };

        match framing::read_file::<TableCursor>(path, CURSOR_FILE_KIND) {
            Ok(cursors) if !cursors.is_empty() => {
                for cursor in cursors {
                    tracing::info!(
                        table = %cursor.name,
                        last_record_no = cursor.last_record_no,
                        "loaded table cursor"
                    );
                    store.cursors.insert(cursor.name.clone(), cursor);
                }
                return store;
            }
            Ok(_) => tracing::info!(path = %path.display(), "no table cursors loaded"),
            Err(FrameError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "cursor store not found, creating it");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable cursor store");
            }
        }

        store.save_logged();
        store
    }

    /// Reads the cursors in a store file without creating or repairing it.
    pub fn read(path: &Path) -> Result<Vec<TableCursor>, FrameError> {
        framing::read_file(path, CURSOR_FILE_KIND)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All cursors, ordered by table name.
    pub fn cursors(&self) -> &BTreeMap<String, TableCursor> {
        &self.cursors
    }

    pub fn get(&self, table: &str) -> Option<&TableCursor> {
        self.cursors.get(table)
    }

    pub fn get_mut(&mut self, table: &str) -> Option<&mut TableCursor> {
        self.cursors.get_mut(table)
    }

    /// Returns the cursor for `table`, creating a fresh one if absent.
    pub fn get_or_create(&mut self, table: &str) -> &mut TableCursor {
        self.cursors
            .entry(table.to_string())
            .or_insert_with(|| TableCursor::new(table))
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Overwrites the backing file with the current cursors.
    pub fn save(&self) -> Result<(), FrameError> {
        framing::write_file(&self.path, CURSOR_FILE_KIND, self.cursors.values())
    }

    /// Saves, logging instead of returning a failure.
    ///
    /// Ingestion keeps running on in-memory cursors when the disk is unavailable.
    pub fn save_logged(&self) -> bool {
        match self.save() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "unable to write cursor store");
                false
            }
        }
    }

    /// Forgets every cursor and persists the empty set.
    ///
    /// Used when the instrument may have been reprogrammed: every table is
    /// treated as new afterwards.
    pub fn reset(&mut self) {
        self.cursors.clear();
        self.save_logged();
    }
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;
