// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed record files.
//!
//! Persisted state is a sequence of frames:
//! - 4 bytes: frame length (big-endian u32)
//! - N bytes: JSON-encoded record
//!
//! The first frame is a [`FileHeader`] naming the file kind and version, so
//! a reader can reject a file of the wrong shape before trusting any record.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Maximum frame size (1MB) so a corrupt length cannot trigger a huge allocation.
const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Current record format version.
pub const FORMAT_VERSION: u32 = 1;

/// Error type for reading and writing record files.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("frame too large: {0} bytes")]
    TooLarge(usize),

    #[error("file ends inside a frame")]
    Truncated,

    #[error("file is empty")]
    Empty,

    #[error("expected a {expected} file, found {found} v{version}")]
    WrongShape {
        expected: &'static str,
        found: String,
        version: u32,
    },
}

impl FrameError {
    /// True when the file exists but holds something other than the expected kind.
    pub fn is_wrong_shape(&self) -> bool {
        matches!(self, FrameError::WrongShape { .. })
    }
}

/// First frame of every record file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub kind: String,
    pub version: u32,
}

/// Writes one frame.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, record: &T) -> Result<(), FrameError> {
    let json = serde_json::to_vec(record)?;
    let len = u32::try_from(json.len()).map_err(|_| FrameError::TooLarge(json.len()))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&json)?;
    Ok(())
}

/// Reads one frame, returning `None` at a clean end of file.
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>, FrameError> {
    let mut len_buf = [0u8; 4];
    match read_full(reader, &mut len_buf)? {
        0 => return Ok(None),
        4 => {}
        _ => return Err(FrameError::Truncated),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge(len));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => FrameError::Truncated,
        _ => FrameError::Io(e),
    })?;
    Ok(Some(serde_json::from_slice(&buf)?))
}

/// Like `read_exact`, but reports how many bytes were read before EOF.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Writes a complete record file: header, then one frame per record.
///
/// The file is fsynced before returning.
pub fn write_file<'a, T, I>(path: &Path, kind: &'static str, records: I) -> Result<(), FrameError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_frame(
        &mut writer,
        &FileHeader {
            kind: kind.to_string(),
            version: FORMAT_VERSION,
        },
    )?;
    for record in records {
        write_frame(&mut writer, record)?;
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Reads a complete record file, checking its header.
pub fn read_file<T: DeserializeOwned>(path: &Path, kind: &'static str) -> Result<Vec<T>, FrameError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let header: FileHeader = read_frame(&mut reader)?.ok_or(FrameError::Empty)?;
    if header.kind != kind || header.version != FORMAT_VERSION {
        return Err(FrameError::WrongShape {
            expected: kind,
            found: header.kind,
            version: header.version,
        });
    }

    let mut records = Vec::new();
    while let Some(record) = read_frame(&mut reader)? {
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
