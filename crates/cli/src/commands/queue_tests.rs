// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use fl_core::framing;
use fl_core::queue::QUEUE_FILE_KIND;
use fl_core::{CursorStore, Sample};
use serde_json::Value;
use tempfile::TempDir;

const SAMPLE_MS: i64 = 1_583_020_800_000;

fn message(table: &str, value_name: &str, value: TypedScalar) -> QueuedMessage {
    let payload = Sample::new(table, value_name, SAMPLE_MS, value)
        .envelope()
        .unwrap();
    QueuedMessage::new(payload, SAMPLE_MS + 1_000, table, value_name)
}

fn write_queue(dir: &TempDir, messages: &[QueuedMessage]) -> std::path::PathBuf {
    let path = dir.path().join("packet_queue.data");
    framing::write_file(&path, QUEUE_FILE_KIND, messages).unwrap();
    path
}

fn list(path: &Path, json: bool) -> Result<String> {
    let mut out = Vec::new();
    run(&mut out, path, json)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn lists_messages_in_queue_order() {
    let dir = TempDir::new().unwrap();
    let path = write_queue(
        &dir,
        &[
            message("Met", "AirTC", TypedScalar::Float32(21.5)),
            message("Met", "Batt", TypedScalar::Float32(12.25)),
        ],
    );

    let text = list(&path, false).unwrap();
    let lines: Vec<_> = text.lines().collect();

    assert_eq!(
        lines,
        [
            "   0  2020-03-01T00:00:01.000Z  Met/AirTC  float32 21.5 @ 2020-03-01T00:00:00.000Z",
            "   1  2020-03-01T00:00:01.000Z  Met/Batt  float32 12.25 @ 2020-03-01T00:00:00.000Z",
            "2 messages queued",
        ]
    );
}

#[test]
fn empty_queue_says_so() {
    let dir = TempDir::new().unwrap();
    let path = write_queue(&dir, &[]);

    assert_eq!(list(&path, false).unwrap(), "No queued messages\n");
    assert_eq!(list(&path, true).unwrap(), "");
}

#[test]
fn json_output_is_one_object_per_line() {
    let dir = TempDir::new().unwrap();
    let path = write_queue(
        &dir,
        &[
            message("Met", "AirTC", TypedScalar::Float32(21.5)),
            message("Status", "Code", TypedScalar::Int32(-7)),
        ],
    );

    let text = list(&path, true).unwrap();
    let objects: Vec<Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0]["index"], 0);
    assert_eq!(objects[0]["topic"], "Met/AirTC");
    assert_eq!(objects[0]["enqueue_time_ms"], SAMPLE_MS + 1_000);
    assert_eq!(objects[0]["payload"], "05000001709364780041ac0000");
    assert_eq!(objects[0]["sample"]["timestamp_ms"], SAMPLE_MS);
    assert_eq!(objects[0]["sample"]["value"]["type"], "float32");
    assert_eq!(objects[0]["sample"]["value"]["value"], 21.5);
    assert!(objects[0].get("error").is_none());

    assert_eq!(objects[1]["sample"]["value"]["type"], "int32");
    assert_eq!(objects[1]["sample"]["value"]["value"], -7);
}

#[test]
fn undecodable_payload_is_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let broken = QueuedMessage::new(vec![0x05, 0x00], SAMPLE_MS, "Met", "AirTC");
    let path = write_queue(&dir, &[broken]);

    let text = list(&path, false).unwrap();
    assert!(text.contains("<undecodable: envelope too short: 2 bytes>"), "{text}");

    let json: Value = serde_json::from_str(list(&path, true).unwrap().trim()).unwrap();
    assert_eq!(json["error"], "envelope too short: 2 bytes");
    assert!(json.get("sample").is_none());
}

#[test]
fn missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = list(&dir.path().join("absent.data"), false).unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert!(!dir.path().join("absent.data").exists());
}

#[test]
fn cursor_store_is_rejected_as_wrong_shape() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cursor_store.data");
    CursorStore::load(&path);

    let err = list(&path, false).unwrap_err();
    assert!(
        matches!(&err, Error::Read { source, .. } if source.is_wrong_shape()),
        "{err}"
    );
}

#[test]
fn reading_does_not_create_a_backup() {
    let dir = TempDir::new().unwrap();
    let path = write_queue(&dir, &[message("Met", "AirTC", TypedScalar::Float32(1.0))]);

    list(&path, false).unwrap();

    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}
