// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;
use std::path::Path;

use fl_core::{codec, DeliveryQueue, QueuedMessage, TypedScalar};
use serde::Serialize;

use super::format_time;
use crate::error::{Error, Result};

/// One queue entry as printed by `--json`.
#[derive(Serialize)]
struct MessageView {
    index: usize,
    /// Topic relative to the broker's topic root.
    topic: String,
    enqueue_time_ms: i64,
    enqueued_at: String,
    payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample: Option<SampleView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct SampleView {
    timestamp_ms: i64,
    time: String,
    value: TypedScalar,
}

impl MessageView {
    fn new(index: usize, message: &QueuedMessage) -> Self {
        let (sample, error) = match codec::decode(0.0, &message.payload) {
            Ok(decoded) => (
                Some(SampleView {
                    timestamp_ms: decoded.sample_timestamp_ms,
                    time: format_time(decoded.sample_timestamp_ms),
                    value: decoded.value,
                }),
                None,
            ),
            Err(e) => (None, Some(e.to_string())),
        };
        MessageView {
            index,
            topic: format!("{}/{}", message.table, message.value_name),
            enqueue_time_ms: message.enqueue_time_ms,
            enqueued_at: format_time(message.enqueue_time_ms),
            payload: hex::encode(&message.payload),
            sample,
            error,
        }
    }

    fn text_line(&self) -> String {
        let detail = match &self.sample {
            Some(s) => format!("{} {} @ {}", s.value.tag(), s.value, s.time),
            None => format!("<undecodable: {}>", self.error.as_deref().unwrap_or_default()),
        };
        format!("{:>4}  {}  {}  {}", self.index, self.enqueued_at, self.topic, detail)
    }
}

pub fn run(out: &mut impl Write, path: &Path, json: bool) -> Result<()> {
    let messages = DeliveryQueue::read(path).map_err(|e| Error::read(path, e))?;
    let views: Vec<_> = messages
        .iter()
        .enumerate()
        .map(|(i, m)| MessageView::new(i, m))
        .collect();

    if json {
        for view in &views {
            writeln!(out, "{}", serde_json::to_string(view)?)?;
        }
        return Ok(());
    }

    if views.is_empty() {
        writeln!(out, "No queued messages")?;
        return Ok(());
    }
    for view in &views {
        writeln!(out, "{}", view.text_line())?;
    }
    let noun = if views.len() == 1 { "message" } else { "messages" };
    writeln!(out, "{} {noun} queued", views.len())?;
    Ok(())
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
