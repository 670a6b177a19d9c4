// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! A [`Config`] is built once at startup from, lowest precedence first:
//! - built-in defaults
//! - an optional TOML file (`--config`)
//! - command-line flags
//!
//! It is never mutated afterwards; every component receives what it needs
//! from it at construction.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::DateTime;
use clap::ValueEnum;
use fl_core::cursor::CURSOR_FILE_NAME;
use fl_core::queue::QUEUE_FILE_NAME;
use fl_core::ReconnectPolicy;
use serde::Deserialize;

use crate::adapters::mqtt::parse_broker_uri;
use crate::cli::Args;
use crate::env;
use crate::error::{Error, Result};

const LOG_DIR_NAME: &str = "logs";
const LOG_FILE_NAME: &str = "fieldlinkd.log";
const LOCK_FILE_NAME: &str = "fieldlinkd.lock";
const MQTT_PERSISTENCE_DIR_NAME: &str = "mqtt";
const OUTBOX_DIR: &str = "mail/outbox";

/// Which sink samples are delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Synchronous push to a streaming broker.
    Streaming,
    /// Durable queue drained to a message broker.
    Queued,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Streaming => write!(f, "streaming"),
            BackendKind::Queued => write!(f, "queued"),
        }
    }
}

/// How instrument values are typed before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ValueEncoding {
    /// Every value becomes a float32, NaN when it cannot be converted.
    Float32,
    /// Values keep the instrument's own type.
    Native,
}

impl fmt::Display for ValueEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueEncoding::Float32 => write!(f, "float32"),
            ValueEncoding::Native => write!(f, "native"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstrumentConfig {
    pub address: String,
    pub station_id: u16,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        InstrumentConfig {
            address: "192.168.13.110:6785".to_string(),
            station_id: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamingConfig {
    pub address: String,
    pub client_name: String,
    pub sync_client_name: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        StreamingConfig {
            address: "127.0.0.1:3333".to_string(),
            client_name: "cr1000".to_string(),
            sync_client_name: "cr1000_sync".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub uri: String,
    pub topic_root: String,
    pub client_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconnectConfig {
    /// Attempts per episode, 0 = unlimited.
    pub max_attempts: u32,
    pub delay_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig {
            max_attempts: 8640,
            delay_secs: 30,
        }
    }
}

/// Broker section as written in the file; topic and client id default from the site.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct BrokerFile {
    uri: Option<String>,
    topic_root: Option<String>,
    client_id: Option<String>,
}

/// The TOML file. Absent keys fall back to defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    root_dir: Option<PathBuf>,
    site: Option<String>,
    bootstrap_days: Option<u32>,
    replay_from: Option<toml::Value>,
    timezone_raw_offset_minutes: Option<i32>,
    backend: Option<BackendKind>,
    value_encoding: Option<ValueEncoding>,
    watchdog_secs: Option<u64>,
    shutdown_grace_secs: Option<u64>,
    drain_interval_ms: Option<u64>,
    fallback_poll_ms: Option<u64>,
    debug: Option<bool>,
    instrument: InstrumentConfig,
    streaming: StreamingConfig,
    broker: BrokerFile,
    reconnect: ReconnectConfig,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("failed to parse config: {}", e)))
    }
}

/// Effective daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub root_dir: PathBuf,
    pub site: String,
    pub instrument: InstrumentConfig,
    pub bootstrap_days: u32,
    /// Replay start in ms since the Unix epoch; `Some` enables replay mode.
    pub replay_from_ms: Option<i64>,
    pub timezone_raw_offset_minutes: i32,
    pub backend: BackendKind,
    pub value_encoding: ValueEncoding,
    pub streaming: StreamingConfig,
    pub broker: BrokerConfig,
    pub reconnect: ReconnectConfig,
    pub watchdog_secs: u64,
    pub shutdown_grace_secs: u64,
    pub drain_interval_ms: u64,
    pub fallback_poll_ms: u64,
    pub debug: bool,
}

impl Config {
    /// Builds the configuration from flags, the config file they name, and
    /// the environment.
    pub fn resolve(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::from_sources(args, file, env::root_dir())
    }

    /// Parses a TOML document and layers `args` over it.
    pub fn from_toml(args: &Args, content: &str, env_root: Option<PathBuf>) -> Result<Self> {
        Self::from_sources(args, FileConfig::parse(content)?, env_root)
    }

    fn from_sources(args: &Args, file: FileConfig, env_root: Option<PathBuf>) -> Result<Self> {
        let root_dir = args
            .dir
            .clone()
            .or(env_root)
            .or(file.root_dir)
            .unwrap_or_else(env::default_root_dir);

        let site = args.site.clone().or(file.site).unwrap_or_default();

        let mut instrument = file.instrument;
        if let Some(address) = &args.address {
            instrument.address = address.clone();
        }
        if let Some(station_id) = args.station_id {
            instrument.station_id = station_id;
        }

        let mut streaming = file.streaming;
        if let Some(address) = &args.streaming_address {
            streaming.address = address.clone();
        }

        let broker = BrokerConfig {
            uri: args
                .broker_uri
                .clone()
                .or(file.broker.uri)
                .unwrap_or_else(|| "tcp://localhost:1883".to_string()),
            topic_root: file
                .broker
                .topic_root
                .unwrap_or_else(|| format!("{site}/data/cr1000")),
            client_id: file
                .broker
                .client_id
                .unwrap_or_else(|| format!("{site}/data_publisher/cr1000")),
        };

        let replay_from_ms = match (&args.replay_from, file.replay_from) {
            (Some(flag), _) => Some(parse_timestamp(flag)?),
            (None, Some(toml::Value::Integer(ms))) => Some(ms),
            (None, Some(toml::Value::String(s))) => Some(parse_timestamp(&s)?),
            (None, Some(toml::Value::Datetime(dt))) => Some(parse_timestamp(&dt.to_string())?),
            (None, Some(other)) => {
                return Err(Error::Config(format!("invalid replay_from: {other}")));
            }
            (None, None) => None,
        };

        let config = Config {
            root_dir,
            site,
            instrument,
            bootstrap_days: args.bootstrap_days.or(file.bootstrap_days).unwrap_or(3),
            replay_from_ms,
            timezone_raw_offset_minutes: file.timezone_raw_offset_minutes.unwrap_or(-420),
            backend: args.backend.or(file.backend).unwrap_or(BackendKind::Queued),
            value_encoding: args
                .value_encoding
                .or(file.value_encoding)
                .unwrap_or(ValueEncoding::Float32),
            streaming,
            broker,
            reconnect: file.reconnect,
            watchdog_secs: file.watchdog_secs.unwrap_or(600),
            shutdown_grace_secs: file.shutdown_grace_secs.unwrap_or(60),
            drain_interval_ms: file.drain_interval_ms.unwrap_or(1000),
            fallback_poll_ms: file.fallback_poll_ms.unwrap_or(1000),
            debug: args.debug || file.debug.unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the daemon cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.site.trim().is_empty() {
            return Err(Error::Config(
                "site is required\n  hint: pass --site or set site in the config file".to_string(),
            ));
        }
        if self.instrument.address.is_empty() {
            return Err(Error::Config("instrument address is empty".to_string()));
        }
        let zero = [
            ("reconnect.delay_secs", self.reconnect.delay_secs),
            ("watchdog_secs", self.watchdog_secs),
            ("drain_interval_ms", self.drain_interval_ms),
            ("fallback_poll_ms", self.fallback_poll_ms),
        ]
        .into_iter()
        .find(|(_, v)| *v == 0);
        if let Some((name, _)) = zero {
            return Err(Error::Config(format!("{name} must be greater than zero")));
        }
        if self.backend == BackendKind::Queued {
            parse_broker_uri(&self.broker.uri).map_err(|e| Error::Config(format!("broker.uri: {e}")))?;
            if self.broker.client_id.is_empty() || self.broker.client_id.starts_with(' ') {
                return Err(Error::Config("broker.client_id must not be empty or start with a space".to_string()));
            }
        }
        Ok(())
    }

    pub fn replay_mode(&self) -> bool {
        self.replay_from_ms.is_some()
    }

    pub fn raw_offset_ms(&self) -> i64 {
        i64::from(self.timezone_raw_offset_minutes) * 60_000
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            self.reconnect.max_attempts,
            Duration::from_secs(self.reconnect.delay_secs),
        )
    }

    pub fn watchdog_ceiling(&self) -> Duration {
        Duration::from_secs(self.watchdog_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub fn fallback_poll(&self) -> Duration {
        Duration::from_millis(self.fallback_poll_ms)
    }

    pub fn cursor_path(&self) -> PathBuf {
        self.root_dir.join(CURSOR_FILE_NAME)
    }

    pub fn queue_path(&self) -> PathBuf {
        self.root_dir.join(QUEUE_FILE_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.root_dir.join(LOG_DIR_NAME).join(LOG_FILE_NAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root_dir.join(LOCK_FILE_NAME)
    }

    pub fn mqtt_persistence_dir(&self) -> PathBuf {
        self.root_dir.join(MQTT_PERSISTENCE_DIR_NAME)
    }

    pub fn outbox_dir(&self) -> PathBuf {
        self.root_dir.join(OUTBOX_DIR)
    }

    /// Logs every effective setting.
    pub fn log_summary(&self) {
        tracing::info!(root_dir = %self.root_dir.display(), site = %self.site, "configuration");
        tracing::info!(
            address = %self.instrument.address,
            station_id = self.instrument.station_id,
            bootstrap_days = self.bootstrap_days,
            replay_from_ms = ?self.replay_from_ms,
            timezone_raw_offset_minutes = self.timezone_raw_offset_minutes,
            value_encoding = %self.value_encoding,
            "instrument"
        );
        match self.backend {
            BackendKind::Streaming => tracing::info!(
                backend = %self.backend,
                address = %self.streaming.address,
                client_name = %self.streaming.client_name,
                sync_client_name = %self.streaming.sync_client_name,
                "delivery"
            ),
            BackendKind::Queued => tracing::info!(
                backend = %self.backend,
                uri = %self.broker.uri,
                topic_root = %self.broker.topic_root,
                client_id = %self.broker.client_id,
                watchdog_secs = self.watchdog_secs,
                "delivery"
            ),
        }
        tracing::info!(
            max_attempts = self.reconnect.max_attempts,
            delay_secs = self.reconnect.delay_secs,
            shutdown_grace_secs = self.shutdown_grace_secs,
            debug = self.debug,
            "reconnect"
        );
    }
}

/// Parses a replay start: integer milliseconds since 1970, or RFC 3339.
pub fn parse_timestamp(s: &str) -> Result<i64> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<i64>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| Error::Config(format!("invalid timestamp '{s}': {e}")))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
