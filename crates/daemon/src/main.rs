// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! fieldlinkd - datalogger ingestion and delivery daemon.
//!
//! Polls the instrument for new table records and delivers every sample to
//! either the streaming broker or, through a durable local queue, the
//! message broker.
//!
//! Usage:
//!   fieldlinkd --site <name> [--config <path>] [--dir <path>]

use std::fs;
use std::path::Path;
use std::process;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};

use clap::Parser;
use fl_core::{
    Alerter, CancelToken, ClockSource, CursorStore, DeliveryQueue, ExitReason, ReconnectSupervisor,
    SystemClock,
};

mod adapters;
mod backend;
mod cli;
mod config;
mod env;
mod error;
mod ingest;
mod runtime;
mod shutdown;

#[cfg(test)]
mod test_helpers;

use adapters::{GatewayInstrument, MqttBroker, SpoolAlerter, TcpStreamingBroker};
use backend::{
    DeliverySettings, DeliveryWorker, QueueSink, SampleSink, StreamingSettings, StreamingSink,
    Watchdog, WatchdogMonitor,
};
use cli::Args;
use config::{BackendKind, Config};
use error::{Error, Result};
use ingest::{IngestLoop, IngestSettings};
use runtime::{spawn_worker, Worker};
use shutdown::ShutdownCoordinator;

fn main() {
    let args = Args::parse();
    match run(&args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            tracing::error!(error = %e, "fieldlinkd failed to start");
            eprintln!("fieldlinkd: {e}");
            process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<i32> {
    let config = Config::resolve(args)?;
    fs::create_dir_all(&config.root_dir)?;
    if let Some(dir) = config.log_path().parent() {
        fs::create_dir_all(dir)?;
    }
    setup_logging(&config.log_path(), config.debug);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "fieldlinkd starting");
    config.log_summary();

    let lock_path = config.lock_path();
    let _lock = acquire_lock(&lock_path)?;

    let alerter: Arc<dyn Alerter> = Arc::new(SpoolAlerter::new(config.outbox_dir()));
    let clock: Arc<dyn ClockSource> = Arc::new(SystemClock);
    let cursors = Arc::new(Mutex::new(CursorStore::load(&config.cursor_path())));

    let (events, exits) = mpsc::channel();
    install_stop_handler(events.clone())?;

    let ingest_cancel = CancelToken::new();
    let mut others: Vec<Worker> = Vec::new();
    let (sink, queue): (Box<dyn SampleSink>, _) = match config.backend {
        BackendKind::Streaming => {
            let supervisor = ReconnectSupervisor::new(
                "streaming broker",
                config.site.as_str(),
                config.reconnect_policy(),
                Arc::clone(&alerter),
            );
            // the sink runs on the ingest thread and shares its cancel token
            let sink = StreamingSink::new(
                Arc::new(TcpStreamingBroker::default()),
                supervisor,
                ingest_cancel.clone(),
                StreamingSettings::from_config(&config),
            );
            (Box::new(sink) as Box<dyn SampleSink>, None)
        }
        BackendKind::Queued => {
            let queue = match DeliveryQueue::load_from_disk(&config.queue_path()) {
                Ok(queue) => Arc::new(Mutex::new(queue)),
                Err(e) => {
                    tracing::error!(error = %e, "unable to load packet queue");
                    let coordinator = ShutdownCoordinator::new(
                        config.site.as_str(),
                        alerter,
                        cursors,
                        None,
                        config.shutdown_grace(),
                    );
                    return Ok(coordinator.shutdown(&ExitReason::QueueLoadFailed(e.to_string()), None, Vec::new()));
                }
            };
            tracing::info!(queued = ingest::lock(&queue).len(), "packet queue loaded");

            let watchdog = Arc::new(Watchdog::new(config.watchdog_ceiling(), Arc::clone(&clock)));
            let delivery_cancel = CancelToken::new();
            let delivery = DeliveryWorker::new(
                Arc::new(MqttBroker::default()),
                Arc::clone(&queue),
                Arc::clone(&watchdog),
                ReconnectSupervisor::new(
                    "message broker",
                    config.site.as_str(),
                    config.reconnect_policy(),
                    Arc::clone(&alerter),
                ),
                delivery_cancel.clone(),
                DeliverySettings::from_config(&config),
            );
            others.push(spawn_worker(Box::new(delivery), delivery_cancel, events.clone())?);

            let monitor_cancel = CancelToken::new();
            let monitor = WatchdogMonitor::new(watchdog, Arc::clone(&queue), monitor_cancel.clone());
            others.push(spawn_worker(Box::new(monitor), monitor_cancel, events.clone())?);

            let sink = QueueSink::new(Arc::clone(&queue), Arc::clone(&clock));
            (Box::new(sink) as Box<dyn SampleSink>, Some(queue))
        }
    };

    let ingest = IngestLoop::new(
        Box::new(GatewayInstrument::default()),
        sink,
        Arc::clone(&cursors),
        ReconnectSupervisor::new(
            "instrument",
            config.site.as_str(),
            config.reconnect_policy(),
            Arc::clone(&alerter),
        ),
        Arc::clone(&clock),
        ingest_cancel.clone(),
        IngestSettings::from_config(&config),
    );
    let ingest = spawn_worker(Box::new(ingest), ingest_cancel, events.clone())?;
    drop(events);

    let reason = exits.recv().unwrap_or(ExitReason::Requested);
    let coordinator = ShutdownCoordinator::new(
        config.site.as_str(),
        alerter,
        cursors,
        queue,
        config.shutdown_grace(),
    );
    Ok(coordinator.shutdown(&reason, Some(ingest), others))
}

fn setup_logging(log_path: &Path, debug: bool) {
    use tracing_subscriber::fmt::writer::MakeWriterExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(env::names::RUST_LOG).unwrap_or_else(|_| EnvFilter::new("info"));

    // Try to open log file, fall back to stderr
    match fs::OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(file) if debug => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file).and(std::io::stderr))
            .with_ansi(false)
            .init(),
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn acquire_lock(lock_path: &Path) -> Result<fs::File> {
    use fs2::FileExt;

    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(lock_path)?;
    file.try_lock_exclusive()
        .map_err(|_| Error::AlreadyRunning(lock_path.display().to_string()))?;
    Ok(file)
}

/// Forwards SIGINT/SIGTERM into the worker event channel.
fn install_stop_handler(events: Sender<ExitReason>) -> Result<()> {
    ctrlc::set_handler(move || {
        tracing::info!("stop requested");
        let _ = events.send(ExitReason::Requested);
    })?;
    Ok(())
}
