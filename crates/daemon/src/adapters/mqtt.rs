// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Message broker over MQTT.
//!
//! Uses the blocking `rumqttc` client with a persistent session
//! (`clean_session = false`). The connection's event loop runs on its own
//! thread and forwards the events a publisher waits on: the CONNACK, the
//! packet id assigned to an outgoing publish, and its final acknowledgement
//! (PUBCOMP for exactly-once). A publish returns only after that
//! acknowledgement, so the delivery worker can remove the message from its
//! queue.

use std::fs;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use fl_core::{BrokerClient, FailureKind, LinkError, LinkResult, MessageBroker, QoS};
use rumqttc::{Client, ConnectionError, Event, MqttOptions, Outgoing, Packet};

/// Port used when the broker URI has none.
pub const DEFAULT_PORT: u16 = 1883;

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const REQUEST_CAPACITY: usize = 16;

/// Splits `tcp://host:port` (or `mqtt://`) into host and port.
pub fn parse_broker_uri(uri: &str) -> Result<(String, u16), String> {
    let rest = uri
        .strip_prefix("tcp://")
        .or_else(|| uri.strip_prefix("mqtt://"))
        .ok_or_else(|| format!("unsupported scheme in {uri:?}, expected tcp:// or mqtt://"))?;
    let rest = rest.trim_end_matches('/');
    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| format!("invalid port {port:?} in {uri:?}"))?;
            (host, port)
        }
        None => (rest, DEFAULT_PORT),
    };
    if host.is_empty() {
        return Err(format!("missing host in {uri:?}"));
    }
    Ok((host.to_string(), port))
}

fn mqtt_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

fn connection_error(e: ConnectionError) -> LinkError {
    match e {
        ConnectionError::Io(io) => LinkError::from(io),
        ConnectionError::ConnectionRefused(code) => {
            LinkError::new(FailureKind::ConnectionRefused, format!("broker refused connection: {code:?}"))
        }
        other => LinkError::new(FailureKind::ConnectionReset, other.to_string()),
    }
}

/// What the event thread reports to the client.
#[derive(Debug)]
enum Notice {
    Connected,
    /// An outgoing publish was assigned this packet id.
    Sent(u16),
    /// The final acknowledgement for this packet id arrived.
    Acked(u16),
    Failed(LinkError),
}

fn pump_events(mut connection: rumqttc::Connection, notices: Sender<Notice>) {
    for event in connection.iter() {
        let notice = match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => Notice::Connected,
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => Notice::Sent(pkid),
            Ok(Event::Incoming(Packet::PubAck(ack))) => Notice::Acked(ack.pkid),
            Ok(Event::Incoming(Packet::PubComp(comp))) => Notice::Acked(comp.pkid),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => continue,
            Err(e) => {
                let _ = notices.send(Notice::Failed(connection_error(e)));
                break;
            }
        };
        if notices.send(notice).is_err() {
            break;
        }
    }
    tracing::debug!("mqtt event loop ended");
}

/// [`MessageBroker`] backed by `rumqttc`.
#[derive(Debug, Clone)]
pub struct MqttBroker {
    /// How long to wait for CONNACK and for each publish acknowledgement.
    ack_timeout: Duration,
}

impl Default for MqttBroker {
    fn default() -> Self {
        MqttBroker {
            ack_timeout: super::IO_TIMEOUT,
        }
    }
}

impl MqttBroker {
    pub fn new(ack_timeout: Duration) -> Self {
        MqttBroker { ack_timeout }
    }
}

impl MessageBroker for MqttBroker {
    fn connect(
        &self,
        broker_uri: &str,
        client_id: &str,
        persistence_dir: &Path,
    ) -> LinkResult<Box<dyn BrokerClient>> {
        let (host, port) = parse_broker_uri(broker_uri).map_err(LinkError::protocol)?;
        fs::create_dir_all(persistence_dir)?;

        let mut options = MqttOptions::new(client_id, host, port);
        options.set_clean_session(false);
        options.set_keep_alive(KEEP_ALIVE);
        let (client, connection) = Client::new(options, REQUEST_CAPACITY);

        let (tx, notices) = mpsc::channel();
        thread::Builder::new()
            .name("mqtt-events".to_string())
            .spawn(move || pump_events(connection, tx))?;

        let mut client = MqttClient {
            client,
            notices,
            broken: false,
            ack_timeout: self.ack_timeout,
        };
        match client.notices.recv_timeout(self.ack_timeout) {
            Ok(Notice::Connected) => {
                tracing::info!(%broker_uri, %client_id, "connected to message broker");
                Ok(Box::new(client))
            }
            Ok(Notice::Failed(e)) => Err(e),
            Ok(other) => Err(LinkError::protocol(format!("expected CONNACK, got {other:?}"))),
            Err(_) => {
                client.disconnect();
                Err(LinkError::new(
                    FailureKind::ConnectionRefused,
                    format!("no CONNACK from {broker_uri} within {}s", self.ack_timeout.as_secs()),
                ))
            }
        }
    }
}

struct MqttClient {
    client: Client,
    notices: Receiver<Notice>,
    broken: bool,
    ack_timeout: Duration,
}

impl MqttClient {
    fn fail(&mut self, e: LinkError) -> LinkError {
        self.broken = true;
        e
    }

    /// Waits for the acknowledgement of the publish just queued.
    fn await_ack(&mut self, qos: QoS) -> LinkResult<()> {
        let deadline = Instant::now() + self.ack_timeout;
        let mut pkid: Option<u16> = None;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.notices.recv_timeout(remaining) {
                Ok(Notice::Sent(id)) if pkid.is_none() => {
                    if qos == QoS::AtMostOnce {
                        return Ok(());
                    }
                    pkid = Some(id);
                }
                Ok(Notice::Acked(id)) if pkid == Some(id) => return Ok(()),
                Ok(Notice::Failed(e)) => return Err(self.fail(e)),
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => {
                    return Err(self.fail(LinkError::new(
                        FailureKind::ConnectionReset,
                        format!("no acknowledgement within {}s", self.ack_timeout.as_secs()),
                    )))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(self.fail(LinkError::new(
                        FailureKind::ConnectionReset,
                        "broker connection closed",
                    )))
                }
            }
        }
    }
}

impl BrokerClient for MqttClient {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> LinkResult<()> {
        if self.broken {
            return Err(LinkError::not_connected("publish requires a connection"));
        }
        if let Err(e) = self.client.publish(topic, mqtt_qos(qos), false, payload.to_vec()) {
            return Err(self.fail(LinkError::new(FailureKind::ConnectionReset, e.to_string())));
        }
        self.await_ack(qos)
    }

    fn is_connected(&self) -> bool {
        !self.broken
    }

    fn disconnect(&mut self) {
        self.broken = true;
        if let Err(e) = self.client.disconnect() {
            tracing::debug!(error = %e, "mqtt disconnect request failed");
        }
    }
}

#[cfg(test)]
#[path = "mqtt_tests.rs"]
mod tests;
