// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    tcp_with_port = { "tcp://broker.local:1884", "broker.local", 1884 },
    tcp_default_port = { "tcp://localhost", "localhost", 1883 },
    mqtt_scheme = { "mqtt://10.0.0.2:1883", "10.0.0.2", 1883 },
    trailing_slash = { "tcp://localhost:1883/", "localhost", 1883 },
)]
fn broker_uri_is_split(uri: &str, host: &str, port: u16) {
    assert_eq!(parse_broker_uri(uri).unwrap(), (host.to_string(), port));
}

#[parameterized(
    no_scheme = { "localhost:1883" },
    tls = { "ssl://localhost:8883" },
    empty_host = { "tcp://:1883" },
    bad_port = { "tcp://localhost:99999" },
)]
fn bad_broker_uri_is_rejected(uri: &str) {
    assert!(parse_broker_uri(uri).is_err());
}

#[test]
fn qos_levels_map_one_to_one() {
    assert_eq!(mqtt_qos(QoS::AtMostOnce), rumqttc::QoS::AtMostOnce);
    assert_eq!(mqtt_qos(QoS::AtLeastOnce), rumqttc::QoS::AtLeastOnce);
    assert_eq!(mqtt_qos(QoS::ExactlyOnce), rumqttc::QoS::ExactlyOnce);
}

#[test]
fn io_failures_keep_their_classification() {
    let refused = connection_error(ConnectionError::Io(std::io::Error::from(
        std::io::ErrorKind::ConnectionRefused,
    )));
    assert_eq!(refused.kind, FailureKind::ConnectionRefused);

    let timeout = connection_error(ConnectionError::NetworkTimeout);
    assert_eq!(timeout.kind, FailureKind::ConnectionReset);
}

#[test]
fn unreachable_broker_fails_to_connect() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let dir = tempfile::tempdir().unwrap();
    let persistence = dir.path().join("mqtt");

    let result = MqttBroker::new(Duration::from_secs(5)).connect(
        &format!("tcp://127.0.0.1:{port}"),
        "sitea/data_publisher/cr1000",
        &persistence,
    );

    assert!(result.is_err());
    assert!(persistence.is_dir());
}
