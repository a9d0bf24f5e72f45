//! Tests for envelope payload decoding

use super::*;
use crate::error::DecodeError;

#[test]
fn test_message_type_names() {
    assert_eq!(MessageType::Metrics.as_str(), "metrics");
    assert_eq!(MessageType::LogList.as_str(), "log_list");
    assert_eq!(MessageType::LogData.as_str(), "log_data");
}

#[test]
fn test_metrics_envelope() {
    let json = r#"{
        "type": "metrics",
        "payload": {
            "timestamp": "2024-06-01T12:00:00Z",
            "packets": [{
                "timestamp": "2024-06-01T12:00:00Z",
                "protocol": "TCP",
                "src_ip": "10.0.0.1",
                "dst_ip": "10.0.0.2",
                "src_port": 443,
                "dst_port": 51234,
                "length": 1500,
                "payload_size": 1448,
                "tcp_flags": "ACK"
            }]
        }
    }"#;

    let envelope: Envelope = serde_json::from_str(json).unwrap();
    assert_eq!(envelope.kind, MessageType::Metrics);

    let metrics = envelope.metrics().unwrap();
    assert_eq!(metrics.packets.len(), 1);
    assert_eq!(metrics.packets[0].protocol, "TCP");
    assert_eq!(metrics.packets[0].tcp_flags, "ACK");
}

#[test]
fn test_log_list_envelope() {
    let json = r#"{
        "type": "log_list",
        "payload": [{
            "path": "/var/log",
            "parent_path": "/var",
            "name": "log",
            "is_directory": true,
            "size": 0,
            "mod_time": "2024-06-01T12:00:00Z"
        }]
    }"#;

    let envelope: Envelope = serde_json::from_str(json).unwrap();
    assert_eq!(envelope.kind, MessageType::LogList);

    let files = envelope.file_list().unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].is_directory);
}

#[test]
fn test_log_data_envelope() {
    let json = r#"{
        "type": "log_data",
        "payload": [{
            "filename": "/var/log/app.log",
            "line": "started",
            "line_num": 1,
            "timestamp": "2024-06-01T12:00:00Z",
            "level": "info"
        }]
    }"#;

    let envelope: Envelope = serde_json::from_str(json).unwrap();
    let entries = envelope.log_entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].line, "started");
}

#[test]
fn test_unknown_type_rejected() {
    let json = r#"{"type": "log_search", "payload": {}}"#;
    assert!(serde_json::from_str::<Envelope>(json).is_err());
}

#[test]
fn test_payload_shape_mismatch() {
    // metrics payload where a file list is expected
    let json = r#"{"type": "log_list", "payload": {"timestamp": "2024-06-01T12:00:00Z"}}"#;
    let envelope: Envelope = serde_json::from_str(json).unwrap();

    let err = envelope.file_list().unwrap_err();
    match err {
        DecodeError::Payload { kind, .. } => assert_eq!(kind, "log_list"),
        other => panic!("unexpected error: {other}"),
    }
}
