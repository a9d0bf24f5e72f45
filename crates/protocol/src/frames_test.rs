//! Tests for subscriber frames

use chrono::{TimeZone, Utc};

use super::*;

#[test]
fn test_view_file_frame() {
    let frame: ClientFrame =
        serde_json::from_str(r#"{"type":"view_file","payload":"/var/log/app.log"}"#).unwrap();
    assert_eq!(frame, ClientFrame::ViewFile("/var/log/app.log".into()));
}

#[test]
fn test_view_file_empty_disables() {
    let frame: ClientFrame = serde_json::from_str(r#"{"type":"view_file","payload":""}"#).unwrap();
    assert_eq!(frame, ClientFrame::ViewFile(String::new()));
}

#[test]
fn test_speed_control_frame() {
    let frame: ClientFrame =
        serde_json::from_str(r#"{"type":"speed_control","payload":0.5}"#).unwrap();
    assert_eq!(frame, ClientFrame::SpeedControl(0.5));
}

#[test]
fn test_unknown_frame_ignored() {
    let frame: ClientFrame =
        serde_json::from_str(r#"{"type":"pause_stream","payload":{"x":1}}"#).unwrap();
    assert_eq!(frame, ClientFrame::Unknown);
}

#[test]
fn test_log_frame_shape() {
    let entry = LogEntry {
        filename: "/a.log".into(),
        line: "boom".into(),
        line_num: 7,
        timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        level: "error".into(),
    };
    let json = serde_json::to_value(EventFrame::Log(&entry)).unwrap();
    assert_eq!(json["type"], "log");
    assert_eq!(json["payload"]["filename"], "/a.log");
}

#[test]
fn test_network_frame_shape() {
    let packets = vec![NetworkPacket {
        timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        protocol: "TCP".into(),
        src_ip: "10.0.0.1".into(),
        dst_ip: "10.0.0.2".into(),
        src_port: 80,
        dst_port: 50000,
        length: 60,
        payload_size: 0,
        tcp_flags: "SYN".into(),
    }];
    let json = serde_json::to_value(EventFrame::Network(&packets)).unwrap();
    assert_eq!(json["type"], "network");
    assert!(json["payload"].is_array());
    assert_eq!(json["payload"][0]["tcp_flags"], "SYN");
}

#[test]
fn test_file_update_frame_shape() {
    let node = FileNode {
        path: "/var/log/app.log".into(),
        parent_path: "/var/log".into(),
        name: "app.log".into(),
        is_directory: false,
        size: 10,
        mod_time: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        is_gzipped: false,
        is_scraped: true,
    };
    let json = serde_json::to_value(EventFrame::FileUpdate(&node)).unwrap();
    assert_eq!(json["type"], "file_update");
    assert_eq!(json["payload"]["path"], "/var/log/app.log");
}
