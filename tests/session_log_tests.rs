//! Session log round trip: frames written by the session logger are
//! read back by the post-flight analysis with absence preserved.

use std::collections::HashMap;

use groundlink::analysis::analyze_session_log;
use groundlink::{FrameSchema, SchemaVersion, SessionLogger, TelemetryFrame};

fn frame(seq: u64, fields: &[(&str, f64)]) -> TelemetryFrame {
    let mut map = HashMap::new();
    for (name, value) in fields {
        map.insert(name.to_string(), *value);
    }
    TelemetryFrame { seq, fields: map }
}

#[test]
fn test_logged_flight_round_trips_through_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flight.txt");
    let schema = FrameSchema::new(SchemaVersion::Euler18);
    let mut logger = SessionLogger::create(&path, &schema).unwrap();

    // Boost, apogee at t=10 s / 400 m with drogue fire, main at t=40 s,
    // landing near t=60 s
    let mut seq = 0;
    for i in 0..=10 {
        let t = i as f64;
        logger
            .append(&frame(seq, &[("t", t), ("alt", 4.0 * t * t)]))
            .unwrap();
        seq += 1;
    }
    logger
        .append(&frame(seq, &[("t", 10.5), ("alt", 399.0), ("p_drogue_nose", 399.0)]))
        .unwrap();
    seq += 1;
    for i in 1..=30 {
        let t = 10.5 + i as f64;
        let alt = 399.0 - 10.0 * i as f64;
        let mut fields = vec![("t", t), ("alt", alt)];
        if t >= 40.0 {
            fields.push(("p_main_nose", alt));
        }
        logger.append(&frame(seq, &fields)).unwrap();
        seq += 1;
    }
    // Row with absent altitude must be skipped, not read as zero
    logger.append(&frame(seq, &[("t", 40.1)])).unwrap();
    seq += 1;
    logger
        .append(&frame(seq, &[("t", 58.0), ("alt", 2.0)]))
        .unwrap();
    seq += 1;
    logger
        .append(&frame(seq, &[("t", 60.0), ("alt", 1.0)]))
        .unwrap();

    let summary = analyze_session_log(&path).unwrap();
    assert_eq!(summary.apogee_m, 400.0);
    assert_eq!(summary.apogee_time_s, 10.0);
    assert_eq!(summary.drogue_deploy_time_s, Some(10.5));
    assert_eq!(summary.main_deploy_time_s, Some(40.5));
    assert_eq!(summary.landing_time_s, Some(60.0));
    assert!(summary.flight_time_s.unwrap() > 50.0);
    assert!(summary.drogue_descent_s.unwrap() > 29.0);
}

#[test]
fn test_sentinel_cells_survive_in_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.txt");
    let schema = FrameSchema::new(SchemaVersion::Quat16);
    let mut logger = SessionLogger::create(&path, &schema).unwrap();

    logger
        .append(&frame(1, &[("t", 0.5), ("alt", 12.0)]))
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0].split('\t').count(), 1 + schema.field_count());
    let cells: Vec<&str> = lines[1].split('\t').collect();
    // lat and lon were never reported: sentinel, not zero
    assert_eq!(cells[2], "~");
    assert_eq!(cells[3], "~");
}

#[test]
fn test_analysis_of_empty_log_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.txt");
    let schema = FrameSchema::new(SchemaVersion::Euler18);
    SessionLogger::create(&path, &schema).unwrap();
    assert!(analyze_session_log(&path).is_err());
}
