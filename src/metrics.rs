//! Derived metrics engine
//!
//! Folds decoded [`TelemetryFrame`]s into the long-lived [`SessionState`]
//! and emits the presentation events the UI consumes. All side effects
//! are confined to the state and the returned events; this module never
//! touches the transport.

use crate::conversion::{
    backward_velocity, euler_deg_to_rad, fix_quality_for_hdop, normalize_quaternion,
};
use crate::types::frame::{
    FrameSchema, TelemetryFrame, F_HDOP, F_PARACHUTES, F_PITCH, F_QW, F_QX, F_QY, F_QZ, F_ROLL,
    F_YAW,
};
use crate::types::session::{SessionState, TelemetryEvent};

/// Apply one accepted frame to the session state.
///
/// Absent fields leave their corresponding state untouched: the series
/// only grows when both time and altitude arrived, the running maximum
/// never decreases, and a parachute channel once deployed stays deployed
/// even when later frames omit its field.
pub fn apply_frame(
    state: &mut SessionState,
    frame: &TelemetryFrame,
    schema: &FrameSchema,
) -> Vec<TelemetryEvent> {
    let mut events = Vec::new();

    if let Some((t, altitude)) = frame.time_and_altitude() {
        state.series.push((t, altitude));
        events.push(TelemetryEvent::Sample { t, altitude });

        if let Some(velocity) = backward_velocity(&state.series) {
            state.velocity = Some(velocity);
            events.push(TelemetryEvent::Velocity(velocity));
        }

        if state.max_altitude.map_or(true, |max| altitude > max) {
            state.max_altitude = Some(altitude);
            events.push(TelemetryEvent::MaxAltitude(altitude));
        }
    }

    for (channel, field) in F_PARACHUTES.iter().enumerate() {
        if let Some(height_m) = frame.get(field) {
            state.parachutes[channel].height_m = Some(height_m);
            // Non-zero height means the channel fired; zero means "armed,
            // not deployed" and must not latch
            if height_m != 0.0 && !state.parachutes[channel].deployed {
                state.parachutes[channel].deployed = true;
                events.push(TelemetryEvent::ParachuteDeployed { channel, height_m });
            }
        }
    }

    if let Some((lat, lon)) = frame.position() {
        state.last_position = Some((lat, lon));
        events.push(TelemetryEvent::Position { lat, lon });
        events.push(TelemetryEvent::DistanceToBase(state.distance_to_base_m()));
    }

    if let Some(hdop) = frame.get(F_HDOP) {
        let quality = fix_quality_for_hdop(hdop);
        state.fix_quality = Some(quality);
        events.push(TelemetryEvent::FixQuality(quality));
    }

    if let Some(orientation) = extract_orientation(frame, schema) {
        state.orientation = Some(orientation);
        events.push(TelemetryEvent::Orientation(orientation));
    }

    events
}

/// Read the schema's orientation fields, normalized for presentation.
/// Requires the full component set; a partially reported orientation is
/// treated as absent.
fn extract_orientation(
    frame: &TelemetryFrame,
    schema: &FrameSchema,
) -> Option<crate::types::session::Orientation> {
    if schema.is_quaternion() {
        let w = frame.get(F_QW)?;
        let x = frame.get(F_QX)?;
        let y = frame.get(F_QY)?;
        let z = frame.get(F_QZ)?;
        Some(normalize_quaternion(w, x, y, z))
    } else {
        let roll = frame.get(F_ROLL)?;
        let pitch = frame.get(F_PITCH)?;
        let yaw = frame.get(F_YAW)?;
        Some(euler_deg_to_rad(roll, pitch, yaw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::packet::decode_packet;
    use crate::types::frame::SchemaVersion;
    use crate::types::session::Orientation;

    fn quat_schema() -> FrameSchema {
        FrameSchema::new(SchemaVersion::Quat16)
    }

    fn frame_with(fields: &[(&str, f64)]) -> TelemetryFrame {
        let mut frame = TelemetryFrame::new(0);
        for (name, value) in fields {
            frame.fields.insert(name.to_string(), *value);
        }
        frame
    }

    #[test]
    fn test_series_grows_only_with_time_and_altitude() {
        let mut state = SessionState::new();
        apply_frame(&mut state, &frame_with(&[("t", 1.0)]), &quat_schema());
        apply_frame(&mut state, &frame_with(&[("alt", 10.0)]), &quat_schema());
        assert_eq!(state.sample_count(), 0);

        apply_frame(
            &mut state,
            &frame_with(&[("t", 1.0), ("alt", 10.0)]),
            &quat_schema(),
        );
        assert_eq!(state.series, vec![(1.0, 10.0)]);
    }

    #[test]
    fn test_velocity_retained_on_duplicate_timestamp() {
        let mut state = SessionState::new();
        apply_frame(
            &mut state,
            &frame_with(&[("t", 1.0), ("alt", 10.0)]),
            &quat_schema(),
        );
        assert_eq!(state.velocity, None);

        apply_frame(
            &mut state,
            &frame_with(&[("t", 2.0), ("alt", 30.0)]),
            &quat_schema(),
        );
        assert_eq!(state.velocity, Some(20.0));

        // Duplicate timestamp: previous displayed value survives
        let events = apply_frame(
            &mut state,
            &frame_with(&[("t", 2.0), ("alt", 35.0)]),
            &quat_schema(),
        );
        assert_eq!(state.velocity, Some(20.0));
        assert!(!events
            .iter()
            .any(|e| matches!(e, TelemetryEvent::Velocity(_))));
    }

    #[test]
    fn test_max_altitude_monotone_across_absent_frames() {
        let mut state = SessionState::new();
        apply_frame(
            &mut state,
            &frame_with(&[("t", 1.0), ("alt", 100.0)]),
            &quat_schema(),
        );
        apply_frame(&mut state, &frame_with(&[("t", 2.0)]), &quat_schema());
        apply_frame(
            &mut state,
            &frame_with(&[("t", 3.0), ("alt", 40.0)]),
            &quat_schema(),
        );
        assert_eq!(state.max_altitude, Some(100.0));
    }

    #[test]
    fn test_parachute_latch_survives_omission() {
        let mut state = SessionState::new();
        let events = apply_frame(
            &mut state,
            &frame_with(&[("p_main_nose", 350.0)]),
            &quat_schema(),
        );
        assert!(state.parachutes[2].deployed);
        assert_eq!(
            events,
            vec![TelemetryEvent::ParachuteDeployed {
                channel: 2,
                height_m: 350.0
            }]
        );

        // Omission is not closure
        apply_frame(&mut state, &frame_with(&[("t", 9.0)]), &quat_schema());
        assert!(state.parachutes[2].deployed);
    }

    #[test]
    fn test_parachute_zero_height_is_not_deployed() {
        let mut state = SessionState::new();
        apply_frame(
            &mut state,
            &frame_with(&[("p_drogue_nose", 0.0)]),
            &quat_schema(),
        );
        assert!(!state.parachutes[0].deployed);
        assert_eq!(state.parachutes[0].height_m, Some(0.0));
    }

    #[test]
    fn test_distance_unknown_without_base() {
        let mut state = SessionState::new();
        let events = apply_frame(
            &mut state,
            &frame_with(&[("lat", 0.0), ("lon", 1.0)]),
            &quat_schema(),
        );
        assert!(events.contains(&TelemetryEvent::DistanceToBase(None)));
    }

    #[test]
    fn test_distance_with_base_matches_haversine() {
        let mut state = SessionState::new();
        state.base_position = Some((0.0, 0.0));
        let events = apply_frame(
            &mut state,
            &frame_with(&[("lat", 0.0), ("lon", 1.0)]),
            &quat_schema(),
        );
        let distance = events.iter().find_map(|e| match e {
            TelemetryEvent::DistanceToBase(d) => *d,
            _ => None,
        });
        assert!((distance.unwrap() - 111_195.0).abs() < 1.0);
    }

    #[test]
    fn test_orientation_normalized_from_wire_line() {
        let schema = quat_schema();
        let mut state = SessionState::new();
        // Quaternion (2, 0, 0, 0) on the wire normalizes to identity
        let line = "1:\t1.0\t~\t~\t10.0\t~\t~\t~\t~\t~\t~\t~\t~\t2\t0\t0\t0";
        let frame = decode_packet(line, &schema).unwrap();
        apply_frame(&mut state, &frame, &schema);
        assert_eq!(
            state.orientation,
            Some(Orientation::Quaternion {
                w: 1.0,
                x: 0.0,
                y: 0.0,
                z: 0.0
            })
        );
    }

    #[test]
    fn test_partial_orientation_is_absent() {
        let mut state = SessionState::new();
        apply_frame(
            &mut state,
            &frame_with(&[("qw", 1.0), ("qx", 0.0)]),
            &quat_schema(),
        );
        assert_eq!(state.orientation, None);
    }
}
