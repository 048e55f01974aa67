//! Numeric conversion utilities for derived telemetry metrics
//!
//! Pure helpers used by the metrics engine: great-circle distance,
//! orientation normalization, fix-quality classification, and the
//! firmware-aware wire-schema selection.

use semver::Version;

use crate::types::frame::SchemaVersion;
use crate::types::session::{FixQuality, Orientation};

/// Mean Earth radius in meters, as used by the haversine distance
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Time delta below which the backward finite difference is not computed
pub const VELOCITY_DT_EPSILON: f64 = 1e-6;

/// Great-circle distance in meters between two (lat, lon) points in degrees
pub fn haversine_m(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Normalize a quaternion to unit length.
///
/// The all-zero (degenerate) input maps to the identity quaternion so a
/// corrupt packet can never produce a NaN orientation downstream.
pub fn normalize_quaternion(w: f64, x: f64, y: f64, z: f64) -> Orientation {
    let norm = (w * w + x * x + y * y + z * z).sqrt();
    if norm <= 1e-8 {
        return Orientation::Quaternion {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        };
    }
    Orientation::Quaternion {
        w: w / norm,
        x: x / norm,
        y: y / norm,
        z: z / norm,
    }
}

/// Convert wire Euler angles (degrees) to the radians handed to the
/// presentation layer
pub fn euler_deg_to_rad(roll: f64, pitch: f64, yaw: f64) -> Orientation {
    Orientation::EulerRad {
        roll: roll.to_radians(),
        pitch: pitch.to_radians(),
        yaw: yaw.to_radians(),
    }
}

/// Classify an HDOP value into the presentation bucket
pub fn fix_quality_for_hdop(hdop: f64) -> FixQuality {
    if hdop <= 1.0 {
        FixQuality::Good
    } else if hdop <= 2.5 {
        FixQuality::Fair
    } else if hdop <= 5.0 {
        FixQuality::Marginal
    } else {
        FixQuality::Poor
    }
}

/// Backward finite difference between the two newest series samples.
///
/// Returns `None` when fewer than two samples exist or the time delta is
/// within [`VELOCITY_DT_EPSILON`] (duplicate timestamps), so the caller
/// retains the previously displayed value instead of dividing by zero.
pub fn backward_velocity(series: &[(f64, f64)]) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }
    let (t1, alt1) = series[series.len() - 1];
    let (t0, alt0) = series[series.len() - 2];
    let dt = t1 - t0;
    if dt.abs() <= VELOCITY_DT_EPSILON {
        return None;
    }
    Some((alt1 - alt0) / dt)
}

/// Select the wire schema for a flight-computer firmware revision string.
///
/// Firmware 2.x and newer streams the 18-column Euler layout; everything
/// older (or unparsable) is assumed to be the original 16-column
/// quaternion layout. This is a configuration-time helper only; the
/// operator-supplied setting stays authoritative and nothing is ever
/// auto-detected from the stream.
pub fn schema_for_firmware(firmware_revision: &str) -> SchemaVersion {
    match extract_firmware_version(firmware_revision) {
        Some(version) if version >= Version::new(2, 0, 0) => SchemaVersion::Euler18,
        _ => SchemaVersion::Quat16,
    }
}

/// Extract a semantic version from a firmware revision string such as
/// `"URD-FC 2.1.0 (a3f9c21)"`
pub fn extract_firmware_version(firmware_revision: &str) -> Option<Version> {
    firmware_revision
        .split_whitespace()
        .find_map(|word| Version::parse(word).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_one_degree_longitude_at_equator() {
        let d = haversine_m((0.0, 0.0), (0.0, 1.0));
        // One degree of longitude at the equator, R = 6371 km
        assert!((d - 111_195.0).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_haversine_zero_distance() {
        assert_eq!(haversine_m((-23.55, -46.63), (-23.55, -46.63)), 0.0);
    }

    #[test]
    fn test_normalize_quaternion_unit_norm() {
        let q = normalize_quaternion(1.0, 2.0, 3.0, 4.0);
        if let Orientation::Quaternion { w, x, y, z } = q {
            let norm = (w * w + x * x + y * y + z * z).sqrt();
            assert!((norm - 1.0).abs() < 1e-12);
        } else {
            panic!("expected quaternion");
        }
    }

    #[test]
    fn test_normalize_quaternion_zero_input_is_identity() {
        let q = normalize_quaternion(0.0, 0.0, 0.0, 0.0);
        assert_eq!(
            q,
            Orientation::Quaternion {
                w: 1.0,
                x: 0.0,
                y: 0.0,
                z: 0.0
            }
        );
    }

    #[test]
    fn test_euler_conversion() {
        let o = euler_deg_to_rad(180.0, 90.0, -90.0);
        if let Orientation::EulerRad { roll, pitch, yaw } = o {
            assert!((roll - std::f64::consts::PI).abs() < 1e-12);
            assert!((pitch - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
            assert!((yaw + std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        } else {
            panic!("expected euler");
        }
    }

    #[test]
    fn test_fix_quality_buckets() {
        assert_eq!(fix_quality_for_hdop(0.8), FixQuality::Good);
        assert_eq!(fix_quality_for_hdop(1.0), FixQuality::Good);
        assert_eq!(fix_quality_for_hdop(2.5), FixQuality::Fair);
        assert_eq!(fix_quality_for_hdop(5.0), FixQuality::Marginal);
        assert_eq!(fix_quality_for_hdop(5.01), FixQuality::Poor);
    }

    #[test]
    fn test_backward_velocity_needs_two_samples() {
        assert_eq!(backward_velocity(&[]), None);
        assert_eq!(backward_velocity(&[(0.0, 10.0)]), None);
    }

    #[test]
    fn test_backward_velocity_duplicate_timestamp() {
        assert_eq!(backward_velocity(&[(1.0, 10.0), (1.0, 20.0)]), None);
    }

    #[test]
    fn test_backward_velocity_finite_difference() {
        let v = backward_velocity(&[(1.0, 10.0), (3.0, 50.0)]).unwrap();
        assert!((v - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_schema_for_firmware() {
        assert_eq!(
            schema_for_firmware("URD-FC 2.1.0 (a3f9c21)"),
            SchemaVersion::Euler18
        );
        assert_eq!(schema_for_firmware("URD-FC 1.4.2"), SchemaVersion::Quat16);
        assert_eq!(schema_for_firmware("garbage"), SchemaVersion::Quat16);
    }
}
