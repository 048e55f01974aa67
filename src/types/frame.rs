use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Canonical field names shared by both wire layouts
pub const F_TIME: &str = "t";
pub const F_LAT: &str = "lat";
pub const F_LON: &str = "lon";
pub const F_UTC_HOUR: &str = "utc_h";
pub const F_UTC_MIN: &str = "utc_min";
pub const F_HDOP: &str = "hdop";
pub const F_ALT: &str = "alt";
pub const F_STORAGE_OK: &str = "storage_ok";
pub const F_APOGEE_ALT: &str = "apogee_alt";
pub const F_APOGEE_TIME: &str = "apogee_t";
pub const F_TEMP: &str = "temp";
pub const F_QW: &str = "qw";
pub const F_QX: &str = "qx";
pub const F_QY: &str = "qy";
pub const F_QZ: &str = "qz";
pub const F_ROLL: &str = "roll";
pub const F_PITCH: &str = "pitch";
pub const F_YAW: &str = "yaw";

/// Parachute deployment-altitude fields, in channel order:
/// drogue-nose, drogue-body, main-nose, main-body.
pub const F_PARACHUTES: [&str; 4] = [
    "p_drogue_nose",
    "p_drogue_body",
    "p_main_nose",
    "p_main_body",
];

const QUAT16_FIELDS: [&str; 16] = [
    F_TIME,
    F_LAT,
    F_LON,
    F_ALT,
    "p_drogue_nose",
    "p_drogue_body",
    "p_main_nose",
    "p_main_body",
    F_HDOP,
    F_APOGEE_ALT,
    F_APOGEE_TIME,
    F_TEMP,
    F_QW,
    F_QX,
    F_QY,
    F_QZ,
];

const EULER18_FIELDS: [&str; 18] = [
    F_TIME,
    F_LAT,
    F_LON,
    F_UTC_HOUR,
    F_UTC_MIN,
    F_HDOP,
    F_ALT,
    F_STORAGE_OK,
    F_APOGEE_ALT,
    F_APOGEE_TIME,
    "p_drogue_nose",
    "p_drogue_body",
    "p_main_nose",
    "p_main_body",
    F_TEMP,
    F_ROLL,
    F_PITCH,
    F_YAW,
];

/// Wire layout version. Two incompatible layouts exist in the field:
/// the older 16-column quaternion packets and the newer 18-column
/// Euler-angle packets. The version in use is a per-deployment
/// configuration choice, never detected from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SchemaVersion {
    /// 16 fields after the sequence token; orientation as a quaternion
    Quat16,
    /// 18 fields after the sequence token; orientation as Euler degrees
    Euler18,
}

/// Positional field layout for one wire version
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameSchema {
    pub version: SchemaVersion,
    pub field_names: Vec<String>,
}

impl FrameSchema {
    pub fn new(version: SchemaVersion) -> Self {
        let names: &[&str] = match version {
            SchemaVersion::Quat16 => &QUAT16_FIELDS,
            SchemaVersion::Euler18 => &EULER18_FIELDS,
        };
        Self {
            version,
            field_names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn field_count(&self) -> usize {
        self.field_names.len()
    }

    /// Whether this layout carries orientation as a quaternion
    pub fn is_quaternion(&self) -> bool {
        self.version == SchemaVersion::Quat16
    }
}

impl Default for FrameSchema {
    fn default() -> Self {
        Self::new(SchemaVersion::Euler18)
    }
}

/// One decoded telemetry packet.
///
/// Fields absent on the wire (the `~` sentinel or a malformed token) are
/// absent from the map. They are never zero-filled: 0.0 and "not
/// reported" mean different things (a parachute deployed at 0 m versus a
/// parachute that has not deployed).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TelemetryFrame {
    /// Sequence number from the framing token
    pub seq: u64,
    pub fields: HashMap<String, f64>,
}

impl TelemetryFrame {
    pub fn new(seq: u64) -> Self {
        Self {
            seq,
            fields: HashMap::new(),
        }
    }

    /// Value of a named field, `None` when not reported this cycle
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    /// Mission time and barometric altitude, when both were reported
    pub fn time_and_altitude(&self) -> Option<(f64, f64)> {
        Some((self.get(F_TIME)?, self.get(F_ALT)?))
    }

    /// Last known position, when both coordinates were reported
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.get(F_LAT)?, self.get(F_LON)?))
    }
}
