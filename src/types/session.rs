#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::link::handshake::LinkPhase;

/// GPS fix-quality bucket derived from HDOP. Used only for presentation
/// coloring, never to gate data acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FixQuality {
    Good,
    Fair,
    Marginal,
    Poor,
}

/// Normalized vehicle orientation handed to the presentation layer:
/// a unit quaternion, or Euler angles already converted to radians.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Orientation {
    Quaternion { w: f64, x: f64, y: f64, z: f64 },
    EulerRad { roll: f64, pitch: f64, yaw: f64 },
}

/// One of the four recovery channels (drogue-nose, drogue-body,
/// main-nose, main-body). Deployment is latched: once a channel reports
/// a non-zero height it stays deployed even if later frames omit the
/// field (omission is not closure).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParachuteChannel {
    pub deployed: bool,
    pub height_m: Option<f64>,
}

/// Long-lived per-link aggregate state. Mutated only by the derived
/// metrics engine; reset only by an explicit operator action, never by a
/// failed parse or a transport fault.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionState {
    /// Append-only (mission time, altitude) series
    pub series: Vec<(f64, f64)>,
    /// Last displayed vertical velocity in m/s
    pub velocity: Option<f64>,
    /// Running maximum altitude; monotonically non-decreasing
    pub max_altitude: Option<f64>,
    pub last_position: Option<(f64, f64)>,
    pub base_position: Option<(f64, f64)>,
    pub parachutes: [ParachuteChannel; 4],
    pub orientation: Option<Orientation>,
    pub fix_quality: Option<FixQuality>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distance from the last known position to the configured base, or
    /// `None` while either endpoint is missing. Never a stale number.
    pub fn distance_to_base_m(&self) -> Option<f64> {
        let base = self.base_position?;
        let here = self.last_position?;
        Some(crate::conversion::haversine_m(base, here))
    }

    pub fn sample_count(&self) -> usize {
        self.series.len()
    }
}

/// Presentation events emitted by the derived metrics engine for one
/// accepted frame, in derivation order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TelemetryEvent {
    /// A (time, altitude) sample was appended to the series
    Sample { t: f64, altitude: f64 },
    /// Vertical velocity updated from the backward finite difference
    Velocity(f64),
    /// Running maximum altitude increased
    MaxAltitude(f64),
    /// Last known position updated
    Position { lat: f64, lon: f64 },
    /// Distance to base recomputed; `None` means explicitly unknown
    DistanceToBase(Option<f64>),
    /// A recovery channel transitioned to deployed
    ParachuteDeployed { channel: usize, height_m: f64 },
    /// Fix-quality bucket for this frame's HDOP
    FixQuality(FixQuality),
    /// Normalized orientation for the 3D view
    Orientation(Orientation),
}

/// Interface implemented by presentation-layer consumers (map, plots,
/// 3D view, terminal). The core calls through this unconditionally;
/// consumers read the data they are handed and never mutate core state.
pub trait TelemetrySink {
    /// Handshake phase transitions
    fn on_phase(&mut self, _phase: LinkPhase) {}
    /// A line that is not a telemetry packet, shown verbatim in the
    /// diagnostic terminal
    fn on_raw_line(&mut self, _line: &str) {}
    /// An accepted frame together with its derived events
    fn on_frame(&mut self, _frame: &crate::TelemetryFrame, _events: &[TelemetryEvent]) {}
    /// Base location established (GPS bootstrap or operator entry)
    fn on_base_location(&mut self, _lat: f64, _lon: f64) {}
    /// The link faulted and was torn down
    fn on_fault(&mut self, _cause: &str) {}
    /// The explicit network-status value changed
    fn on_net_changed(&mut self, _online: bool) {}
}
