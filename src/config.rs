//! Configuration surface
//!
//! Plain values injected by the surrounding configuration/CLI layer.
//! The core never reads the environment or a config file itself.

use std::time::Duration;

use crate::types::frame::SchemaVersion;

/// Telemetry link configuration, one per connect attempt.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Fixed link baud rate
    pub baud: u32,
    /// Bounded transport read timeout; the only blocking operation
    pub read_timeout: Duration,
    /// Quiescence after sending the reset token, letting the remote reboot
    pub reset_quiescence: Duration,
    /// Deadline for the ready acknowledgment. `None` reproduces the
    /// historical unbounded wait.
    pub ok_timeout: Option<Duration>,
    /// Bounded GPS fix-acquisition window; expiry degrades to "no fix"
    pub fix_timeout: Duration,
    /// Wire layout streamed by the connected flight computer
    pub schema: SchemaVersion,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud: 115_200,
            read_timeout: Duration::from_millis(200),
            reset_quiescence: Duration::from_secs(1),
            ok_timeout: Some(Duration::from_secs(15)),
            fix_timeout: Duration::from_secs(15),
            schema: SchemaVersion::Euler18,
        }
    }
}

/// Static-test console arming configuration.
#[derive(Debug, Clone)]
pub struct ArmingConfig {
    /// Shared secret gating the disarmed-to-armed transition, compared
    /// as an opaque string
    pub secret: String,
    /// How long the machine stays armed without a fire intent
    pub arm_timeout: Duration,
    /// How long after firing the machine resets to disarmed
    pub fire_reset: Duration,
    /// Blink indicator period while armed
    pub blink_period: Duration,
}

impl Default for ArmingConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            arm_timeout: Duration::from_secs(4),
            fire_reset: Duration::from_secs(5),
            blink_period: Duration::from_millis(500),
        }
    }
}
