//! Wire protocol constants
//!
//! Control tokens written by the ground station and reply tokens expected
//! from the flight computer. Each token is sent as one newline-terminated
//! ASCII line in a single write.

/// Wire sentinel for "field intentionally not reported this cycle"
pub const SENTINEL: &str = "~";

/// Request a remote reboot; also sent best-effort on disconnect
pub const TOKEN_RESET: &str = "RST";
/// Announce the ground station after the post-reset quiescence
pub const TOKEN_READY: &str = "READY";
/// Request the bootstrap GPS coordinates of the launch site
pub const TOKEN_GPS_COORDS: &str = "GPS_COORDS";

/// Arm the igniter (static-test console)
pub const TOKEN_ARMED: &str = "ARMED!";
/// Disarm after the safety timeout (static-test console)
pub const TOKEN_DISARMED: &str = "DISARMED!";
/// Fire the igniter (static-test console)
pub const TOKEN_IGNITION: &str = "IGN!";
/// Igniter continuity check request (static-test console)
pub const TOKEN_PING: &str = "PING!";

/// Ready acknowledgment from the remote
pub const REPLY_OK: &str = "OK";
/// GPS subsystem ready; a fix line (or the no-fix sentinel pair) follows
pub const REPLY_GPS_OK: &str = "GPS_OK";
/// Continuity check reply: no continuity
pub const REPLY_PONG_OPEN: &str = "PONG0";
/// Continuity check reply: continuity present
pub const REPLY_PONG_CONTINUITY: &str = "PONG1";
