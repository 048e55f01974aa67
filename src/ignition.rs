//! Ignition arming state machine for the static-test console
//!
//! Cyclic `Disarmed -> Armed -> Firing -> Disarmed`, independent of the
//! telemetry handshake but sharing the transport when one is open. The
//! machine reacts only to operator intents and elapsed time; it never
//! inspects telemetry content. Every timer is a deadline checked against
//! a caller-supplied monotonic instant.
//!
//! Safety defaults: arming without a follow-up fire intent disarms
//! itself after a fixed timeout (sending `DISARMED!` exactly once), and
//! firing always returns to disarmed after the reset window.

use std::time::Instant;

use log::{debug, info};

use crate::config::ArmingConfig;
use crate::link::transport::Transport;
use crate::protocol::{
    REPLY_PONG_CONTINUITY, REPLY_PONG_OPEN, TOKEN_ARMED, TOKEN_DISARMED, TOKEN_IGNITION,
    TOKEN_PING,
};

/// Phase of the arming cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmingPhase {
    Disarmed,
    Armed,
    Firing,
}

/// Events for the static-test console UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmingEvent {
    Armed,
    /// Fire command issued
    Firing,
    /// Safety timeout elapsed while armed; `DISARMED!` was sent
    AutoDisarmed,
    /// Post-fire reset window elapsed; back to disarmed, no token
    ResetToDisarmed,
    /// Blink indicator toggled (on/off) while armed
    Blink(bool),
}

/// The arming state machine. Holds no transport; the caller passes one
/// in (when the console link is open and acknowledged) so a missing
/// transport degrades to local state transitions, matching the bench
/// workflow where the console is rehearsed unplugged.
pub struct ArmingStateMachine {
    config: ArmingConfig,
    phase: ArmingPhase,
    blink_on: bool,
    blink_deadline: Option<Instant>,
    disarm_deadline: Option<Instant>,
    reset_deadline: Option<Instant>,
}

impl ArmingStateMachine {
    pub fn new(config: ArmingConfig) -> Self {
        Self {
            config,
            phase: ArmingPhase::Disarmed,
            blink_on: false,
            blink_deadline: None,
            disarm_deadline: None,
            reset_deadline: None,
        }
    }

    pub fn phase(&self) -> ArmingPhase {
        self.phase
    }

    pub fn blink_on(&self) -> bool {
        self.blink_on
    }

    /// Operator intent (the ignition button).
    ///
    /// Disarmed: arms iff `secret` matches the configured secret as an
    /// opaque string; a wrong secret is silently rejected (no
    /// transition, no token, not an error). Armed: fires. Firing:
    /// ignored until the reset window returns the machine to disarmed.
    pub fn press(
        &mut self,
        secret: &str,
        transport: Option<&mut dyn Transport>,
        now: Instant,
    ) -> Vec<ArmingEvent> {
        match self.phase {
            ArmingPhase::Disarmed => {
                if secret != self.config.secret {
                    debug!("ignition: arm attempt with wrong secret rejected");
                    return Vec::new();
                }
                self.phase = ArmingPhase::Armed;
                self.blink_on = false;
                self.blink_deadline = Some(now + self.config.blink_period);
                self.disarm_deadline = Some(now + self.config.arm_timeout);
                self.send(transport, TOKEN_ARMED);
                info!("ignition: armed");
                vec![ArmingEvent::Armed]
            }
            ArmingPhase::Armed => {
                self.phase = ArmingPhase::Firing;
                self.blink_on = false;
                self.blink_deadline = None;
                self.disarm_deadline = None;
                self.reset_deadline = Some(now + self.config.fire_reset);
                self.send(transport, TOKEN_IGNITION);
                info!("ignition: fire command sent");
                vec![ArmingEvent::Firing]
            }
            ArmingPhase::Firing => Vec::new(),
        }
    }

    /// Advance the deadline timers. Call from the same poll loop that
    /// drives the console link.
    pub fn tick(
        &mut self,
        transport: Option<&mut dyn Transport>,
        now: Instant,
    ) -> Vec<ArmingEvent> {
        let mut events = Vec::new();
        match self.phase {
            ArmingPhase::Armed => {
                if self.disarm_deadline.is_some_and(|d| now >= d) {
                    // Safety default, not an error
                    self.reset(ArmingPhase::Disarmed);
                    self.send(transport, TOKEN_DISARMED);
                    info!("ignition: auto-disarmed");
                    events.push(ArmingEvent::AutoDisarmed);
                } else if self.blink_deadline.is_some_and(|d| now >= d) {
                    self.blink_on = !self.blink_on;
                    self.blink_deadline = Some(now + self.config.blink_period);
                    events.push(ArmingEvent::Blink(self.blink_on));
                }
            }
            ArmingPhase::Firing => {
                if self.reset_deadline.is_some_and(|d| now >= d) {
                    self.reset(ArmingPhase::Disarmed);
                    events.push(ArmingEvent::ResetToDisarmed);
                }
            }
            ArmingPhase::Disarmed => {}
        }
        events
    }

    /// Request an igniter continuity check.
    pub fn send_ping(&mut self, transport: &mut dyn Transport) -> std::io::Result<()> {
        transport.write_token(TOKEN_PING)
    }

    fn reset(&mut self, phase: ArmingPhase) {
        self.phase = phase;
        self.blink_on = false;
        self.blink_deadline = None;
        self.disarm_deadline = None;
        self.reset_deadline = None;
    }

    fn send(&mut self, transport: Option<&mut dyn Transport>, token: &str) {
        if let Some(transport) = transport {
            if let Err(e) = transport.write_token(token) {
                debug!("ignition: {} not sent: {}", token, e);
            }
        }
    }
}

/// Decode a continuity-check reply: `Some(true)` for continuity present,
/// `Some(false)` for an open circuit, `None` for any other line.
pub fn continuity_from_reply(line: &str) -> Option<bool> {
    match line.trim() {
        l if l == REPLY_PONG_CONTINUITY => Some(true),
        l if l == REPLY_PONG_OPEN => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<String>,
    }

    impl Transport for RecordingTransport {
        fn read_line(&mut self) -> io::Result<Option<String>> {
            Ok(None)
        }

        fn write_token(&mut self, token: &str) -> io::Result<()> {
            self.sent.push(token.to_string());
            Ok(())
        }
    }

    fn machine() -> ArmingStateMachine {
        ArmingStateMachine::new(ArmingConfig {
            secret: "urd123".to_string(),
            ..ArmingConfig::default()
        })
    }

    #[test]
    fn test_wrong_secret_is_silently_rejected() {
        let mut arming = machine();
        let mut transport = RecordingTransport::default();
        let events = arming.press("wrong", Some(&mut transport), Instant::now());
        assert!(events.is_empty());
        assert_eq!(arming.phase(), ArmingPhase::Disarmed);
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn test_arm_then_fire() {
        let mut arming = machine();
        let mut transport = RecordingTransport::default();
        let t0 = Instant::now();

        let events = arming.press("urd123", Some(&mut transport), t0);
        assert_eq!(events, vec![ArmingEvent::Armed]);
        assert_eq!(arming.phase(), ArmingPhase::Armed);

        let events = arming.press("", Some(&mut transport), t0 + Duration::from_secs(1));
        assert_eq!(events, vec![ArmingEvent::Firing]);
        assert_eq!(arming.phase(), ArmingPhase::Firing);
        assert_eq!(transport.sent, vec!["ARMED!", "IGN!"]);
    }

    #[test]
    fn test_auto_disarm_sends_token_exactly_once() {
        let mut arming = machine();
        let mut transport = RecordingTransport::default();
        let t0 = Instant::now();
        arming.press("urd123", Some(&mut transport), t0);

        let events = arming.tick(Some(&mut transport), t0 + Duration::from_secs(5));
        assert_eq!(events, vec![ArmingEvent::AutoDisarmed]);
        assert_eq!(arming.phase(), ArmingPhase::Disarmed);

        // Further ticks stay quiet
        let events = arming.tick(Some(&mut transport), t0 + Duration::from_secs(10));
        assert!(events.is_empty());
        let disarms = transport.sent.iter().filter(|t| *t == "DISARMED!").count();
        assert_eq!(disarms, 1);
    }

    #[test]
    fn test_fire_resets_to_disarmed_without_token() {
        let mut arming = machine();
        let mut transport = RecordingTransport::default();
        let t0 = Instant::now();
        arming.press("urd123", Some(&mut transport), t0);
        arming.press("", Some(&mut transport), t0 + Duration::from_secs(1));

        let events = arming.tick(Some(&mut transport), t0 + Duration::from_secs(7));
        assert_eq!(events, vec![ArmingEvent::ResetToDisarmed]);
        assert_eq!(arming.phase(), ArmingPhase::Disarmed);
        assert_eq!(transport.sent, vec!["ARMED!", "IGN!"]);
    }

    #[test]
    fn test_blink_toggles_while_armed() {
        let mut arming = machine();
        let t0 = Instant::now();
        arming.press("urd123", None, t0);

        let events = arming.tick(None, t0 + Duration::from_millis(600));
        assert_eq!(events, vec![ArmingEvent::Blink(true)]);
        let events = arming.tick(None, t0 + Duration::from_millis(1200));
        assert_eq!(events, vec![ArmingEvent::Blink(false)]);
    }

    #[test]
    fn test_arming_without_transport_still_transitions() {
        let mut arming = machine();
        let events = arming.press("urd123", None, Instant::now());
        assert_eq!(events, vec![ArmingEvent::Armed]);
        assert_eq!(arming.phase(), ArmingPhase::Armed);
    }

    #[test]
    fn test_send_ping_writes_token() {
        let mut arming = machine();
        let mut transport = RecordingTransport::default();
        arming.send_ping(&mut transport).unwrap();
        assert_eq!(transport.sent, vec!["PING!"]);
    }

    #[test]
    fn test_continuity_replies() {
        assert_eq!(continuity_from_reply("PONG1"), Some(true));
        assert_eq!(continuity_from_reply("PONG0"), Some(false));
        assert_eq!(continuity_from_reply("PONG"), None);
        assert_eq!(continuity_from_reply("12:\t1.0"), None);
    }
}
