//! Link bring-up handshake state machine
//!
//! Owns the serial transport lifecycle for one telemetry session:
//!
//! ```text
//! Closed -> Resetting -> AwaitingReady -> AwaitingOk
//!        -> AwaitingGpsOk -> AwaitingGpsFix -> Streaming
//! ```
//!
//! `Faulted` is reachable from any state on a transport error and is
//! terminal; `Closed` is reachable from any state on explicit
//! disconnect. All waiting is deadline-based against a caller-supplied
//! monotonic instant, so polling never blocks beyond the transport's
//! bounded read timeout.

use std::time::Instant;

use log::{debug, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::LinkConfig;
use crate::error::GroundLinkError;
use crate::link::transport::Transport;
use crate::parser::packet::decode_packet;
use crate::protocol::{REPLY_GPS_OK, REPLY_OK, SENTINEL, TOKEN_GPS_COORDS, TOKEN_READY, TOKEN_RESET};
use crate::types::frame::{FrameSchema, TelemetryFrame};

/// Handshake phase of a telemetry link session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LinkPhase {
    Closed,
    /// Reset sent; waiting out the remote reboot quiescence
    Resetting,
    /// Quiescence elapsed; about to announce the ground station
    AwaitingReady,
    /// Ready sent; discarding lines until the exact `OK` acknowledgment
    AwaitingOk,
    /// GPS coordinates requested; waiting for the subsystem-ready reply
    AwaitingGpsOk,
    /// Bounded fix-acquisition window
    AwaitingGpsFix,
    /// Steady-state telemetry
    Streaming,
    /// Transport error; the session is dead and must be recreated
    Faulted,
}

/// Events produced by one poll of the session
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Phase(LinkPhase),
    /// A line that is not a telemetry packet (shown verbatim in the
    /// diagnostic terminal)
    RawLine(String),
    /// An accepted telemetry frame
    Frame(TelemetryFrame),
    /// GPS bootstrap produced a fix; seeds the base location
    BaseFix { lat: f64, lon: f64 },
    /// GPS bootstrap ended without a fix (sentinel pair or window expiry)
    NoFix,
}

enum FixOutcome {
    Fix { lat: f64, lon: f64 },
    NoFix,
}

/// One telemetry link session, from connect to disconnect or fault.
///
/// A session that has faulted keeps reporting [`LinkPhase::Faulted`] and
/// polls as a no-op; reconnecting requires a fresh session.
pub struct LinkSession<T: Transport> {
    transport: Option<T>,
    phase: LinkPhase,
    schema: FrameSchema,
    config: LinkConfig,
    quiescence_deadline: Option<Instant>,
    ok_deadline: Option<Instant>,
    fix_deadline: Option<Instant>,
}

impl<T: Transport> LinkSession<T> {
    /// Open a session: send the reset token and start the reboot
    /// quiescence window.
    pub fn connect(transport: T, config: LinkConfig) -> Result<Self, GroundLinkError> {
        Self::connect_at(transport, config, Instant::now())
    }

    /// [`LinkSession::connect`] against an explicit instant (testable)
    pub fn connect_at(
        mut transport: T,
        config: LinkConfig,
        now: Instant,
    ) -> Result<Self, GroundLinkError> {
        transport
            .write_token(TOKEN_RESET)
            .map_err(|e| GroundLinkError::Transport(format!("reset failed: {}", e)))?;
        debug!("link: reset sent, waiting {:?} quiescence", config.reset_quiescence);
        Ok(Self {
            quiescence_deadline: Some(now + config.reset_quiescence),
            transport: Some(transport),
            phase: LinkPhase::Resetting,
            schema: FrameSchema::new(config.schema),
            config,
            ok_deadline: None,
            fix_deadline: None,
        })
    }

    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    /// Drive the session once. Idempotent when the transport is not
    /// open; never blocks beyond the transport's read timeout.
    pub fn poll(&mut self) -> Result<Vec<LinkEvent>, GroundLinkError> {
        self.poll_at(Instant::now())
    }

    /// [`LinkSession::poll`] against an explicit instant (testable)
    pub fn poll_at(&mut self, now: Instant) -> Result<Vec<LinkEvent>, GroundLinkError> {
        if matches!(self.phase, LinkPhase::Closed | LinkPhase::Faulted) {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();

        if self.phase == LinkPhase::Resetting && self.deadline_passed(self.quiescence_deadline, now)
        {
            self.set_phase(LinkPhase::AwaitingReady, &mut events);
            self.write_or_fault(TOKEN_READY)?;
            self.set_phase(LinkPhase::AwaitingOk, &mut events);
            self.ok_deadline = self.config.ok_timeout.map(|t| now + t);
        }

        loop {
            let line = match self.transport.as_mut() {
                Some(transport) => transport.read_line(),
                None => break,
            };
            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => return Err(self.fault(format!("read failed: {}", e))),
            };
            self.handle_line(line, now, &mut events)?;
        }

        if self.phase == LinkPhase::AwaitingOk && self.deadline_passed(self.ok_deadline, now) {
            return Err(self.fault_timeout("no OK acknowledgment before deadline".to_string()));
        }

        if self.phase == LinkPhase::AwaitingGpsFix && self.deadline_passed(self.fix_deadline, now) {
            // Degrade gracefully: streaming starts without a base location
            warn!("link: GPS fix window elapsed without a fix");
            events.push(LinkEvent::NoFix);
            self.set_phase(LinkPhase::Streaming, &mut events);
        }

        Ok(events)
    }

    /// Explicit disconnect, safe from any state: best-effort reset,
    /// close the transport, cancel all deadlines.
    pub fn disconnect(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            if let Err(e) = transport.write_token(TOKEN_RESET) {
                debug!("link: reset on disconnect failed: {}", e);
            }
        }
        self.transport = None;
        self.quiescence_deadline = None;
        self.ok_deadline = None;
        self.fix_deadline = None;
        self.phase = LinkPhase::Closed;
    }

    fn handle_line(
        &mut self,
        line: String,
        now: Instant,
        events: &mut Vec<LinkEvent>,
    ) -> Result<(), GroundLinkError> {
        match self.phase {
            LinkPhase::Resetting | LinkPhase::AwaitingReady => {
                // Reboot chatter before READY is sent
                trace!("link: dropping pre-ready line: {}", line);
            }
            LinkPhase::AwaitingOk => {
                if line.trim() == REPLY_OK {
                    debug!("link: acknowledged");
                    self.write_or_fault(TOKEN_GPS_COORDS)?;
                    self.set_phase(LinkPhase::AwaitingGpsOk, events);
                } else {
                    // Partial matches and noise are ignored, not errors
                    trace!("link: dropping non-acknowledgment line: {}", line);
                }
            }
            LinkPhase::AwaitingGpsOk => {
                if line.trim() == REPLY_GPS_OK {
                    self.fix_deadline = Some(now + self.config.fix_timeout);
                    self.set_phase(LinkPhase::AwaitingGpsFix, events);
                } else {
                    trace!("link: dropping line while waiting for GPS_OK: {}", line);
                }
            }
            LinkPhase::AwaitingGpsFix => match parse_fix_line(&line) {
                Some(FixOutcome::Fix { lat, lon }) => {
                    debug!("link: base fix {:.6}, {:.6}", lat, lon);
                    events.push(LinkEvent::BaseFix { lat, lon });
                    self.set_phase(LinkPhase::Streaming, events);
                }
                Some(FixOutcome::NoFix) => {
                    events.push(LinkEvent::NoFix);
                    self.set_phase(LinkPhase::Streaming, events);
                }
                None => trace!("link: dropping line in fix window: {}", line),
            },
            LinkPhase::Streaming => match decode_packet(&line, &self.schema) {
                Some(frame) => events.push(LinkEvent::Frame(frame)),
                // Framing rejection: dropped from the pipeline but still
                // surfaced for the diagnostic terminal
                None => events.push(LinkEvent::RawLine(line)),
            },
            LinkPhase::Closed | LinkPhase::Faulted => {}
        }
        Ok(())
    }

    fn set_phase(&mut self, phase: LinkPhase, events: &mut Vec<LinkEvent>) {
        self.phase = phase;
        events.push(LinkEvent::Phase(phase));
    }

    fn deadline_passed(&self, deadline: Option<Instant>, now: Instant) -> bool {
        deadline.map_or(false, |d| now >= d)
    }

    fn write_or_fault(&mut self, token: &str) -> Result<(), GroundLinkError> {
        let result = match self.transport.as_mut() {
            Some(transport) => transport.write_token(token),
            None => return Err(GroundLinkError::NotConnected),
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fault(format!("write {} failed: {}", token, e))),
        }
    }

    fn fault(&mut self, cause: String) -> GroundLinkError {
        warn!("link: faulted: {}", cause);
        self.transport = None;
        self.phase = LinkPhase::Faulted;
        GroundLinkError::Transport(cause)
    }

    fn fault_timeout(&mut self, cause: String) -> GroundLinkError {
        warn!("link: faulted: {}", cause);
        self.transport = None;
        self.phase = LinkPhase::Faulted;
        GroundLinkError::HandshakeTimeout(cause)
    }
}

/// Match a line against the two fix-window shapes: two tab-separated
/// numeric tokens (a fix) or the sentinel pair meaning "no fix".
/// Anything else returns `None` and the window keeps waiting.
fn parse_fix_line(line: &str) -> Option<FixOutcome> {
    let tokens: Vec<&str> = line.split('\t').map(str::trim).collect();
    if tokens.len() != 2 {
        return None;
    }
    if tokens[0] == SENTINEL && tokens[1] == SENTINEL {
        return Some(FixOutcome::NoFix);
    }
    let lat: f64 = tokens[0].parse().ok()?;
    let lon: f64 = tokens[1].parse().ok()?;
    Some(FixOutcome::Fix { lat, lon })
}
