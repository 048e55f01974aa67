//! Telemetry controller
//!
//! Single owner of one link's lifecycle: the [`LinkSession`], the
//! aggregate [`SessionState`], the optional session logger, and the
//! registered presentation sinks. All processing happens synchronously
//! inside `poll`, so state mutation is single-writer and sinks only ever
//! see consistent snapshots.

use std::time::Instant;

use log::{info, warn};

use crate::config::LinkConfig;
use crate::error::GroundLinkError;
use crate::link::handshake::{LinkEvent, LinkPhase, LinkSession};
use crate::link::transport::Transport;
use crate::metrics;
use crate::types::frame::FrameSchema;
use crate::types::session::{SessionState, TelemetrySink};

#[cfg(feature = "csv")]
use crate::logger::SessionLogger;

pub struct TelemetryController<T: Transport> {
    config: LinkConfig,
    schema: FrameSchema,
    session: Option<LinkSession<T>>,
    state: SessionState,
    sinks: Vec<Box<dyn TelemetrySink>>,
    net_online: bool,
    #[cfg(feature = "csv")]
    logger: Option<SessionLogger>,
}

impl<T: Transport> TelemetryController<T> {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            schema: FrameSchema::new(config.schema),
            config,
            session: None,
            state: SessionState::new(),
            sinks: Vec::new(),
            net_online: false,
            #[cfg(feature = "csv")]
            logger: None,
        }
    }

    /// Register a presentation consumer. Sinks are called in
    /// registration order after every update.
    pub fn add_sink(&mut self, sink: Box<dyn TelemetrySink>) {
        self.sinks.push(sink);
    }

    /// Attach a session logger; the header is written on attach.
    #[cfg(feature = "csv")]
    pub fn set_logger(&mut self, logger: SessionLogger) {
        self.logger = Some(logger);
    }

    /// Read-only snapshot of the aggregate state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> LinkPhase {
        self.session
            .as_ref()
            .map_or(LinkPhase::Closed, |s| s.phase())
    }

    /// Open a link on the given transport.
    ///
    /// Rejected without side effects (nothing is written anywhere) when
    /// a session is already open; exactly one transport per port.
    pub fn connect(&mut self, transport: T) -> Result<(), GroundLinkError> {
        self.connect_at(transport, Instant::now())
    }

    pub fn connect_at(&mut self, transport: T, now: Instant) -> Result<(), GroundLinkError> {
        if self
            .session
            .as_ref()
            .is_some_and(|s| !matches!(s.phase(), LinkPhase::Closed | LinkPhase::Faulted))
        {
            return Err(GroundLinkError::AlreadyConnected(
                "a link session is already open".to_string(),
            ));
        }
        let session = LinkSession::connect_at(transport, self.config.clone(), now)?;
        self.session = Some(session);
        info!("link: connecting");
        Ok(())
    }

    /// Explicit disconnect; safe to call in any state.
    pub fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.disconnect();
            info!("link: disconnected");
        }
        for sink in &mut self.sinks {
            sink.on_phase(LinkPhase::Closed);
        }
    }

    /// Drive the link once: handshake progress, line decoding, derived
    /// metrics, logging, and sink fan-out. Idempotent when no session is
    /// open. A transport fault tears the session down, notifies sinks
    /// with the cause, and is returned to the caller; the aggregate
    /// state survives until [`TelemetryController::reset_state`].
    pub fn poll(&mut self) -> Result<(), GroundLinkError> {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> Result<(), GroundLinkError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let events = match session.poll_at(now) {
            Ok(events) => events,
            Err(err) => {
                let cause = err.to_string();
                warn!("link: session torn down: {}", cause);
                self.session = None;
                for sink in &mut self.sinks {
                    sink.on_fault(&cause);
                }
                return Err(err);
            }
        };

        for event in events {
            match event {
                LinkEvent::Phase(phase) => {
                    for sink in &mut self.sinks {
                        sink.on_phase(phase);
                    }
                }
                LinkEvent::RawLine(line) => {
                    for sink in &mut self.sinks {
                        sink.on_raw_line(&line);
                    }
                }
                LinkEvent::BaseFix { lat, lon } => {
                    self.state.base_position = Some((lat, lon));
                    for sink in &mut self.sinks {
                        sink.on_base_location(lat, lon);
                    }
                }
                LinkEvent::NoFix => {
                    info!("link: streaming without a base location");
                }
                LinkEvent::Frame(frame) => {
                    let derived = metrics::apply_frame(&mut self.state, &frame, &self.schema);
                    #[cfg(feature = "csv")]
                    if let Some(logger) = self.logger.as_mut() {
                        if let Err(e) = logger.append(&frame) {
                            warn!("session log write failed: {}", e);
                        }
                    }
                    for sink in &mut self.sinks {
                        sink.on_frame(&frame, &derived);
                    }
                }
            }
        }
        Ok(())
    }

    /// Operator action: set or move the base location used for the
    /// distance readout.
    pub fn set_base(&mut self, lat: f64, lon: f64) {
        self.state.base_position = Some((lat, lon));
        for sink in &mut self.sinks {
            sink.on_base_location(lat, lon);
        }
    }

    /// Operator action: discard the aggregate state. The only reset
    /// path; parse failures and faults never clear it.
    pub fn reset_state(&mut self) {
        self.state = SessionState::new();
    }

    /// Update the explicit network-status value and notify subscribers
    /// on change.
    pub fn set_net_status(&mut self, online: bool) {
        if self.net_online != online {
            self.net_online = online;
            for sink in &mut self.sinks {
                sink.on_net_changed(online);
            }
        }
    }

    pub fn net_status(&self) -> bool {
        self.net_online
    }
}
