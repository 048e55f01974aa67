//! Groundlink Library
//!
//! A Rust library implementing the telemetry link and state aggregator of a
//! model-rocket ground station: serial bring-up handshake, tolerant text
//! packet decoding, derived flight metrics, session logging, and the
//! password-gated ignition protocol used by the static-test console.
//!
//! # Features
//!
//! - **`csv`** (default): Enable the session logger and post-flight analysis
//! - **`cli`** (default): Build the command-line ground station binary
//! - **`serde`**: Enable serialization/deserialization of types
//!
//! # Quick Start
//!
//! Decode a telemetry line and fold it into session state:
//! ```rust
//! use groundlink::{decode_packet, metrics, FrameSchema, SchemaVersion, SessionState};
//!
//! let schema = FrameSchema::new(SchemaVersion::Euler18);
//! let mut state = SessionState::new();
//! if let Some(frame) = decode_packet("7:\t12.50\t-23.55\t-46.63\t~", &schema) {
//!     let events = metrics::apply_frame(&mut state, &frame, &schema);
//!     println!("{} events from frame {}", events.len(), frame.seq);
//! }
//! ```
//!
//! Drive a live link (the poll loop belongs to the caller):
//! ```rust,no_run
//! use groundlink::{LinkConfig, TelemetryController};
//! use groundlink::link::transport::open_port;
//!
//! let config = LinkConfig::default();
//! let transport = open_port("/dev/ttyUSB0", config.baud, config.read_timeout).unwrap();
//! let mut controller = TelemetryController::new(config);
//! controller.connect(transport).unwrap();
//! loop {
//!     controller.poll().unwrap();
//!     std::thread::sleep(std::time::Duration::from_millis(50));
//! }
//! ```
//!
//! # Public API
//!
//! ## Decoding
//! - [`decode_packet`] - Decode one raw line against a versioned schema
//! - [`TelemetryFrame`] - Field-name-to-value map with explicit absence
//! - [`FrameSchema`] / [`SchemaVersion`] - Versioned positional layouts
//!
//! ## Derived metrics
//! - [`metrics::apply_frame`] - Fold a frame into [`SessionState`]
//! - [`TelemetryEvent`] - Presentation events emitted per frame
//! - [`conversion`] - Haversine, quaternion/Euler normalization, fix buckets
//!
//! ## Link lifecycle
//! - [`TelemetryController`] - Owns the session, state, logger, and sinks
//! - [`LinkSession`] / [`LinkPhase`] - The bring-up handshake state machine
//! - [`link::transport`] - Transport trait, serial impl, port enumeration
//!
//! ## Static-test console
//! - [`ArmingStateMachine`] - Disarmed/Armed/Firing with safety timeouts
//! - [`continuity_from_reply`] - PONG continuity-check decoding

// Module declarations
#[cfg(feature = "csv")]
pub mod analysis;
pub mod config;
pub mod conversion;
pub mod error;
pub mod ignition;
pub mod link;
#[cfg(feature = "csv")]
pub mod logger;
pub mod metrics;
pub mod parser;
pub mod protocol;
pub mod types;

// Re-export the main types and entry points for convenience
pub use config::{ArmingConfig, LinkConfig};
pub use error::GroundLinkError;
pub use ignition::{continuity_from_reply, ArmingEvent, ArmingPhase, ArmingStateMachine};
pub use link::controller::TelemetryController;
pub use link::handshake::{LinkEvent, LinkPhase, LinkSession};
pub use link::transport::Transport;
pub use parser::packet::decode_packet;
pub use types::frame::{FrameSchema, SchemaVersion, TelemetryFrame};
pub use types::session::{
    FixQuality, Orientation, ParachuteChannel, SessionState, TelemetryEvent, TelemetrySink,
};

#[cfg(feature = "csv")]
pub use analysis::FlightSummary;
#[cfg(feature = "csv")]
pub use logger::SessionLogger;

// Re-export Result type for convenience
pub use anyhow::Result;
