//! Serial link lifecycle
//!
//! The transport abstraction, the bring-up handshake state machine, and
//! the controller that owns a session end to end.

pub mod controller;
pub mod handshake;
pub mod transport;
