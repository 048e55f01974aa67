//! Telemetry line parsing
//!
//! The packet decoder turns one raw serial line into a typed field map.
//! It is deliberately forgiving: anything that does not look like a
//! packet is rejected wholesale, and inside a packet any malformed token
//! degrades to an absent field rather than an error.

pub mod packet;

pub use packet::*;
