//! Tolerant telemetry packet decoder
//!
//! Wire format: tab-separated ASCII, one packet per line. The first token
//! is a non-negative sequence number (optionally colon-suffixed) and is
//! the framing heuristic that separates telemetry from boot banners and
//! command echoes. Remaining tokens are positional per the configured
//! [`FrameSchema`]; each may be `label:value` or a bare `value`, with `~`
//! meaning "not reported this cycle".

use crate::protocol::SENTINEL;
use crate::types::frame::{FrameSchema, TelemetryFrame};

/// Decode one raw line against the schema's ordered field list.
///
/// Returns `None` when the line is not a telemetry packet (the framing
/// heuristic fails). Inside a packet, a malformed or sentinel token
/// yields an absent field; the rest of the line still decodes. Tokens
/// beyond the schema's field list are kept under `field_<index>` so
/// forward-compatible extra columns are not silently lost. This function
/// never panics on any input.
pub fn decode_packet(line: &str, schema: &FrameSchema) -> Option<TelemetryFrame> {
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    let mut tokens = line.split('\t');

    let seq = parse_sequence_token(tokens.next()?)?;
    let mut frame = TelemetryFrame::new(seq);

    for (index, token) in tokens.enumerate() {
        let value = match token_value(token) {
            Some(v) => v,
            None => continue,
        };
        let name = match schema.field_names.get(index) {
            Some(name) => name.clone(),
            // Extra trailing columns from a newer flight computer
            None => format!("field_{}", index),
        };
        frame.fields.insert(name, value);
    }

    Some(frame)
}

/// Framing heuristic: the first token, after stripping one trailing
/// colon, must parse as a finite non-negative decimal number.
fn parse_sequence_token(token: &str) -> Option<u64> {
    let stripped = token.trim().strip_suffix(':').unwrap_or(token.trim());
    let value: f64 = stripped.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value as u64)
}

/// Decode one data token to its numeric value, or `None` for absent.
///
/// Only the substring after the last colon is considered, so labeled
/// tokens like `alt:123.4` and bare values both work.
fn token_value(token: &str) -> Option<f64> {
    let value_part = match token.rfind(':') {
        Some(pos) => &token[pos + 1..],
        None => token,
    };
    let value_part = value_part.trim();
    if value_part == SENTINEL {
        return None;
    }
    extract_number(value_part)
}

/// Extract a leading number from a value substring.
///
/// Keeps digits, `.`, and `-` from the start and stops at the first
/// other character, which tolerates trailing units or noise (`123.4m`).
/// Returns `None` when the kept prefix does not parse.
pub fn extract_number(s: &str) -> Option<f64> {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit() && *c != '.' && *c != '-')
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse().ok()
}
