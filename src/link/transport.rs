//! Transport abstraction and serial implementation
//!
//! The state machines talk to the vehicle through the [`Transport`]
//! trait: a bounded line-oriented read and an atomic token write. The
//! production implementation wraps a `serialport` handle; tests use
//! scripted in-memory transports.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{SerialPort, SerialPortType};

/// Byte-stream transport to the vehicle.
///
/// `read_line` must return within the configured read timeout: `Ok(None)`
/// when no complete line is available yet, `Err` only for real transport
/// failures (which fault the session). `write_token` appends the newline
/// and must issue the token as a single write so concurrent state
/// machines sharing the transport never interleave mid-token.
pub trait Transport {
    fn read_line(&mut self) -> io::Result<Option<String>>;
    fn write_token(&mut self, token: &str) -> io::Result<()>;
}

/// Serial transport with internal line assembly.
///
/// Bytes are accumulated across bounded reads until a newline arrives;
/// decoding is lossy (a corrupt byte never kills the stream) and
/// carriage returns are stripped.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    pending: VecDeque<String>,
    partial: Vec<u8>,
}

impl SerialTransport {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            pending: VecDeque::new(),
            partial: Vec::new(),
        }
    }

    pub fn port_name(&self) -> Option<String> {
        self.port.name()
    }

    fn split_pending(&mut self) {
        while let Some(pos) = self.partial.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.partial.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes)
                .trim_end_matches(&['\r', '\n'][..])
                .to_string();
            self.pending.push_back(line);
        }
    }
}

impl Transport for SerialTransport {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        if let Some(line) = self.pending.pop_front() {
            return Ok(Some(line));
        }

        let mut buf = [0u8; 1024];
        match self.port.read(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                self.partial.extend_from_slice(&buf[..n]);
                self.split_pending();
            }
            // A silent link is not an error, just no line yet
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(e),
        }

        Ok(self.pending.pop_front())
    }

    fn write_token(&mut self, token: &str) -> io::Result<()> {
        let mut line = Vec::with_capacity(token.len() + 1);
        line.extend_from_slice(token.as_bytes());
        line.push(b'\n');
        self.port.write_all(&line)?;
        self.port.flush()
    }
}

/// Open a serial port for the telemetry link.
pub fn open_port(
    port_name: &str,
    baud: u32,
    read_timeout: Duration,
) -> Result<SerialTransport, serialport::Error> {
    let port = serialport::new(port_name, baud)
        .timeout(read_timeout)
        .open()?;
    Ok(SerialTransport::new(port))
}

/// Enumerate candidate serial ports for the operator to choose from,
/// filtering out Bluetooth-described ports (they enumerate on most OSes
/// but are never the flight computer).
pub fn list_candidate_ports() -> Result<Vec<String>, serialport::Error> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .filter(|info| match &info.port_type {
            SerialPortType::BluetoothPort => false,
            SerialPortType::UsbPort(usb) => !usb
                .product
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
                .contains("bluetooth"),
            _ => true,
        })
        .map(|info| info.port_name)
        .collect())
}
