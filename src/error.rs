use std::fmt;

/// Custom error types for the ground-station link
#[derive(Debug)]
pub enum GroundLinkError {
    /// I/O errors from the transport or the session log
    Io(std::io::Error),
    /// Serial port enumeration or open failure
    Port(serialport::Error),
    /// Connect requested while a session is already open
    AlreadyConnected(String),
    /// Operation requires an open link
    NotConnected,
    /// Transport fault in a non-closed phase; the session is torn down
    Transport(String),
    /// Handshake deadline expired (OK acknowledgment never arrived)
    HandshakeTimeout(String),
}

impl fmt::Display for GroundLinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroundLinkError::Io(err) => write!(f, "I/O error: {}", err),
            GroundLinkError::Port(err) => write!(f, "Serial port error: {}", err),
            GroundLinkError::AlreadyConnected(port) => {
                write!(f, "Already connected on {}", port)
            }
            GroundLinkError::NotConnected => write!(f, "No link is open"),
            GroundLinkError::Transport(msg) => write!(f, "Transport fault: {}", msg),
            GroundLinkError::HandshakeTimeout(msg) => write!(f, "Handshake timeout: {}", msg),
        }
    }
}

impl std::error::Error for GroundLinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GroundLinkError::Io(err) => Some(err),
            GroundLinkError::Port(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GroundLinkError {
    fn from(err: std::io::Error) -> Self {
        GroundLinkError::Io(err)
    }
}

impl From<serialport::Error> for GroundLinkError {
    fn from(err: serialport::Error) -> Self {
        GroundLinkError::Port(err)
    }
}
