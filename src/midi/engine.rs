use std::error::Error;
use std::fmt;

/// Custom error type for MIDI operations
#[derive(Debug)]
pub enum MidiError {
    /// Error when sending a MIDI message
    SendError(String),
    /// Error when receiving a MIDI message
    RecvError(String),
    /// Error when connecting to a MIDI device
    ConnectionError(String),
}

impl fmt::Display for MidiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiError::SendError(msg) => write!(f, "MIDI send error: {}", msg),
            MidiError::RecvError(msg) => write!(f, "MIDI receive error: {}", msg),
            MidiError::ConnectionError(msg) => write!(f, "MIDI connection error: {}", msg),
        }
    }
}

impl Error for MidiError {}

impl From<midir::InitError> for MidiError {
    fn from(e: midir::InitError) -> Self {
        MidiError::ConnectionError(e.to_string())
    }
}

impl<T> From<midir::ConnectError<T>> for MidiError {
    fn from(e: midir::ConnectError<T>) -> Self {
        MidiError::ConnectionError(e.kind().to_string())
    }
}

impl From<midir::SendError> for MidiError {
    fn from(e: midir::SendError) -> Self {
        MidiError::SendError(e.to_string())
    }
}

/// Result type for MIDI operations
pub type Result<T> = std::result::Result<T, MidiError>;

/// Byte-level MIDI transport.
///
/// Buffers are complete MIDI messages; SysEx arrives as one buffer from
/// `F0` through `F7`.
pub trait MidiEngine: Send {
    /// Sends one message to the device
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Blocks until the next message arrives
    fn recv(&mut self) -> Result<Vec<u8>>;

    /// Names of the ports this engine can connect to
    fn list_devices(&self) -> Vec<String>;
}
