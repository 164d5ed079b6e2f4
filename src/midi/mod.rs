//! MIDI transport for mtcsyncrs
//!
//! This module moves raw MIDI bytes between the MTC engine and devices:
//! - [`MidiEngine`] trait for sending and receiving byte buffers
//! - [`MidirEngine`] for real MIDI device communication
//! - [`MockMidiEngine`] for testing
//!
mod engine;
pub mod midir_engine; // Make the module public
pub mod mock_engine; // Make the module public

// Re-export main types from engine
pub use engine::{MidiEngine, MidiError, Result};

// Re-export concrete implementations
pub use midir_engine::MidirEngine;
pub use mock_engine::MockMidiEngine;

// Set default engine type
pub type DefaultMidiEngine = MidirEngine;
