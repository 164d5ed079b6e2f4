//! User interface components
//!
//! This module provides the terminal status line for mtcsyncrs:
//! - Spinner with a wall-clock prefix
//! - Shared status cells written by the MTC workers
//! - A refresh loop rendering them until shutdown
//!
//! The UI is built using the indicatif library for spinners.

mod progress;
mod status;

pub use progress::create_status_spinner;
pub use status::{
    format_generator_status, format_receiver_status, run_status_display, GeneratorStatus,
    ReceiverStatus,
};
