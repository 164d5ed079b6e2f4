//! MIDI Time Code
//!
//! This module provides the MTC protocol engine:
//! - [`MtcFrameRate`] and the scaling rules between MTC's four base rates and
//!   real-world frame rates
//! - [`message`] wire codec for quarter-frame and full-frame messages
//! - [`MtcEncoder`] which produces the quarter-frame stream
//! - [`MtcDecoder`] which reconstructs timecode, direction and lock state
//! - [`MtcGenerator`] and [`run_mtc_receiver`] which drive them from threads
//!
mod decoder;
mod encoder;
mod frame_rate;
mod generator;
pub mod message;
mod receiver;
mod sync;

pub use decoder::{Direction, DisplayUpdateGranularity, MessageType, MtcDecoder};
pub use encoder::{FullFrameBehavior, MtcEncoder};
pub use frame_rate::MtcFrameRate;
pub use generator::{run_generator, GeneratorCommand, MtcGenerator};
pub use message::RawMtcMessage;
pub use receiver::run_mtc_receiver;
pub use sync::{
    advance_by_mtc_frames, group_duration, mtc_group_duration, GroupObservation, SyncPolicy,
    SyncState, SyncStateMachine,
};
