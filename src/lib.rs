pub mod cli;
pub mod config;
pub mod logging;
pub mod midi;
pub mod mtc;
pub mod scheduler;
pub mod timecode;
pub mod ui;

pub use cli::{validate_device, Args, Command};
pub use config::{Settings, SettingsError};
pub use mtc::{
    MtcDecoder, MtcEncoder, MtcFrameRate, MtcGenerator, RawMtcMessage, SyncPolicy, SyncState,
};
pub use scheduler::{Scheduler, ThreadScheduler};
pub use timecode::{FrameRate, Timecode, TimecodeError};

#[cfg(not(feature = "test-mock"))]
pub fn handle_device_list() -> Vec<String> {
    midi::DefaultMidiEngine::available_devices()
}

#[cfg(feature = "test-mock")]
pub fn handle_device_list() -> Vec<String> {
    use midi::MidiEngine;
    match midi::MockMidiEngine::new(None) {
        Ok(engine) => engine.list_devices(),
        Err(_) => Vec::new(),
    }
}

pub fn create_scheduler() -> ThreadScheduler {
    ThreadScheduler::new()
}
