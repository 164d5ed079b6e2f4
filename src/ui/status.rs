use crate::config::STATUS_REFRESH_INTERVAL;
use crate::mtc::{Direction, SyncState};
use crate::timecode::Timecode;
use chrono::Local;
use crossbeam::atomic::AtomicCell;
use crossbeam::channel::{Receiver, RecvTimeoutError};
use indicatif::ProgressBar;

/// Latest decoder output, written from the receiver thread.
pub struct ReceiverStatus {
    pub timecode: AtomicCell<Option<Timecode>>,
    pub state: AtomicCell<SyncState>,
    pub direction: AtomicCell<Direction>,
}

impl Default for ReceiverStatus {
    fn default() -> Self {
        ReceiverStatus {
            timecode: AtomicCell::new(None),
            state: AtomicCell::new(SyncState::Idle),
            direction: AtomicCell::new(Direction::Forwards),
        }
    }
}

impl ReceiverStatus {
    pub fn render(&self) -> String {
        format_receiver_status(self.timecode.load(), self.state.load(), self.direction.load())
    }
}

pub struct GeneratorStatus {
    pub running: AtomicCell<bool>,
}

impl Default for GeneratorStatus {
    fn default() -> Self {
        GeneratorStatus {
            running: AtomicCell::new(false),
        }
    }
}

pub fn format_receiver_status(
    timecode: Option<Timecode>,
    state: SyncState,
    direction: Direction,
) -> String {
    let position = match timecode {
        Some(tc) => format!("{} @ {}", tc, tc.frame_rate()),
        None => "--:--:--:--".to_string(),
    };
    let state = match state {
        // the lock time is meaningless on screen
        SyncState::PreSync { .. } => "Pre-Sync".to_string(),
        other => other.to_string(),
    };
    format!("{} | {} | {}", position, state, direction)
}

pub fn format_generator_status(timecode: Option<Timecode>, running: bool) -> String {
    let position = match timecode {
        Some(tc) => format!("{} @ {}", tc, tc.frame_rate()),
        None => "--:--:--:--".to_string(),
    };
    let transport = if running { "Running" } else { "Stopped" };
    format!("{} | {}", position, transport)
}

/// Redraws `spinner` with `render()` until `shutdown` fires or disconnects.
pub fn run_status_display<F>(spinner: ProgressBar, render: F, shutdown: Receiver<()>)
where
    F: Fn() -> String,
{
    loop {
        match shutdown.recv_timeout(STATUS_REFRESH_INTERVAL) {
            Err(RecvTimeoutError::Timeout) => {
                spinner.set_message(format!("[{}] {}", Local::now().format("%H:%M:%S"), render()));
                spinner.tick();
            }
            _ => break,
        }
    }
    spinner.finish_and_clear();
}
