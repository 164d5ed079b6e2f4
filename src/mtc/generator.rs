use super::encoder::{FullFrameBehavior, MtcEncoder};
use crate::scheduler::Scheduler;
use crate::timecode::Timecode;
use crossbeam::atomic::AtomicCell;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use log::{error, info};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneratorCommand {
    Locate(Timecode),
    Start(Timecode),
    Stop,
    SetLocateBehavior(FullFrameBehavior),
    Shutdown,
}

/// Handle to an encoder running on its own worker thread.
///
/// While started, the worker sends one quarter-frame per quarter-frame
/// interval of the located frame rate.
pub struct MtcGenerator {
    commands: Sender<GeneratorCommand>,
    position: Arc<AtomicCell<Option<Timecode>>>,
}

impl MtcGenerator {
    pub fn spawn<S: Scheduler>(scheduler: &S, encoder: MtcEncoder) -> std::io::Result<Self> {
        let (commands, rx) = channel::unbounded();
        let position = Arc::new(AtomicCell::new(None));

        let worker_position = position.clone();
        let thread_name = format!("mtc-gen-{}", encoder.name());
        scheduler.spawn(&thread_name, move || {
            run_generator(encoder, rx, worker_position);
        })?;

        Ok(MtcGenerator { commands, position })
    }

    /// Locates without generating. Sends a full-frame per the locate behavior.
    pub fn locate(&self, timecode: Timecode) {
        self.send(GeneratorCommand::Locate(timecode));
    }

    /// Starts generating from `timecode`, which should be the current time.
    pub fn start(&self, timecode: Timecode) {
        self.send(GeneratorCommand::Start(timecode));
    }

    /// Locates without a full-frame and starts generating.
    pub fn locate_and_start(&self, timecode: Timecode) {
        self.start(timecode);
    }

    pub fn stop(&self) {
        self.send(GeneratorCommand::Stop);
    }

    pub fn set_locate_behavior(&self, behavior: FullFrameBehavior) {
        self.send(GeneratorCommand::SetLocateBehavior(behavior));
    }

    /// Last position reported by the worker.
    pub fn position(&self) -> Option<Timecode> {
        self.position.load()
    }

    pub fn shutdown(&self) {
        self.send(GeneratorCommand::Shutdown);
    }

    fn send(&self, command: GeneratorCommand) {
        if self.commands.send(command).is_err() {
            error!("MTC generator worker is gone, dropping {:?}", command);
        }
    }
}

impl Drop for MtcGenerator {
    fn drop(&mut self) {
        let _ = self.commands.send(GeneratorCommand::Shutdown);
    }
}

/// Worker loop. Owns the encoder for its whole lifetime.
pub fn run_generator(
    mut encoder: MtcEncoder,
    commands: Receiver<GeneratorCommand>,
    position: Arc<AtomicCell<Option<Timecode>>>,
) {
    info!("MTC generator '{}' ready", encoder.name());
    let mut next_tick: Option<Instant> = None;

    loop {
        let command = match next_tick {
            Some(deadline) => match commands.recv_deadline(deadline) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            },
        };

        match command {
            None => {
                encoder.increment();
                position.store(Some(encoder.timecode()));
                let interval = encoder.local_frame_rate().mtc_quarter_frame_interval();
                next_tick = next_tick.map(|tick| tick + interval);
            }
            Some(GeneratorCommand::Locate(timecode)) => {
                encoder.locate(timecode);
                position.store(Some(encoder.timecode()));
            }
            Some(GeneratorCommand::Start(timecode)) => {
                encoder.start(timecode);
                position.store(Some(encoder.timecode()));
                info!("MTC generator started at {}", timecode);
                next_tick = Some(Instant::now());
            }
            Some(GeneratorCommand::Stop) => {
                encoder.stop();
                next_tick = None;
                info!("MTC generator stopped at {}", encoder.timecode());
            }
            Some(GeneratorCommand::SetLocateBehavior(behavior)) => {
                encoder.set_locate_behavior(behavior);
            }
            Some(GeneratorCommand::Shutdown) => break,
        }
    }

    info!("MTC generator '{}' shutting down", encoder.name());
}
