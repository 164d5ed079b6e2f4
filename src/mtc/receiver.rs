use super::decoder::MtcDecoder;
use super::message::RawMtcMessage;
use crate::config::RECEIVER_POLL_INTERVAL;
use crate::midi::MidiEngine;
use crate::scheduler::Scheduler;
use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use log::{debug, error, info};
use std::time::Instant;

/// Feeds MTC from `engine` into `decoder` until the input closes or
/// `shutdown` receives a message.
///
/// A reader worker, started on `scheduler` as `mtc-in-<decoder name>`, blocks
/// on the engine and forwards raw buffers; this loop owns the decoder and
/// wakes up every [`RECEIVER_POLL_INTERVAL`] to let it notice drop-outs when
/// nothing arrives. After shutdown the reader stays parked in `recv` until
/// the next buffer or engine error, then exits because the loop is gone.
pub fn run_mtc_receiver<S, T>(
    scheduler: &S,
    mut engine: T,
    mut decoder: MtcDecoder,
    shutdown: Receiver<()>,
) where
    S: Scheduler,
    T: MidiEngine + 'static,
{
    info!("MTC receiver '{}' waiting for input", decoder.name());

    let (tx, rx) = channel::unbounded::<Vec<u8>>();

    let reader_name = format!("mtc-in-{}", decoder.name());
    let spawned = scheduler.spawn(&reader_name, move || loop {
        match engine.recv() {
            Ok(bytes) => {
                if tx.send(bytes).is_err() {
                    debug!("MTC receiver loop is gone, stopping MIDI reader");
                    break;
                }
            }
            Err(e) => {
                error!("MIDI engine receive error: {}", e);
                break;
            }
        }
    });
    if let Err(e) = spawned {
        error!("Failed to start MIDI reader '{}': {}", reader_name, e);
        return;
    }

    loop {
        if shutdown.try_recv().is_ok() {
            info!("MTC receiver shutdown requested");
            break;
        }

        match rx.recv_timeout(RECEIVER_POLL_INTERVAL) {
            Ok(bytes) => match RawMtcMessage::classify(&bytes) {
                Some(message) => decoder.midi_in(&[message]),
                None => {
                    decoder.check_timeout(Instant::now());
                }
            },
            Err(RecvTimeoutError::Timeout) => {
                decoder.check_timeout(Instant::now());
            }
            Err(RecvTimeoutError::Disconnected) => {
                error!("MIDI reader disconnected - the device may have been removed");
                break;
            }
        }
    }

    info!(
        "MTC receiver '{}' stopped at {} ({})",
        decoder.name(),
        decoder.timecode(),
        decoder.state()
    );
}
