use super::frame_rate::MtcFrameRate;
use super::message::{FullFrame, MtcComponents, QuarterFrame, RawMtcMessage};
use super::sync::{GroupObservation, SyncPolicy, SyncState, SyncStateMachine};
use crate::timecode::{Components, FrameRate, Timecode};
use log::{debug, info, warn};
use std::fmt;
use std::time::Instant;

/// Playback direction inferred from consecutive quarter-frame pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forwards,
    Backwards,
    Ambiguous,
}

impl Direction {
    /// `None` when the piece repeats.
    pub fn between(previous_piece: u8, new_piece: u8) -> Option<Direction> {
        let previous = previous_piece & 0b111;
        let new = new_piece & 0b111;
        if new == previous {
            None
        } else if new == (previous + 1) % 8 {
            Some(Direction::Forwards)
        } else if new == (previous + 7) % 8 {
            Some(Direction::Backwards)
        } else {
            Some(Direction::Ambiguous)
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forwards => write!(f, "forwards"),
            Direction::Backwards => write!(f, "backwards"),
            Direction::Ambiguous => write!(f, "ambiguous"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    QuarterFrame,
    FullFrame,
    /// Predicted position while quarter-frames are missing
    Freewheel,
}

/// How much of the timecode has to change for `display_needs_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayUpdateGranularity {
    #[default]
    Second,
    Frame,
}

impl std::str::FromStr for DisplayUpdateGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "second" | "seconds" => Ok(DisplayUpdateGranularity::Second),
            "frame" | "frames" => Ok(DisplayUpdateGranularity::Frame),
            other => Err(format!("unknown display granularity '{}'", other)),
        }
    }
}

type TimecodeChangedHandler = Box<dyn FnMut(Timecode, MessageType, Direction, bool) + Send>;
type StateChangedHandler = Box<dyn FnMut(SyncState) + Send>;
type MtcRateChangedHandler = Box<dyn FnMut(MtcFrameRate) + Send>;

/// Reconstructs timecode from an incoming MTC stream.
///
/// Feed demultiplexed MTC events to [`midi_in`](Self::midi_in). Position
/// updates go to the timecode handler, lock state transitions to the state
/// handler. Not thread-safe; drive each instance from a single thread.
pub struct MtcDecoder {
    name: String,
    timecode_changed: TimecodeChangedHandler,
    state_changed: StateChangedHandler,
    mtc_rate_changed: Option<MtcRateChangedHandler>,

    local_frame_rate: Option<FrameRate>,
    mtc_frame_rate: Option<MtcFrameRate>,
    timecode: Timecode,
    direction: Direction,
    granularity: DisplayUpdateGranularity,

    partial_pieces: [Option<u8>; 8],
    last_piece: Option<u8>,
    registers: MtcComponents,
    received_sync_piece: bool,
    captured: MtcComponents,
    captured_direction: Direction,
    quarter_frames_since_sync: Option<i32>,
    last_reported: Option<Timecode>,

    sync: SyncStateMachine,
}

impl MtcDecoder {
    pub fn new<T, S>(
        name: impl Into<String>,
        initial_local_frame_rate: Option<FrameRate>,
        sync_policy: SyncPolicy,
        timecode_changed: T,
        state_changed: S,
    ) -> Self
    where
        T: FnMut(Timecode, MessageType, Direction, bool) + Send + 'static,
        S: FnMut(SyncState) + Send + 'static,
    {
        MtcDecoder {
            name: name.into(),
            timecode_changed: Box::new(timecode_changed),
            state_changed: Box::new(state_changed),
            mtc_rate_changed: None,
            local_frame_rate: initial_local_frame_rate,
            mtc_frame_rate: None,
            timecode: Timecode::zero(initial_local_frame_rate.unwrap_or(FrameRate::Fps30)),
            direction: Direction::Forwards,
            granularity: DisplayUpdateGranularity::default(),
            partial_pieces: [None; 8],
            last_piece: None,
            registers: MtcComponents::default(),
            received_sync_piece: false,
            captured: MtcComponents::default(),
            captured_direction: Direction::Ambiguous,
            quarter_frames_since_sync: None,
            last_reported: None,
            sync: SyncStateMachine::new(sync_policy),
        }
    }

    pub fn set_mtc_rate_changed_handler<F>(&mut self, handler: F)
    where
        F: FnMut(MtcFrameRate) + Send + 'static,
    {
        self.mtc_rate_changed = Some(Box::new(handler));
    }

    pub fn midi_in(&mut self, events: &[RawMtcMessage]) {
        self.midi_in_at(events, Instant::now());
    }

    /// Ingests events that arrived at `now`.
    pub fn midi_in_at(&mut self, events: &[RawMtcMessage], now: Instant) {
        self.check_timeout(now);

        for event in events {
            match event {
                RawMtcMessage::QuarterFrame(data) => self.quarter_frame_in(*data, now),
                RawMtcMessage::FullFrame(bytes) => self.full_frame_in(bytes, now),
            }
        }
    }

    /// Accounts for groups missing up to `now`. Returns `true` if the sync
    /// state changed. While freewheeling, emits predicted positions.
    pub fn check_timeout(&mut self, now: Instant) -> bool {
        let previous_misses = self.sync.consecutive_miss_count();
        let transition = self.sync.check_timeout(now);

        if let Some(state) = transition {
            if state == SyncState::Idle {
                self.reset_qf_buffer();
            }
            (self.state_changed)(state);
        }

        if self.sync.consecutive_miss_count() != previous_misses {
            if let Some(predicted) = self.sync.predicted_timecode(now) {
                self.report(predicted, MessageType::Freewheel);
            }
        }

        transition.is_some()
    }

    pub fn local_frame_rate(&self) -> Option<FrameRate> {
        self.local_frame_rate
    }

    /// Changes the local rate, re-checking it against the received MTC rate.
    pub fn set_local_frame_rate(&mut self, frame_rate: Option<FrameRate>) {
        self.set_local_frame_rate_at(frame_rate, Instant::now());
    }

    /// Changes the local rate as of `now`, on the same clock as
    /// [`midi_in_at`](Self::midi_in_at).
    pub fn set_local_frame_rate_at(&mut self, frame_rate: Option<FrameRate>, now: Instant) {
        self.local_frame_rate = frame_rate;

        let Some(mtc_rate) = self.mtc_frame_rate else {
            return;
        };

        let transition = if self.is_compatible(mtc_rate) {
            self.sync.frame_rate_compatible(now, self.timecode)
        } else {
            warn!(
                "[{}] local rate {:?} cannot be driven by {}",
                self.name, frame_rate, mtc_rate
            );
            self.sync.incompatible_frame_rate()
        };

        if let Some(state) = transition {
            (self.state_changed)(state);
        }
    }

    pub fn mtc_frame_rate(&self) -> Option<MtcFrameRate> {
        self.mtc_frame_rate
    }

    pub fn state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn sync_policy(&self) -> SyncPolicy {
        self.sync.policy()
    }

    pub fn timecode(&self) -> Timecode {
        self.timecode
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_update_granularity(&self) -> DisplayUpdateGranularity {
        self.granularity
    }

    pub fn set_display_update_granularity(&mut self, granularity: DisplayUpdateGranularity) {
        self.granularity = granularity;
    }

    /// Discards partially received quarter-frames.
    pub fn reset_qf_buffer(&mut self) {
        self.partial_pieces = [None; 8];
        self.last_piece = None;
        self.received_sync_piece = false;
        self.quarter_frames_since_sync = None;
    }

    /// Zeroes the reconstructed position.
    pub fn reset_timecode(&mut self) {
        let frame_rate = self
            .local_frame_rate
            .or_else(|| self.mtc_frame_rate.map(MtcFrameRate::direct_equivalent))
            .unwrap_or(FrameRate::Fps30);
        self.timecode = Timecode::zero(frame_rate);
        self.registers = MtcComponents::default();
        self.captured = MtcComponents::default();
        self.last_reported = None;
    }

    fn quarter_frame_in(&mut self, data: u8, now: Instant) {
        let Some(qf) = QuarterFrame::from_data_byte(data) else {
            warn!("[{}] dropping malformed quarter-frame {:#04x}", self.name, data);
            return;
        };
        let piece = qf.piece;

        if let Some(previous) = self.last_piece {
            match Direction::between(previous, piece) {
                Some(Direction::Ambiguous) => {
                    debug!(
                        "[{}] quarter-frame jump {} -> {}, resyncing",
                        self.name, previous, piece
                    );
                    self.reset_qf_buffer();
                    self.direction = Direction::Ambiguous;
                }
                Some(direction) => self.direction = direction,
                None => {}
            }
        }

        let repeated = self.last_piece == Some(piece);
        if self.received_sync_piece && !repeated {
            let count = self.quarter_frames_since_sync.get_or_insert(0);
            match self.direction {
                Direction::Forwards => *count += 1,
                Direction::Backwards => *count -= 1,
                Direction::Ambiguous => {}
            }
        }

        self.partial_pieces[usize::from(piece)] = Some(qf.nibble);

        // a component is whole once its second nibble arrives
        let completes_component = match self.direction {
            Direction::Backwards => piece % 2 == 0,
            _ => piece % 2 == 1,
        };
        if completes_component {
            self.commit_register(piece / 2);
        }
        if piece == 7 {
            self.set_mtc_frame_rate(MtcFrameRate::from_bits(qf.nibble >> 1));
        }

        let mut captured_group = false;
        if piece == 0 && self.buffer_complete() {
            self.received_sync_piece = true;
            if matches!(self.quarter_frames_since_sync, None | Some(8) | Some(-8)) {
                self.captured = self.registers;
                self.captured_direction = self.direction;
                captured_group = true;
            }
            self.quarter_frames_since_sync = Some(0);
        }

        self.last_piece = Some(piece);

        if self.buffer_complete() && self.received_sync_piece {
            self.emit_quarter_frame(piece, captured_group, now);
        }
    }

    fn emit_quarter_frame(&mut self, piece: u8, captured_group: bool, now: Instant) {
        let Some(mtc_rate) = self.mtc_frame_rate else {
            return;
        };

        let captured = to_components(&self.captured);
        let group_timecode = Timecode::from_components_wrapping(captured, mtc_rate.direct_equivalent());

        // the captured group describes a position 2 frames behind the stream
        let since_sync = self.quarter_frames_since_sync.unwrap_or(0);
        let position = if since_sync >= 0 && self.captured_direction != Direction::Backwards {
            group_timecode.add_frames(2)
        } else if since_sync < 0 && self.captured_direction == Direction::Backwards {
            group_timecode.subtract_frames(2)
        } else {
            group_timecode
        };

        let Some(timecode) = self.resolve(position.components(), piece) else {
            if let Some(state) = self.sync.incompatible_frame_rate() {
                warn!(
                    "[{}] {} cannot drive local rate {:?}",
                    self.name, mtc_rate, self.local_frame_rate
                );
                (self.state_changed)(state);
            }
            return;
        };

        self.report(timecode, MessageType::QuarterFrame);

        if captured_group {
            let observation = GroupObservation {
                at: now,
                mtc_timecode: group_timecode,
                rate: mtc_rate,
                direction: self.captured_direction,
                timecode,
            };
            if let Some(state) = self.sync.group_received(observation) {
                (self.state_changed)(state);
            }
        }
    }

    fn full_frame_in(&mut self, bytes: &[u8], now: Instant) {
        let Some(full_frame) = FullFrame::parse(bytes) else {
            warn!("[{}] dropping malformed full-frame {:02X?}", self.name, bytes);
            return;
        };

        self.set_mtc_frame_rate(full_frame.rate);
        self.reset_qf_buffer();

        let components = to_components(&full_frame.components);
        let Some(timecode) = self.resolve(components, 0) else {
            if let Some(state) = self.sync.incompatible_frame_rate() {
                (self.state_changed)(state);
            }
            return;
        };

        debug!("[{}] full-frame locate to {}", self.name, timecode);
        self.report(timecode, MessageType::FullFrame);

        let transition = if self.sync.state() == SyncState::IncompatibleFrameRate {
            self.sync.frame_rate_compatible(now, timecode)
        } else {
            self.sync.full_frame_received(now, timecode)
        };
        if let Some(state) = transition {
            (self.state_changed)(state);
        }
    }

    /// Converts MTC components plus the current piece to local timecode.
    /// `None` if the MTC rate cannot drive the local rate.
    fn resolve(&self, mtc: Components, piece: u8) -> Option<Timecode> {
        let mtc_rate = self.mtc_frame_rate?;

        match self.local_frame_rate {
            Some(local) if mtc_rate.derived_frame_rates().contains(&local) => {
                let frames = mtc_rate.scaled_frames(mtc.frames, i32::from(piece), local)?;
                Some(Timecode::from_components_wrapping(
                    Components::new(mtc.hours, mtc.minutes, mtc.seconds, frames as i32),
                    local,
                ))
            }
            Some(local) if !local.is_compatible(mtc_rate.direct_equivalent()) => None,
            _ => {
                let timecode = Timecode::from_components_wrapping(mtc, mtc_rate.direct_equivalent());
                if piece >= 4 {
                    Some(timecode.add_frames(1))
                } else {
                    Some(timecode)
                }
            }
        }
    }

    fn is_compatible(&self, mtc_rate: MtcFrameRate) -> bool {
        match self.local_frame_rate {
            None => true,
            Some(local) => {
                mtc_rate.derived_frame_rates().contains(&local)
                    || local.is_compatible(mtc_rate.direct_equivalent())
            }
        }
    }

    fn report(&mut self, timecode: Timecode, message_type: MessageType) {
        let display_needs_update = match (self.last_reported, self.granularity) {
            (None, _) => true,
            (Some(last), DisplayUpdateGranularity::Second) => {
                last.frame_rate() != timecode.frame_rate()
                    || (last.hours(), last.minutes(), last.seconds())
                        != (timecode.hours(), timecode.minutes(), timecode.seconds())
            }
            (Some(last), DisplayUpdateGranularity::Frame) => {
                last.frame_rate() != timecode.frame_rate()
                    || last.components() != timecode.components()
            }
        };

        self.timecode = timecode;
        self.last_reported = Some(timecode);
        (self.timecode_changed)(timecode, message_type, self.direction, display_needs_update);
    }

    fn set_mtc_frame_rate(&mut self, rate: MtcFrameRate) {
        if self.mtc_frame_rate == Some(rate) {
            return;
        }
        info!("[{}] receiving {}", self.name, rate);
        self.mtc_frame_rate = Some(rate);
        if let Some(handler) = self.mtc_rate_changed.as_mut() {
            handler(rate);
        }
    }

    fn buffer_complete(&self) -> bool {
        self.partial_pieces.iter().all(Option::is_some)
    }

    fn commit_register(&mut self, component: u8) {
        let low = self.partial_pieces[usize::from(component * 2)].unwrap_or(0);
        let high = self.partial_pieces[usize::from(component * 2 + 1)].unwrap_or(0);
        let (mask, register) = match component {
            0 => (0b1, &mut self.registers.frames),
            1 => (0b11, &mut self.registers.seconds),
            2 => (0b11, &mut self.registers.minutes),
            _ => (0b1, &mut self.registers.hours),
        };
        *register = i32::from(low | ((high & mask) << 4));
    }
}

fn to_components(mtc: &MtcComponents) -> Components {
    Components::new(mtc.hours, mtc.minutes, mtc.seconds, mtc.frames)
}
