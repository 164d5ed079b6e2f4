use super::frame_rate::MtcFrameRate;
use super::message::{FullFrame, MtcComponents, QuarterFrame};
use crate::timecode::{Components, FrameRate, Timecode};
use log::debug;

/// Whether `locate` transmits a full-frame message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullFrameBehavior {
    /// Always transmit
    Always,
    /// Transmit only if the full-frame differs from the last one transmitted
    #[default]
    IfDifferent,
    /// Never transmit
    Never,
}

impl std::str::FromStr for FullFrameBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "always" => Ok(FullFrameBehavior::Always),
            "if-different" | "ifdifferent" => Ok(FullFrameBehavior::IfDifferent),
            "never" => Ok(FullFrameBehavior::Never),
            other => Err(format!(
                "unknown locate behavior '{}' (expected always, if-different or never)",
                other
            )),
        }
    }
}

type MidiOutHandler = Box<dyn FnMut(&[u8]) + Send>;
type LocateHandler = Box<dyn FnMut(Timecode, bool) + Send>;

/// Produces the MTC byte stream for a running or locating timecode position.
///
/// The encoder holds the position as raw MTC values plus a quarter-frame
/// cursor. Calling [`increment`](Self::increment) at the quarter-frame rate
/// produces a forward stream, [`decrement`](Self::decrement) a reverse one.
/// Not thread-safe; drive each instance from a single thread.
pub struct MtcEncoder {
    name: String,
    midi_out: MidiOutHandler,
    locate_handler: Option<LocateHandler>,

    components: MtcComponents,
    mtc_frame_rate: MtcFrameRate,
    mtc_quarter_frame: u8,
    local_frame_rate: FrameRate,

    locate_behavior: FullFrameBehavior,
    last_transmit_full_frame: Option<Timecode>,
    last_located: Option<Components>,

    // set once the first quarter-frame after a locate has been sent
    quarter_frames_started: bool,
    running: bool,
}

impl MtcEncoder {
    pub fn new<F>(name: impl Into<String>, midi_out: F) -> Self
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        MtcEncoder {
            name: name.into(),
            midi_out: Box::new(midi_out),
            locate_handler: None,
            components: MtcComponents::default(),
            mtc_frame_rate: MtcFrameRate::Mtc30,
            mtc_quarter_frame: 0,
            local_frame_rate: FrameRate::Fps30,
            locate_behavior: FullFrameBehavior::default(),
            last_transmit_full_frame: None,
            last_located: None,
            quarter_frames_started: false,
            running: false,
        }
    }

    /// Called after a locate that transmitted a full-frame, with whether the
    /// located position differs from the previously located one.
    pub fn set_locate_handler<F>(&mut self, handler: F)
    where
        F: FnMut(Timecode, bool) + Send + 'static,
    {
        self.locate_handler = Some(Box::new(handler));
    }

    /// Locates using the configured [`FullFrameBehavior`].
    pub fn locate(&mut self, timecode: Timecode) {
        self.locate_with_behavior(timecode, self.locate_behavior);
    }

    /// Locates to `timecode`, adopting its frame rate. Subframes are discarded.
    pub fn locate_with_behavior(&mut self, timecode: Timecode, transmit_full_frame: FullFrameBehavior) {
        let timecode = timecode.without_subframes();

        self.local_frame_rate = timecode.frame_rate();
        self.mtc_frame_rate = self.local_frame_rate.mtc_frame_rate();

        let (raw_frames, quarter_frames) = self
            .local_frame_rate
            .mtc_scaled_frames(f64::from(timecode.frames()));

        self.components = MtcComponents::new(
            timecode.hours() as i32,
            timecode.minutes() as i32,
            timecode.seconds() as i32,
            raw_frames,
        );
        self.mtc_quarter_frame = quarter_frames;
        self.quarter_frames_started = false;

        debug!(
            "[{}] located to {} ({} frames {} qf {})",
            self.name, timecode, self.mtc_frame_rate, raw_frames, quarter_frames
        );

        let full_frame = self.full_frame_timecode();
        let transmit = match transmit_full_frame {
            FullFrameBehavior::Always => true,
            FullFrameBehavior::IfDifferent => self.last_transmit_full_frame != Some(full_frame),
            FullFrameBehavior::Never => false,
        };

        if !transmit {
            return;
        }

        self.transmit_full_frame(full_frame);

        let position = timecode.components();
        let display_needs_update = self.last_located != Some(position);
        self.last_located = Some(position);
        if let Some(handler) = self.locate_handler.as_mut() {
            handler(timecode, display_needs_update);
        }
    }

    /// Locates to `now` without a full-frame and marks the encoder running.
    ///
    /// Call at the moment `now` occurs. The caller is responsible for aligning
    /// the first [`increment`](Self::increment) with the next quarter-frame.
    pub fn start(&mut self, now: Timecode) {
        self.locate_with_behavior(now, FullFrameBehavior::Never);
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Sends the next quarter-frame, advancing 2 MTC frames after piece 7.
    ///
    /// The first call after a locate sends the located quarter-frame as is.
    pub fn increment(&mut self) {
        if self.quarter_frames_started {
            if self.mtc_quarter_frame < 7 {
                self.mtc_quarter_frame += 1;
            } else {
                self.components = self.offset_components(2);
                self.mtc_quarter_frame = 0;
            }
        }

        self.transmit_quarter_frame();
        self.quarter_frames_started = true;
    }

    /// Sends the previous quarter-frame, retreating 2 MTC frames before piece 0.
    pub fn decrement(&mut self) {
        if self.quarter_frames_started {
            if self.mtc_quarter_frame > 0 {
                self.mtc_quarter_frame -= 1;
            } else {
                self.components = self.offset_components(-2);
                self.mtc_quarter_frame = 7;
            }
        }

        self.transmit_quarter_frame();
        self.quarter_frames_started = true;
    }

    /// Current position scaled back up to the local frame rate.
    pub fn timecode(&self) -> Timecode {
        let frames = self
            .mtc_frame_rate
            .scaled_frames(
                self.components.frames,
                i32::from(self.mtc_quarter_frame),
                self.local_frame_rate,
            )
            .unwrap_or(f64::from(self.components.frames));

        Timecode::from_components_wrapping(
            Components::new(
                self.components.hours,
                self.components.minutes,
                self.components.seconds,
                frames as i32,
            ),
            self.local_frame_rate,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mtc_quarter_frame(&self) -> u8 {
        self.mtc_quarter_frame
    }

    pub fn mtc_components(&self) -> MtcComponents {
        self.components
    }

    pub fn mtc_frame_rate(&self) -> MtcFrameRate {
        self.mtc_frame_rate
    }

    pub fn local_frame_rate(&self) -> FrameRate {
        self.local_frame_rate
    }

    pub fn locate_behavior(&self) -> FullFrameBehavior {
        self.locate_behavior
    }

    pub fn set_locate_behavior(&mut self, behavior: FullFrameBehavior) {
        self.locate_behavior = behavior;
    }

    /// Last full-frame transmitted, at the MTC rate's direct equivalent.
    /// Cleared by any quarter-frame transmission.
    pub fn last_transmit_full_frame(&self) -> Option<Timecode> {
        self.last_transmit_full_frame
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn mtc_timecode(&self) -> Timecode {
        let c = &self.components;
        Timecode::from_components_wrapping(
            Components::new(c.hours, c.minutes, c.seconds, c.frames),
            self.mtc_frame_rate.direct_equivalent(),
        )
    }

    fn offset_components(&self, frames: i64) -> MtcComponents {
        to_mtc_components(&self.mtc_timecode().add_frames(frames))
    }

    // full-frames round to the nearest MTC frame
    fn full_frame_timecode(&self) -> Timecode {
        let timecode = self.mtc_timecode();
        if self.mtc_quarter_frame >= 4 {
            timecode.add_frames(1)
        } else {
            timecode
        }
    }

    fn transmit_full_frame(&mut self, timecode: Timecode) {
        let message = FullFrame::new(to_mtc_components(&timecode), self.mtc_frame_rate);
        (self.midi_out)(&message.to_bytes());
        self.last_transmit_full_frame = Some(timecode);
    }

    fn transmit_quarter_frame(&mut self) {
        let message =
            QuarterFrame::for_piece(&self.components, self.mtc_frame_rate, self.mtc_quarter_frame);
        (self.midi_out)(&message.to_bytes());
        self.last_transmit_full_frame = None;
    }
}

fn to_mtc_components(timecode: &Timecode) -> MtcComponents {
    MtcComponents::new(
        timecode.hours() as i32,
        timecode.minutes() as i32,
        timecode.seconds() as i32,
        timecode.frames() as i32,
    )
}
