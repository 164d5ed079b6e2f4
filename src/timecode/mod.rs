//! SMPTE timecode values
//!
//! A [`Timecode`] is a position within a 24 hour day at a given [`FrameRate`].
//! Arithmetic wraps at the day boundary in both directions, and drop-frame
//! rates skip the frame numbers SMPTE drop-frame counting skips.

mod frame_rate;

pub use frame_rate::{CompatibleGroup, FrameRate};

use std::cmp::Ordering;
use std::error::Error;
use std::fmt;

pub const SUBFRAME_DIVISOR: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimecodeError {
    /// A component is outside the range allowed at the frame rate
    OutOfRange { field: &'static str, value: i64 },
    /// Frame number skipped by drop-frame counting
    DroppedFrame { minutes: u32, frames: u32 },
    /// Timecode string could not be parsed
    Parse(String),
    /// Frame rate name not recognised
    UnknownFrameRate(String),
}

impl fmt::Display for TimecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimecodeError::OutOfRange { field, value } => {
                write!(f, "timecode {} out of range: {}", field, value)
            }
            TimecodeError::DroppedFrame { minutes, frames } => write!(
                f,
                "frame {} does not exist at minute {} in drop-frame timecode",
                frames, minutes
            ),
            TimecodeError::Parse(text) => write!(f, "invalid timecode string: {}", text),
            TimecodeError::UnknownFrameRate(text) => write!(f, "unknown frame rate: {}", text),
        }
    }
}

impl Error for TimecodeError {}

/// Loose timecode components. Values may be out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Components {
    pub hours: i32,
    pub minutes: i32,
    pub seconds: i32,
    pub frames: i32,
    pub subframes: i32,
}

impl Components {
    pub fn new(hours: i32, minutes: i32, seconds: i32, frames: i32) -> Self {
        Components {
            hours,
            minutes,
            seconds,
            frames,
            subframes: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timecode {
    hours: u32,
    minutes: u32,
    seconds: u32,
    frames: u32,
    subframes: u32,
    frame_rate: FrameRate,
}

impl Timecode {
    pub fn new(
        hours: u32,
        minutes: u32,
        seconds: u32,
        frames: u32,
        frame_rate: FrameRate,
    ) -> Result<Self, TimecodeError> {
        Self::with_subframes(hours, minutes, seconds, frames, 0, frame_rate)
    }

    pub fn with_subframes(
        hours: u32,
        minutes: u32,
        seconds: u32,
        frames: u32,
        subframes: u32,
        frame_rate: FrameRate,
    ) -> Result<Self, TimecodeError> {
        check_range("hours", hours, 24)?;
        check_range("minutes", minutes, 60)?;
        check_range("seconds", seconds, 60)?;
        check_range("frames", frames, frame_rate.nominal_fps())?;
        check_range("subframes", subframes, SUBFRAME_DIVISOR)?;

        if seconds == 0 && minutes % 10 != 0 && frames < frame_rate.frames_dropped_per_minute() {
            return Err(TimecodeError::DroppedFrame { minutes, frames });
        }

        Ok(Timecode {
            hours,
            minutes,
            seconds,
            frames,
            subframes,
            frame_rate,
        })
    }

    pub fn zero(frame_rate: FrameRate) -> Self {
        Timecode {
            hours: 0,
            minutes: 0,
            seconds: 0,
            frames: 0,
            subframes: 0,
            frame_rate,
        }
    }

    /// Builds a timecode from an absolute frame count, wrapping at 24 hours.
    pub fn from_frame_count(count: i64, frame_rate: FrameRate) -> Self {
        let mut count = count.rem_euclid(frame_rate.max_frames_per_day());
        let fps = i64::from(frame_rate.nominal_fps());
        let drop = i64::from(frame_rate.frames_dropped_per_minute());

        if drop > 0 {
            let frames_per_10_minutes = fps * 600 - drop * 9;
            let frames_per_minute = fps * 60 - drop;
            let tens = count / frames_per_10_minutes;
            let remainder = count % frames_per_10_minutes;
            count += drop * 9 * tens;
            if remainder > drop {
                count += drop * ((remainder - drop) / frames_per_minute);
            }
        }

        Timecode {
            hours: (count / (fps * 3600)) as u32,
            minutes: ((count / (fps * 60)) % 60) as u32,
            seconds: ((count / fps) % 60) as u32,
            frames: (count % fps) as u32,
            subframes: 0,
            frame_rate,
        }
    }

    /// Normalizes possibly overflowing components by way of the frame count.
    pub fn from_components_wrapping(components: Components, frame_rate: FrameRate) -> Self {
        let count = components_to_frame_count(&components, frame_rate);
        let mut timecode = Self::from_frame_count(count, frame_rate);
        timecode.subframes = components.subframes.clamp(0, SUBFRAME_DIVISOR as i32 - 1) as u32;
        timecode
    }

    /// Parses `HH:MM:SS:FF` (or `HH:MM:SS;FF`), with optional `.SF` subframes.
    pub fn parse(text: &str, frame_rate: FrameRate) -> Result<Self, TimecodeError> {
        let parse_err = || TimecodeError::Parse(text.to_string());

        let (main, subframes) = match text.trim().split_once('.') {
            Some((main, sub)) => (main, sub.parse::<u32>().map_err(|_| parse_err())?),
            None => (text.trim(), 0),
        };

        let fields = main
            .split(|c| c == ':' || c == ';')
            .map(|field| field.parse::<u32>().map_err(|_| parse_err()))
            .collect::<Result<Vec<_>, _>>()?;

        match fields.as_slice() {
            [h, m, s, f] => Self::with_subframes(*h, *m, *s, *f, subframes, frame_rate),
            _ => Err(parse_err()),
        }
    }

    pub fn frame_count(&self) -> i64 {
        components_to_frame_count(&self.components(), self.frame_rate)
    }

    pub fn components(&self) -> Components {
        Components {
            hours: self.hours as i32,
            minutes: self.minutes as i32,
            seconds: self.seconds as i32,
            frames: self.frames as i32,
            subframes: self.subframes as i32,
        }
    }

    pub fn add_frames(&self, frames: i64) -> Self {
        let mut timecode = Self::from_frame_count(self.frame_count() + frames, self.frame_rate);
        timecode.subframes = self.subframes;
        timecode
    }

    pub fn subtract_frames(&self, frames: i64) -> Self {
        self.add_frames(-frames)
    }

    pub fn without_subframes(&self) -> Self {
        Timecode {
            subframes: 0,
            ..*self
        }
    }

    /// The frame at the same real time at another frame rate (rounded down).
    pub fn converted(&self, frame_rate: FrameRate) -> Self {
        if frame_rate == self.frame_rate {
            return *self;
        }
        let (from_num, from_den) = self.frame_rate.rate();
        let (to_num, to_den) = frame_rate.rate();
        let count = i128::from(self.frame_count()) * i128::from(from_den) * i128::from(to_num)
            / (i128::from(from_num) * i128::from(to_den));
        Self::from_frame_count(count as i64, frame_rate)
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn subframes(&self) -> u32 {
        self.subframes
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }
}

fn check_range(field: &'static str, value: u32, limit: u32) -> Result<(), TimecodeError> {
    if value >= limit {
        return Err(TimecodeError::OutOfRange {
            field,
            value: i64::from(value),
        });
    }
    Ok(())
}

fn components_to_frame_count(c: &Components, frame_rate: FrameRate) -> i64 {
    let fps = i64::from(frame_rate.nominal_fps());
    let drop = i64::from(frame_rate.frames_dropped_per_minute());
    let total_minutes = 60 * i64::from(c.hours) + i64::from(c.minutes);
    let total_seconds = 60 * total_minutes + i64::from(c.seconds);

    total_seconds * fps + i64::from(c.frames)
        - drop * (total_minutes - total_minutes.div_euclid(10))
}

impl PartialOrd for Timecode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timecode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frame_count()
            .cmp(&other.frame_count())
            .then(self.subframes.cmp(&other.subframes))
            .then(self.frame_rate.cmp(&other.frame_rate))
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.frame_rate.is_drop() { ';' } else { ':' };
        let width = if self.frame_rate.nominal_fps() >= 100 { 3 } else { 2 };
        write!(
            f,
            "{:02}:{:02}:{:02}{}{:0width$}",
            self.hours,
            self.minutes,
            self.seconds,
            separator,
            self.frames,
            width = width
        )?;
        if self.subframes > 0 {
            write!(f, ".{:02}", self.subframes)?;
        }
        Ok(())
    }
}
