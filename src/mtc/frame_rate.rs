use crate::timecode::FrameRate;
use std::fmt;

/// The four base rates MTC can describe in its 2-bit rate code.
///
/// Every other frame rate is transmitted as one of these and scaled back up
/// by the receiver, e.g. 01:00:00:30 @ 60fps goes out as 01:00:00:15 @ 30fps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MtcFrameRate {
    Mtc24,
    Mtc25,
    Mtc2997d,
    Mtc30,
}

impl MtcFrameRate {
    pub const ALL: [MtcFrameRate; 4] = [
        MtcFrameRate::Mtc24,
        MtcFrameRate::Mtc25,
        MtcFrameRate::Mtc2997d,
        MtcFrameRate::Mtc30,
    ];

    /// Decodes the `rr` bits of the hours byte. Only the low 2 bits are read.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => MtcFrameRate::Mtc24,
            0b01 => MtcFrameRate::Mtc25,
            0b10 => MtcFrameRate::Mtc2997d,
            _ => MtcFrameRate::Mtc30,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            MtcFrameRate::Mtc24 => 0b00,
            MtcFrameRate::Mtc25 => 0b01,
            MtcFrameRate::Mtc2997d => 0b10,
            MtcFrameRate::Mtc30 => 0b11,
        }
    }

    pub fn fps_value_for_scaling(self) -> f64 {
        match self {
            MtcFrameRate::Mtc24 => 24.0,
            MtcFrameRate::Mtc25 => 25.0,
            MtcFrameRate::Mtc2997d | MtcFrameRate::Mtc30 => 30.0,
        }
    }

    /// The local rate the MTC values can be read as without scaling.
    pub fn direct_equivalent(self) -> FrameRate {
        match self {
            MtcFrameRate::Mtc24 => FrameRate::Fps24,
            MtcFrameRate::Mtc25 => FrameRate::Fps25,
            MtcFrameRate::Mtc2997d => FrameRate::Fps29_97d,
            MtcFrameRate::Mtc30 => FrameRate::Fps30,
        }
    }

    /// Local rates that are carried over this MTC rate.
    pub fn derived_frame_rates(self) -> &'static [FrameRate] {
        use FrameRate::*;
        match self {
            MtcFrameRate::Mtc24 => &[
                Fps23_976, Fps24, Fps24_98, Fps47_952, Fps48, Fps95_904, Fps96,
            ],
            MtcFrameRate::Mtc25 => &[Fps25, Fps50, Fps100],
            MtcFrameRate::Mtc2997d => &[Fps29_97d, Fps30d, Fps59_94d, Fps60d, Fps119_88d, Fps120d],
            MtcFrameRate::Mtc30 => &[Fps29_97, Fps30, Fps59_94, Fps60, Fps119_88, Fps120],
        }
    }

    pub fn string_value(self) -> &'static str {
        match self {
            MtcFrameRate::Mtc24 => "SMPTE-24",
            MtcFrameRate::Mtc25 => "SMPTE-25",
            MtcFrameRate::Mtc2997d => "SMPTE-29.97d",
            MtcFrameRate::Mtc30 => "SMPTE-30",
        }
    }

    /// Scales raw MTC frames plus elapsed quarter-frames up to frames at `to_rate`.
    ///
    /// Returns `None` when `to_rate` is not carried over this MTC rate. Frame
    /// values below zero are clamped to zero and quarter-frames to `0..=7`.
    pub fn scaled_frames(self, raw_frames: i32, quarter_frames: i32, to_rate: FrameRate) -> Option<f64> {
        if !self.derived_frame_rates().contains(&to_rate) {
            return None;
        }

        let raw_frames = f64::from(raw_frames.max(0));
        let fraction = f64::from(quarter_frames.clamp(0, 7)) * 0.25;

        if self.direct_equivalent() == to_rate {
            return Some(raw_frames + fraction);
        }

        Some((raw_frames + fraction) * to_rate.mtc_scale_factor())
    }
}

impl fmt::Display for MtcFrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.string_value())
    }
}

impl FrameRate {
    /// The MTC base rate this rate is transmitted as.
    pub fn mtc_frame_rate(self) -> MtcFrameRate {
        use FrameRate::*;
        match self {
            Fps23_976 | Fps24 | Fps24_98 | Fps47_952 | Fps48 | Fps95_904 | Fps96 => {
                MtcFrameRate::Mtc24
            }
            Fps25 | Fps50 | Fps100 => MtcFrameRate::Mtc25,
            Fps29_97d | Fps30d | Fps59_94d | Fps60d | Fps119_88d | Fps120d => {
                MtcFrameRate::Mtc2997d
            }
            Fps29_97 | Fps30 | Fps59_94 | Fps60 | Fps119_88 | Fps120 => MtcFrameRate::Mtc30,
        }
    }

    /// Ratio of local frames to MTC frames.
    pub fn mtc_scale_factor(self) -> f64 {
        match self {
            FrameRate::Fps24_98 => 25.0 / 24.0,
            rate => f64::from(rate.mtc_integer_scale()),
        }
    }

    /// Whole-number speed multiple over the MTC carrier (1, 2 or 4).
    pub fn mtc_integer_scale(self) -> u32 {
        use FrameRate::*;
        match self {
            Fps47_952 | Fps48 | Fps50 | Fps59_94 | Fps59_94d | Fps60 | Fps60d => 2,
            Fps95_904 | Fps96 | Fps100 | Fps119_88 | Fps119_88d | Fps120 | Fps120d => 4,
            _ => 1,
        }
    }

    pub fn derived_frame_rates(self) -> &'static [FrameRate] {
        self.mtc_frame_rate().derived_frame_rates()
    }

    /// Scales local frames (with fraction) down to raw MTC frames and
    /// elapsed quarter-frames within the 2-frame quarter-frame group.
    pub fn mtc_scaled_frames(self, timecode_frames: f64) -> (i32, u8) {
        // 24.98 is carried as MTC-24 and otherwise rounds down into the previous quarter-frame
        let scale = match self {
            FrameRate::Fps24_98 => self.mtc_scale_factor() - 0.001,
            _ => self.mtc_scale_factor(),
        };

        let scaled = timecode_frames / scale;
        let fraction = scaled % 2.0;

        let raw_frames = (scaled - fraction) as i32;
        let quarter_frames = (fraction / 0.25) as u8;

        (raw_frames, quarter_frames)
    }

    /// Interval between quarter-frame messages when running in real time.
    pub fn mtc_quarter_frame_interval(self) -> std::time::Duration {
        self.frame_duration() * self.mtc_integer_scale() / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_round_trip() {
        for rate in MtcFrameRate::ALL {
            assert_eq!(MtcFrameRate::from_bits(rate.bits()), rate);
        }
    }

    #[test]
    fn test_quarter_frame_interval() {
        assert_eq!(
            FrameRate::Fps48.mtc_quarter_frame_interval(),
            FrameRate::Fps24.mtc_quarter_frame_interval()
        );
        assert_eq!(
            FrameRate::Fps25.mtc_quarter_frame_interval(),
            std::time::Duration::from_millis(10)
        );
    }
}
