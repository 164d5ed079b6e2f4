use super::TimecodeError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Real-world timecode frame rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameRate {
    Fps23_976,
    Fps24,
    Fps24_98,
    Fps25,
    Fps29_97,
    Fps29_97d,
    Fps30,
    Fps30d,
    Fps47_952,
    Fps48,
    Fps50,
    Fps59_94,
    Fps59_94d,
    Fps60,
    Fps60d,
    Fps95_904,
    Fps96,
    Fps100,
    Fps119_88,
    Fps119_88d,
    Fps120,
    Fps120d,
}

/// Families of rates whose H:MM:SS values stay aligned with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompatibleGroup {
    Ntsc,
    NtscDrop,
    Atsc,
    AtscDrop,
}

impl CompatibleGroup {
    pub fn rates(self) -> &'static [FrameRate] {
        use FrameRate::*;
        match self {
            CompatibleGroup::Ntsc => &[
                Fps23_976, Fps29_97, Fps47_952, Fps59_94, Fps95_904, Fps119_88,
            ],
            CompatibleGroup::NtscDrop => &[Fps29_97d, Fps59_94d, Fps119_88d],
            CompatibleGroup::Atsc => &[
                Fps24, Fps24_98, Fps25, Fps30, Fps48, Fps50, Fps60, Fps96, Fps100, Fps120,
            ],
            CompatibleGroup::AtscDrop => &[Fps30d, Fps60d, Fps120d],
        }
    }
}

impl FrameRate {
    pub const ALL: [FrameRate; 22] = [
        FrameRate::Fps23_976,
        FrameRate::Fps24,
        FrameRate::Fps24_98,
        FrameRate::Fps25,
        FrameRate::Fps29_97,
        FrameRate::Fps29_97d,
        FrameRate::Fps30,
        FrameRate::Fps30d,
        FrameRate::Fps47_952,
        FrameRate::Fps48,
        FrameRate::Fps50,
        FrameRate::Fps59_94,
        FrameRate::Fps59_94d,
        FrameRate::Fps60,
        FrameRate::Fps60d,
        FrameRate::Fps95_904,
        FrameRate::Fps96,
        FrameRate::Fps100,
        FrameRate::Fps119_88,
        FrameRate::Fps119_88d,
        FrameRate::Fps120,
        FrameRate::Fps120d,
    ];

    /// Number of frames counted per timecode second.
    pub fn nominal_fps(self) -> u32 {
        use FrameRate::*;
        match self {
            Fps23_976 | Fps24 => 24,
            Fps24_98 | Fps25 => 25,
            Fps29_97 | Fps29_97d | Fps30 | Fps30d => 30,
            Fps47_952 | Fps48 => 48,
            Fps50 => 50,
            Fps59_94 | Fps59_94d | Fps60 | Fps60d => 60,
            Fps95_904 | Fps96 => 96,
            Fps100 => 100,
            Fps119_88 | Fps119_88d | Fps120 | Fps120d => 120,
        }
    }

    pub fn is_drop(self) -> bool {
        use FrameRate::*;
        matches!(
            self,
            Fps29_97d | Fps30d | Fps59_94d | Fps60d | Fps119_88d | Fps120d
        )
    }

    pub fn frames_dropped_per_minute(self) -> u32 {
        if self.is_drop() {
            2 * self.nominal_fps() / 30
        } else {
            0
        }
    }

    /// Real frames per second as `(numerator, denominator)`.
    pub fn rate(self) -> (u64, u64) {
        use FrameRate::*;
        let fps = u64::from(self.nominal_fps());
        match self {
            Fps24 | Fps25 | Fps30 | Fps48 | Fps50 | Fps60 | Fps96 | Fps100 | Fps120 => (fps, 1),
            _ => (fps * 1000, 1001),
        }
    }

    /// Real-time duration of a single frame.
    pub fn frame_duration(self) -> Duration {
        let (num, den) = self.rate();
        Duration::from_nanos(den * 1_000_000_000 / num)
    }

    /// Total frame count of a 24 hour day.
    pub fn max_frames_per_day(self) -> i64 {
        let fps = i64::from(self.nominal_fps());
        let drop = i64::from(self.frames_dropped_per_minute());
        let minutes = 24 * 60;
        minutes * 60 * fps - drop * (minutes - minutes / 10)
    }

    pub fn compatible_group(self) -> CompatibleGroup {
        use FrameRate::*;
        match self {
            Fps23_976 | Fps29_97 | Fps47_952 | Fps59_94 | Fps95_904 | Fps119_88 => {
                CompatibleGroup::Ntsc
            }
            Fps29_97d | Fps59_94d | Fps119_88d => CompatibleGroup::NtscDrop,
            Fps30d | Fps60d | Fps120d => CompatibleGroup::AtscDrop,
            _ => CompatibleGroup::Atsc,
        }
    }

    pub fn compatible_group_rates(self) -> &'static [FrameRate] {
        self.compatible_group().rates()
    }

    pub fn is_compatible(self, other: FrameRate) -> bool {
        self.compatible_group() == other.compatible_group()
    }

    pub fn name(self) -> &'static str {
        use FrameRate::*;
        match self {
            Fps23_976 => "23.976",
            Fps24 => "24",
            Fps24_98 => "24.98",
            Fps25 => "25",
            Fps29_97 => "29.97",
            Fps29_97d => "29.97d",
            Fps30 => "30",
            Fps30d => "30d",
            Fps47_952 => "47.952",
            Fps48 => "48",
            Fps50 => "50",
            Fps59_94 => "59.94",
            Fps59_94d => "59.94d",
            Fps60 => "60",
            Fps60d => "60d",
            Fps95_904 => "95.904",
            Fps96 => "96",
            Fps100 => "100",
            Fps119_88 => "119.88",
            Fps119_88d => "119.88d",
            Fps120 => "120",
            Fps120d => "120d",
        }
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}fps", self.name())
    }
}

impl FromStr for FrameRate {
    type Err = TimecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_ascii_lowercase()
            .trim_end_matches("fps")
            .replace("drop", "d")
            .replace(&['.', ' '][..], "");

        FrameRate::ALL
            .iter()
            .copied()
            .find(|rate| rate.name().replace('.', "") == normalized)
            .ok_or_else(|| TimecodeError::UnknownFrameRate(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_common_spellings() {
        assert_eq!("29.97d".parse::<FrameRate>().unwrap(), FrameRate::Fps29_97d);
        assert_eq!("2997d".parse::<FrameRate>().unwrap(), FrameRate::Fps29_97d);
        assert_eq!("29.97 drop".parse::<FrameRate>().unwrap(), FrameRate::Fps29_97d);
        assert_eq!("24fps".parse::<FrameRate>().unwrap(), FrameRate::Fps24);
        assert_eq!("59.94".parse::<FrameRate>().unwrap(), FrameRate::Fps59_94);
        assert!("31".parse::<FrameRate>().is_err());
    }

    #[test]
    fn test_frame_duration() {
        assert_eq!(FrameRate::Fps25.frame_duration(), Duration::from_millis(40));
        assert_eq!(
            FrameRate::Fps29_97.frame_duration(),
            Duration::from_nanos(33_366_666)
        );
    }
}
