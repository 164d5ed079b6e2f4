//! MTC wire format.
//!
//! Quarter-frame: `F1 0nnn dddd` where `nnn` is the piece index and `dddd`
//! the data nibble. Full-frame: universal real-time SysEx
//! `F0 7F <device> 01 01 <0rrhhhhh> <mm> <ss> <ff> F7`.

use super::frame_rate::MtcFrameRate;

pub const QUARTER_FRAME_STATUS: u8 = 0xF1;
pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;
pub const UNIVERSAL_REAL_TIME: u8 = 0x7F;
pub const ALL_CALL_DEVICE_ID: u8 = 0x7F;
pub const FULL_FRAME_LEN: usize = 10;

/// Raw MTC timecode values, exactly as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MtcComponents {
    pub hours: i32,
    pub minutes: i32,
    pub seconds: i32,
    pub frames: i32,
}

impl MtcComponents {
    pub fn new(hours: i32, minutes: i32, seconds: i32, frames: i32) -> Self {
        MtcComponents {
            hours,
            minutes,
            seconds,
            frames,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuarterFrame {
    pub piece: u8,
    pub nibble: u8,
}

impl QuarterFrame {
    /// Splits a quarter-frame data byte. Returns `None` if bit 7 is set.
    pub fn from_data_byte(data: u8) -> Option<Self> {
        if data & 0x80 != 0 {
            return None;
        }
        Some(QuarterFrame {
            piece: (data >> 4) & 0b111,
            nibble: data & 0x0F,
        })
    }

    /// Builds the piece of `components` at `piece` (`0..=7`).
    pub fn for_piece(components: &MtcComponents, rate: MtcFrameRate, piece: u8) -> Self {
        let frames = components.frames as u8;
        let seconds = components.seconds as u8;
        let minutes = components.minutes as u8;
        let hours = components.hours as u8;

        let nibble = match piece & 0b111 {
            0 => frames & 0x0F,
            1 => (frames >> 4) & 0b1,
            2 => seconds & 0x0F,
            3 => (seconds >> 4) & 0b11,
            4 => minutes & 0x0F,
            5 => (minutes >> 4) & 0b11,
            6 => hours & 0x0F,
            _ => ((hours >> 4) & 0b1) | (rate.bits() << 1),
        };

        QuarterFrame {
            piece: piece & 0b111,
            nibble,
        }
    }

    pub fn data_byte(&self) -> u8 {
        (self.piece << 4) | (self.nibble & 0x0F)
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        [QUARTER_FRAME_STATUS, self.data_byte()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullFrame {
    pub components: MtcComponents,
    pub rate: MtcFrameRate,
    pub device_id: u8,
}

impl FullFrame {
    pub fn new(components: MtcComponents, rate: MtcFrameRate) -> Self {
        FullFrame {
            components,
            rate,
            device_id: ALL_CALL_DEVICE_ID,
        }
    }

    pub fn to_bytes(&self) -> [u8; FULL_FRAME_LEN] {
        let c = &self.components;
        [
            SYSEX_START,
            UNIVERSAL_REAL_TIME,
            self.device_id & 0x7F,
            0x01,
            0x01,
            ((c.hours as u8) & 0b1_1111) | (self.rate.bits() << 5),
            (c.minutes as u8) & 0x7F,
            (c.seconds as u8) & 0x7F,
            (c.frames as u8) & 0x7F,
            SYSEX_END,
        ]
    }

    pub fn parse(data: &[u8]) -> Option<Self> {
        match *data {
            [SYSEX_START, UNIVERSAL_REAL_TIME, device_id, 0x01, 0x01, hours, minutes, seconds, frames, SYSEX_END] => {
                Some(FullFrame {
                    components: MtcComponents::new(
                        i32::from(hours & 0b1_1111),
                        i32::from(minutes),
                        i32::from(seconds),
                        i32::from(frames),
                    ),
                    rate: MtcFrameRate::from_bits(hours >> 5),
                    device_id,
                })
            }
            _ => None,
        }
    }
}

/// An MTC event demultiplexed from the MIDI byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawMtcMessage {
    /// The data byte following `F1`
    QuarterFrame(u8),
    /// Complete SysEx buffer, `F0` through `F7`
    FullFrame(Vec<u8>),
}

impl RawMtcMessage {
    /// Picks MTC events out of a raw MIDI buffer. Everything else is `None`.
    pub fn classify(data: &[u8]) -> Option<Self> {
        match data {
            [QUARTER_FRAME_STATUS, byte] if byte & 0x80 == 0 => {
                Some(RawMtcMessage::QuarterFrame(*byte))
            }
            _ if FullFrame::parse(data).is_some() => Some(RawMtcMessage::FullFrame(data.to_vec())),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            RawMtcMessage::QuarterFrame(byte) => vec![QUARTER_FRAME_STATUS, *byte],
            RawMtcMessage::FullFrame(bytes) => bytes.clone(),
        }
    }
}
