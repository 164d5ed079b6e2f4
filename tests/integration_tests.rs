//! Encoder output looped straight back into a decoder.

use mtcsyncrs::mtc::{
    Direction, FullFrameBehavior, MtcDecoder, MtcEncoder, MtcFrameRate, RawMtcMessage,
    SyncPolicy, SyncState,
};
use mtcsyncrs::timecode::{FrameRate, Timecode};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct Loopback {
    encoder: MtcEncoder,
    decoder: MtcDecoder,
    wire: Arc<Mutex<Vec<Vec<u8>>>>,
    reported: Arc<Mutex<Option<(Timecode, Direction)>>>,
    now: Instant,
    step: Duration,
}

impl Loopback {
    fn new(local_frame_rate: Option<FrameRate>) -> Self {
        let wire: Arc<Mutex<Vec<Vec<u8>>>> = Arc::default();
        let sink = wire.clone();
        let encoder = MtcEncoder::new("loop-out", move |bytes: &[u8]| {
            sink.lock().unwrap().push(bytes.to_vec());
        });

        let reported: Arc<Mutex<Option<(Timecode, Direction)>>> = Arc::default();
        let report_sink = reported.clone();
        let decoder = MtcDecoder::new(
            "loop-in",
            local_frame_rate,
            SyncPolicy::default(),
            move |timecode, _, direction, _| {
                *report_sink.lock().unwrap() = Some((timecode, direction))
            },
            |_| {},
        );

        Loopback {
            encoder,
            decoder,
            wire,
            reported,
            now: Instant::now(),
            step: FrameRate::Fps30.mtc_quarter_frame_interval(),
        }
    }

    fn locate(&mut self, timecode: Timecode, behavior: FullFrameBehavior) {
        self.step = timecode.frame_rate().mtc_quarter_frame_interval();
        self.encoder.locate_with_behavior(timecode, behavior);
        self.deliver();
    }

    fn increment(&mut self) {
        self.encoder.increment();
        self.deliver();
    }

    fn decrement(&mut self) {
        self.encoder.decrement();
        self.deliver();
    }

    fn deliver(&mut self) {
        let messages: Vec<RawMtcMessage> = self
            .wire
            .lock()
            .unwrap()
            .drain(..)
            .filter_map(|bytes| RawMtcMessage::classify(&bytes))
            .collect();
        self.decoder.midi_in_at(&messages, self.now);
        self.now += self.step;
    }

    fn reported(&self) -> Option<Timecode> {
        self.reported.lock().unwrap().map(|(timecode, _)| timecode)
    }

    fn reported_direction(&self) -> Option<Direction> {
        self.reported.lock().unwrap().map(|(_, direction)| direction)
    }

    /// Positive counts increment, negative counts decrement; after each run
    /// the decoder must have reported `expected`.
    fn run(&mut self, steps: &[(i32, &str)]) {
        for &(count, expected) in steps {
            for _ in 0..count.abs() {
                if count > 0 {
                    self.increment();
                } else {
                    self.decrement();
                }
            }
            assert_eq!(
                self.reported().map(|timecode| timecode.to_string()).as_deref(),
                Some(expected),
                "after {:+} quarter-frames",
                count
            );
        }
    }
}

fn tc(text: &str, rate: FrameRate) -> Timecode {
    Timecode::parse(text, rate).unwrap()
}

#[test]
fn test_24fps_first_group_and_reversal() {
    let mut link = Loopback::new(Some(FrameRate::Fps24));
    link.locate(tc("01:00:00:00", FrameRate::Fps24), FullFrameBehavior::Always);
    assert_eq!(link.reported(), Some(tc("01:00:00:00", FrameRate::Fps24)));
    assert_eq!(link.encoder.mtc_quarter_frame(), 0);

    // the replayed piece 0 plus a whole group before the first report
    link.run(&[(9, "01:00:00:02"), (4, "01:00:00:03"), (4, "01:00:00:04")]);
    link.run(&[(19 * 4, "01:00:00:23")]);
    assert_eq!(link.encoder.mtc_quarter_frame(), 4);
    link.run(&[(4, "01:00:01:00")]);
    assert_eq!(link.reported_direction(), Some(Direction::Forwards));

    link.run(&[(-1, "01:00:00:23")]);
    assert_eq!(link.reported_direction(), Some(Direction::Backwards));
    link.run(&[
        (-3, "01:00:00:23"),
        (-1, "01:00:00:22"),
        (-3, "01:00:00:22"),
        (-1, "01:00:00:21"),
        (-3, "01:00:00:21"),
        (-1, "01:00:00:20"),
        (-3, "01:00:00:20"),
    ]);
}

fn run_29_97_drop_to_minute(link: &mut Loopback) {
    let start = tc("01:00:59;00", FrameRate::Fps29_97d);
    link.locate(start, FullFrameBehavior::Always);
    assert_eq!(link.reported(), Some(start));
    assert_eq!(link.encoder.mtc_quarter_frame(), 0);

    link.run(&[(9, "01:00:59;02"), (4, "01:00:59;03"), (4, "01:00:59;04")]);
    link.run(&[(25 * 4, "01:00:59;29")]);
    assert_eq!(link.encoder.mtc_quarter_frame(), 4);
    // ;00 and ;01 are dropped at the top of the minute
    link.run(&[(4, "01:01:00;02")]);
}

fn run_29_97_drop_back_from_minute(link: &mut Loopback) {
    link.run(&[
        (-3, "01:00:59;29"),
        (-1, "01:00:59;28"),
        (-3, "01:00:59;28"),
        (-1, "01:00:59;27"),
        (-3, "01:00:59;27"),
        (-1, "01:00:59;26"),
        (-3, "01:00:59;26"),
    ]);
}

#[test]
fn test_29_97_drop_across_minute_and_back() {
    let mut link = Loopback::new(Some(FrameRate::Fps29_97d));
    run_29_97_drop_to_minute(&mut link);
    assert_eq!(link.reported_direction(), Some(Direction::Forwards));

    link.run(&[(-1, "01:00:59;29")]);
    assert_eq!(link.reported_direction(), Some(Direction::Backwards));
    run_29_97_drop_back_from_minute(&mut link);
}

#[test]
fn test_29_97_drop_reverse_mid_group() {
    let mut link = Loopback::new(Some(FrameRate::Fps29_97d));
    run_29_97_drop_to_minute(&mut link);
    link.run(&[(-1, "01:00:59;29")]);
    run_29_97_drop_back_from_minute(&mut link);

    // relocating after a reversal starts over cleanly
    run_29_97_drop_to_minute(&mut link);

    link.run(&[(1, "01:01:00;02")]);
    assert_eq!(link.reported_direction(), Some(Direction::Forwards));
    link.run(&[(-1, "01:01:00;02")]);
    assert_eq!(link.reported_direction(), Some(Direction::Backwards));

    link.run(&[(-1, "01:00:59;29")]);
    run_29_97_drop_back_from_minute(&mut link);
}

#[test]
fn test_decoder_locks_on_16th_group_and_drops_on_11th_miss() {
    let mut link = Loopback::new(Some(FrameRate::Fps24));
    link.locate(tc("01:00:00:00", FrameRate::Fps24), FullFrameBehavior::Always);
    assert!(matches!(link.decoder.state(), SyncState::PreSync { .. }));

    let mut locked_at = None;
    for count in 1..=129 {
        link.increment();
        if locked_at.is_none() && link.decoder.state() == SyncState::Sync {
            locked_at = Some(count);
        }
    }
    // first group after the replayed piece, then 15 more
    assert_eq!(locked_at, Some(9 + 15 * 8));

    let last_group_at = link.now - link.step;
    let group = link.step * 8;
    for misses in 1..=10 {
        link.decoder.check_timeout(last_group_at + group * (misses + 1));
        assert_eq!(link.decoder.state(), SyncState::Freewheeling, "{} missed", misses);
    }
    link.decoder.check_timeout(last_group_at + group * 12);
    assert_eq!(link.decoder.state(), SyncState::Idle);
}

#[test]
fn test_24fps_locate_and_run_to_lock() {
    let start = Timecode::parse("01:00:00:00", FrameRate::Fps24).unwrap();
    let mut link = Loopback::new(None);

    link.locate(start, FullFrameBehavior::Always);
    assert_eq!(link.reported(), Some(start));
    assert_eq!(link.decoder.mtc_frame_rate(), Some(MtcFrameRate::Mtc24));

    for count in 1..=200 {
        link.increment();
        if count >= 9 {
            assert_eq!(
                link.reported(),
                Some(link.encoder.timecode()),
                "after {} quarter-frames",
                count
            );
        }
    }

    assert_eq!(link.decoder.state(), SyncState::Sync);
    // 200 quarter-frames are 50 frames, less the one replayed after locate
    assert_eq!(link.encoder.timecode().to_string(), "01:00:02:01");
}

#[test]
fn test_29_97_drop_frame_crosses_minute() {
    let start = Timecode::parse("00:00:59:00", FrameRate::Fps29_97d).unwrap();
    let mut link = Loopback::new(Some(FrameRate::Fps29_97d));
    link.locate(start, FullFrameBehavior::Never);

    for count in 1..=140 {
        link.increment();
        if count >= 9 {
            assert_eq!(link.reported(), Some(link.encoder.timecode()));
        }
    }

    // 00:01:00;00 and ;01 do not exist
    assert_eq!(link.reported().unwrap().to_string(), "00:01:00;06");
}

#[test]
fn test_reversal_tracks_encoder() {
    let start = Timecode::parse("10:00:00:00", FrameRate::Fps25).unwrap();
    let mut link = Loopback::new(None);
    link.locate(start, FullFrameBehavior::Never);

    for _ in 0..60 {
        link.increment();
    }
    let turning_point = link.reported().unwrap();

    for _ in 0..40 {
        link.decrement();
        assert_eq!(link.reported(), Some(link.encoder.timecode()));
    }

    assert_eq!(link.decoder.direction(), Direction::Backwards);
    assert!(link.reported().unwrap() < turning_point);
}

#[test]
fn test_every_rate_round_trips() {
    for rate in FrameRate::ALL {
        if rate == FrameRate::Fps24_98 {
            // not an integer multiple of its carrier
            continue;
        }

        let start = Timecode::new(10, 59, 59, 0, rate).unwrap();
        let mut link = Loopback::new(Some(rate));
        link.locate(start, FullFrameBehavior::Never);

        for count in 1..=80 {
            link.increment();
            if count >= 9 {
                assert_eq!(
                    link.reported(),
                    Some(link.encoder.timecode()),
                    "{} after {} quarter-frames",
                    rate,
                    count
                );
            }
        }
        assert!(link.reported().is_some(), "{}", rate);
    }
}
