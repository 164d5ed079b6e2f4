use mtcsyncrs::mtc::MtcFrameRate;
use mtcsyncrs::timecode::{CompatibleGroup, FrameRate};
use std::time::Duration;

const EPSILON: f64 = 1e-4;

#[test]
fn test_every_rate_is_carried_by_exactly_one_mtc_rate() {
    for rate in FrameRate::ALL {
        let carriers: Vec<_> = MtcFrameRate::ALL
            .iter()
            .filter(|mtc| mtc.derived_frame_rates().contains(&rate))
            .collect();
        assert_eq!(carriers.len(), 1, "{} should have one carrier", rate);
        assert_eq!(*carriers[0], rate.mtc_frame_rate());
    }
}

#[test]
fn test_direct_equivalents() {
    assert_eq!(MtcFrameRate::Mtc24.direct_equivalent(), FrameRate::Fps24);
    assert_eq!(MtcFrameRate::Mtc25.direct_equivalent(), FrameRate::Fps25);
    assert_eq!(MtcFrameRate::Mtc2997d.direct_equivalent(), FrameRate::Fps29_97d);
    assert_eq!(MtcFrameRate::Mtc30.direct_equivalent(), FrameRate::Fps30);

    for mtc in MtcFrameRate::ALL {
        assert!(mtc.derived_frame_rates().contains(&mtc.direct_equivalent()));
    }
}

#[test]
fn test_rate_bits_and_names() {
    assert_eq!(MtcFrameRate::Mtc24.bits(), 0b00);
    assert_eq!(MtcFrameRate::Mtc25.bits(), 0b01);
    assert_eq!(MtcFrameRate::Mtc2997d.bits(), 0b10);
    assert_eq!(MtcFrameRate::Mtc30.bits(), 0b11);
    assert_eq!(MtcFrameRate::from_bits(0b111), MtcFrameRate::Mtc30);
    assert_eq!(MtcFrameRate::Mtc2997d.to_string(), "SMPTE-29.97d");
    assert_eq!(MtcFrameRate::Mtc2997d.fps_value_for_scaling(), 30.0);
}

#[test]
fn test_scaled_frames_integer_multiples() {
    let mtc = MtcFrameRate::Mtc30;
    assert_eq!(mtc.scaled_frames(10, 0, FrameRate::Fps30), Some(10.0));
    assert_eq!(mtc.scaled_frames(10, 4, FrameRate::Fps30), Some(11.0));
    assert_eq!(mtc.scaled_frames(10, 2, FrameRate::Fps60), Some(21.0));
    assert_eq!(mtc.scaled_frames(10, 1, FrameRate::Fps120), Some(41.0));
    assert_eq!(
        MtcFrameRate::Mtc25.scaled_frames(24, 0, FrameRate::Fps100),
        Some(96.0)
    );
}

#[test]
fn test_scaled_frames_24_98() {
    let mtc = MtcFrameRate::Mtc24;

    let frames = mtc.scaled_frames(12, 0, FrameRate::Fps24_98).unwrap();
    assert!((frames - 12.5).abs() < EPSILON, "got {}", frames);

    let frames = mtc.scaled_frames(22, 0, FrameRate::Fps24_98).unwrap();
    assert!((frames - 22.916_667).abs() < EPSILON, "got {}", frames);

    assert_eq!(FrameRate::Fps24_98.mtc_scaled_frames(12.5), (12, 0));
    assert_eq!(FrameRate::Fps24_98.mtc_scaled_frames(22.916_667), (22, 0));
    assert_eq!(FrameRate::Fps24_98.mtc_scaled_frames(24.98), (24, 0));
}

#[test]
fn test_scaled_frames_clamps_input() {
    let mtc = MtcFrameRate::Mtc24;
    assert_eq!(mtc.scaled_frames(-1, 0, FrameRate::Fps24), Some(0.0));
    assert_eq!(mtc.scaled_frames(0, 8, FrameRate::Fps24), Some(1.75));
    assert_eq!(mtc.scaled_frames(0, -3, FrameRate::Fps24), Some(0.0));
}

#[test]
fn test_scaled_frames_rejects_foreign_rates() {
    assert_eq!(MtcFrameRate::Mtc24.scaled_frames(2, 0, FrameRate::Fps25), None);
    assert_eq!(MtcFrameRate::Mtc30.scaled_frames(2, 0, FrameRate::Fps29_97d), None);
    assert_eq!(MtcFrameRate::Mtc2997d.scaled_frames(2, 0, FrameRate::Fps30), None);
}

#[test]
fn test_mtc_scaled_frames_splits_into_even_frames_and_quarter_frames() {
    assert_eq!(FrameRate::Fps24.mtc_scaled_frames(6.0), (6, 0));
    assert_eq!(FrameRate::Fps24.mtc_scaled_frames(7.0), (6, 4));
    assert_eq!(FrameRate::Fps60.mtc_scaled_frames(21.0), (10, 2));
    assert_eq!(FrameRate::Fps120.mtc_scaled_frames(119.0), (28, 7));
    assert_eq!(FrameRate::Fps29_97d.mtc_scaled_frames(29.0), (28, 4));
}

#[test]
fn test_scale_factors() {
    assert_eq!(FrameRate::Fps23_976.mtc_scale_factor(), 1.0);
    assert_eq!(FrameRate::Fps47_952.mtc_scale_factor(), 2.0);
    assert_eq!(FrameRate::Fps100.mtc_scale_factor(), 4.0);
    assert!((FrameRate::Fps24_98.mtc_scale_factor() - 25.0 / 24.0).abs() < EPSILON);
    assert_eq!(FrameRate::Fps24_98.mtc_integer_scale(), 1);
}

#[test]
fn test_compatible_groups() {
    assert!(FrameRate::Fps23_976.is_compatible(FrameRate::Fps29_97));
    assert!(FrameRate::Fps24.is_compatible(FrameRate::Fps30));
    assert!(FrameRate::Fps25.is_compatible(FrameRate::Fps120));
    assert!(FrameRate::Fps29_97d.is_compatible(FrameRate::Fps59_94d));
    assert!(FrameRate::Fps30d.is_compatible(FrameRate::Fps120d));

    assert!(!FrameRate::Fps29_97.is_compatible(FrameRate::Fps30));
    assert!(!FrameRate::Fps29_97.is_compatible(FrameRate::Fps29_97d));
    assert!(!FrameRate::Fps30d.is_compatible(FrameRate::Fps29_97d));

    assert_eq!(FrameRate::Fps24_98.compatible_group(), CompatibleGroup::Atsc);
    let total: usize = [
        CompatibleGroup::Ntsc,
        CompatibleGroup::NtscDrop,
        CompatibleGroup::Atsc,
        CompatibleGroup::AtscDrop,
    ]
    .iter()
    .map(|group| group.rates().len())
    .sum();
    assert_eq!(total, FrameRate::ALL.len());
}

#[test]
fn test_real_rates() {
    assert_eq!(FrameRate::Fps29_97.rate(), (30000, 1001));
    assert_eq!(FrameRate::Fps30d.rate(), (30000, 1001));
    assert_eq!(FrameRate::Fps24_98.rate(), (25000, 1001));
    assert_eq!(FrameRate::Fps25.rate(), (25, 1));
    assert_eq!(FrameRate::Fps120.rate(), (120, 1));
}

#[test]
fn test_quarter_frame_intervals() {
    let interval = FrameRate::Fps30.mtc_quarter_frame_interval();
    assert_eq!(interval, Duration::from_nanos(8_333_333));

    // scaled rates run their carrier at carrier speed
    assert_eq!(
        FrameRate::Fps120.mtc_quarter_frame_interval(),
        FrameRate::Fps30.mtc_quarter_frame_interval()
    );
    assert_eq!(
        FrameRate::Fps59_94d.mtc_quarter_frame_interval(),
        FrameRate::Fps29_97d.mtc_quarter_frame_interval()
    );
}
