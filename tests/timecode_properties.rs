// Frame derivation properties over random timestamps

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ltc_timecode::timecode::latency::LatencyModel;
use ltc_timecode::{CalendarZone, FrameRate, TimeSource, TimecodeClock};

const SAMPLE_RATE: u32 = 48_000;

// 2023-11-14 22:13:20 UTC
const REFERENCE_US: i64 = 1_700_000_000_000_000;

fn utc_clock(rate: FrameRate) -> TimecodeClock {
    TimecodeClock::new(rate, SAMPLE_RATE, TimeSource::system()).with_zone(CalendarZone::Utc)
}

fn random_timestamps(count: usize) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(0x17c);
    (0..count)
        .map(|_| rng.gen_range(0..4_000_000_000i64) * 1_000_000 + rng.gen_range(0..1_000_000))
        .collect()
}

#[test]
fn test_frame_always_in_range() {
    for &rate in FrameRate::all() {
        let clock = utc_clock(rate);
        for t in random_timestamps(2_000) {
            let tc = clock.timecode_at(t);
            assert!(tc.frame < rate.frames_per_second(), "{} -> {:?} at {}", t, tc, rate);
            assert!(tc.hour < 24 && tc.minute < 60 && tc.second < 60);
        }
    }
}

#[test]
fn test_drop_frame_labels_skipped() {
    for rate in [FrameRate::Fps2997Drop, FrameRate::Fps30Drop] {
        let clock = utc_clock(rate);
        for t in random_timestamps(5_000) {
            let tc = clock.timecode_at(t);
            if tc.minute % 10 != 0 {
                assert!(tc.frame >= 2, "{:?} at {}", tc, rate);
            }
        }
    }
}

#[test]
fn test_drop_frame_known_values() {
    let clock = utc_clock(FrameRate::Fps2997Drop);

    // Minute 13: labels 0 and 1 become 2
    let tc = clock.timecode_at(REFERENCE_US + 10_000);
    assert_eq!(tc.time_fields(), (22, 13, 20, 2));

    // Minute 10 keeps frame 0
    let tc = clock.timecode_at(REFERENCE_US - 200_000_000 + 10_000);
    assert_eq!(tc.time_fields(), (22, 10, 0, 0));
}

#[test]
fn test_non_drop_rates_keep_low_labels() {
    let clock = utc_clock(FrameRate::Fps30);
    let tc = clock.timecode_at(REFERENCE_US + 10_000);
    assert_eq!(tc.time_fields(), (22, 13, 20, 0));
    assert_eq!((tc.year, tc.month, tc.day), (2023, 11, 14));
}

#[test]
fn test_frames_monotonic_within_second() {
    let mut rng = StdRng::seed_from_u64(7);
    for &rate in FrameRate::all() {
        let clock = utc_clock(rate);
        let second_start = REFERENCE_US + rng.gen_range(0..86_400i64) * 1_000_000;

        let mut previous = clock.timecode_at(second_start).frame;
        let mut t = second_start;
        while t + 5_000 < second_start + 1_000_000 {
            t += rng.gen_range(1..5_000);
            let frame = clock.timecode_at(t).frame;
            assert!(frame >= previous, "{} went back from {} to {}", rate, previous, frame);
            previous = frame;
        }
    }
}

#[test]
fn test_frame_advances_once_per_period() {
    for &rate in FrameRate::all() {
        let clock = utc_clock(rate);
        let period = rate.micros_per_frame();
        let a = clock.timecode_at(REFERENCE_US + 5 * period + period / 2);
        let b = clock.timecode_at(REFERENCE_US + 6 * period + period / 2);
        assert_eq!(b.frame, a.frame + 1, "{}", rate);
    }
}

#[test]
fn test_output_adds_buffer_delay_without_correction() {
    let flat = LatencyModel {
        min_offset_frames: 0.0,
        max_offset_frames: 0.0,
        decay_rate: 0.0,
        sine_amplitude: 0.0,
        quadratic_amplitude: 0.0,
    };
    let clock = utc_clock(FrameRate::Fps25).with_latency_model(flat);

    for t in random_timestamps(200) {
        // 4800 samples at 48 kHz is 100 ms
        assert_eq!(clock.compute_output_timecode(t, 4_800), clock.timecode_at(t + 100_000));
        assert_eq!(clock.compute_output_timecode(t, -10), clock.timecode_at(t));
    }
}

#[test]
fn test_default_correction_runs_ahead_of_display() {
    let clock = utc_clock(FrameRate::Fps25);
    let t = REFERENCE_US + 100_000;

    let display = clock.compute_display_timecode(t, 0);
    let output = clock.compute_output_timecode(t, 0);
    assert!(output.frame_of_day(FrameRate::Fps25) > display.frame_of_day(FrameRate::Fps25));
}

#[test]
fn test_display_applies_offset() {
    let clock = utc_clock(FrameRate::Fps24);
    for t in random_timestamps(100) {
        assert_eq!(clock.compute_display_timecode(t, -250_000), clock.timecode_at(t - 250_000));
    }
}

// The output path: buffer delay plus the default adaptive correction

/// Four 25 fps periods queued ahead of the device
const QUEUED_SAMPLES: i64 = 7_680;

/// Timestamps within the hour after `REFERENCE_US`, clear of any day rollover
fn random_output_instants(rng: &mut StdRng, count: usize) -> Vec<i64> {
    (0..count)
        .map(|_| REFERENCE_US + rng.gen_range(0..3_600_000_000i64))
        .collect()
}

#[test]
fn test_output_frame_always_in_range() {
    let mut rng = StdRng::seed_from_u64(0x0a7);
    for &rate in FrameRate::all() {
        let clock = utc_clock(rate);
        for t in random_output_instants(&mut rng, 2_000) {
            let delay = rng.gen_range(0..4 * QUEUED_SAMPLES);
            let tc = clock.compute_output_timecode(t, delay);
            assert!(tc.frame < rate.frames_per_second(), "{:?} at {} ({})", tc, t, rate);
            assert!(tc.hour < 24 && tc.minute < 60 && tc.second < 60);
        }
    }
}

#[test]
fn test_output_drop_frame_labels_skipped() {
    let mut rng = StdRng::seed_from_u64(0xd0f);
    for rate in [FrameRate::Fps2997Drop, FrameRate::Fps30Drop] {
        let clock = utc_clock(rate);
        for t in random_output_instants(&mut rng, 5_000) {
            let tc = clock.compute_output_timecode(t, QUEUED_SAMPLES);
            if tc.minute % 10 != 0 {
                assert!(tc.frame >= 2, "{:?} at {} ({})", tc, t, rate);
            }
        }
    }

    // Sweep across minute boundaries so the raw label passes through 0 and 1
    let clock = utc_clock(FrameRate::Fps2997Drop);
    let mut checked = 0;
    for minute in 1..10i64 {
        // 22:14:00 is 40 s after the reference
        let boundary = REFERENCE_US + (40 + (minute - 1) * 60) * 1_000_000;
        for t in (boundary - 400_000..boundary + 100_000).step_by(997) {
            let tc = clock.compute_output_timecode(t, QUEUED_SAMPLES);
            if tc.second == 0 && tc.minute % 10 != 0 {
                assert!(tc.frame >= 2, "{:?}", tc);
                checked += 1;
            }
        }
    }
    assert!(checked > 0);
}

#[test]
fn test_output_monotonic_within_frame_window() {
    let mut rng = StdRng::seed_from_u64(0x3e7);
    for &rate in FrameRate::all() {
        let clock = utc_clock(rate);
        let window = rate.micros_per_frame();

        for start in random_output_instants(&mut rng, 200) {
            let delay = rng.gen_range(0..4 * QUEUED_SAMPLES);
            let mut previous = clock.compute_output_timecode(start, delay).frame_of_day(rate);
            let mut t = start;
            while t < start + window {
                t += rng.gen_range(1..500);
                let current = clock.compute_output_timecode(t, delay).frame_of_day(rate);
                assert!(current >= previous, "{} went back at {} ({} -> {})", rate, t, previous, current);
                previous = current;
            }
        }
    }
}

#[test]
fn test_output_monotonic_over_whole_second() {
    for &rate in FrameRate::all() {
        let clock = utc_clock(rate);
        let second_start = REFERENCE_US + 1_000_000;

        let mut previous = clock.compute_output_timecode(second_start, QUEUED_SAMPLES).frame_of_day(rate);
        let mut t = second_start;
        while t + 7 < second_start + 1_000_000 {
            t += 7;
            let current = clock.compute_output_timecode(t, QUEUED_SAMPLES).frame_of_day(rate);
            assert!(current >= previous, "{} went back at +{} us", rate, t - second_start);
            previous = current;
        }
    }
}
