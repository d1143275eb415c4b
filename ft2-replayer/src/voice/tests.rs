//! Tests for voice position tracking, loops and ramps

use super::*;
use ft2_song::{LoopMode, Sample};

const UNITY: u64 = 1 << 32;

fn looped_sample(mode: LoopMode, len: usize, start: u32, length: u32) -> Sample {
    let data: Vec<i16> = (0..len).map(|i| (i as i16).wrapping_mul(31)).collect();
    Sample::from_i16(data).with_loop(mode, start, length)
}

fn voice_on(sample: &Sample, delta: u64) -> Voice {
    let mut voice = Voice::default();
    voice.trigger(sample, InstrumentHandle::default(), 0, 0);
    voice.set_delta(delta, Interpolation::Linear);
    voice
}

#[test]
fn test_forward_loop_wraps_once() {
    let sample = looped_sample(LoopMode::Forward, 1000, 500, 500);
    let mut voice = voice_on(&sample, UNITY);

    for _ in 0..999 {
        voice.step();
    }
    assert!(!voice.has_looped(), "still before the loop end");
    assert_eq!(voice.position, 999);

    voice.step();
    assert!(voice.has_looped());
    assert_eq!(voice.position, 500, "wrapped exactly onto the loop start");

    for _ in 0..499 {
        voice.step();
        assert!((500..1000).contains(&voice.position));
    }
    assert_eq!(voice.position, 999, "second wrap not reached yet");
}

#[test]
fn test_no_loop_deactivates_at_end() {
    let sample = Sample::from_i8(vec![10; 16]);
    let mut voice = voice_on(&sample, UNITY * 3);
    for _ in 0..5 {
        voice.step();
    }
    assert!(voice.is_active());
    assert_eq!(voice.position, 15);
    voice.step();
    assert!(!voice.is_active(), "voice stops past the last sample");
}

#[test]
fn test_start_offset_past_end_deactivates() {
    let sample = Sample::from_i8(vec![1; 100]);
    let mut voice = Voice::default();
    voice.trigger(&sample, InstrumentHandle::default(), 0, 100);
    assert!(!voice.is_active());
    voice.trigger(&sample, InstrumentHandle::default(), 0, 99);
    assert!(voice.is_active());
}

#[test]
fn test_empty_sample_never_plays() {
    let mut voice = Voice::default();
    voice.trigger(&Sample::default(), InstrumentHandle::default(), 0, 0);
    assert!(!voice.is_active());
}

#[test]
fn test_pingpong_bounds_and_flips() {
    let sample = looped_sample(LoopMode::PingPong, 64, 16, 32);
    let mut voice = voice_on(&sample, UNITY);

    let mut flips = Vec::new();
    let mut last_backwards = voice.is_backwards();
    let mut last_read = voice.read_position().0;
    for _ in 0..400 {
        voice.step();
        let (read, _) = voice.read_position();
        assert!(voice.position < voice.sample_end, "stored position in range");
        assert!(read < voice.sample_end, "read position in range");
        if voice.is_backwards() != last_backwards {
            flips.push((last_read, last_backwards));
            last_backwards = voice.is_backwards();
        }
        last_read = read;
    }

    assert!(flips.len() >= 10);
    for (at, was_backwards) in flips {
        if was_backwards {
            assert_eq!(at, 16, "backwards run turns at the loop start");
        } else {
            assert_eq!(at, 47, "forward run turns at the loop end");
        }
    }
}

#[test]
fn test_pingpong_large_delta_stays_in_loop() {
    let sample = looped_sample(LoopMode::PingPong, 64, 16, 32);
    let mut voice = voice_on(&sample, UNITY * 5 + 12345);
    for _ in 0..1000 {
        voice.step();
        let (read, _) = voice.read_position();
        assert!((16..48).contains(&read) || !voice.has_looped());
    }
    assert!(voice.is_active());
}

#[test]
fn test_skip_matches_stepping() {
    let sample = looped_sample(LoopMode::Forward, 300, 100, 150);
    let delta = UNITY + UNITY / 3;
    let mut stepped = voice_on(&sample, delta);
    let mut skipped = stepped;

    for _ in 0..50 {
        stepped.step();
    }
    skipped.skip(50);
    assert_eq!(stepped.position, skipped.position);
    assert_eq!(stepped.frac, skipped.frac);
}

#[test]
fn test_ramp_is_idempotent_at_target() {
    let sample = looped_sample(LoopMode::Forward, 256, 0, 256);

    let mut ramped = voice_on(&sample, UNITY / 2);
    ramped.target_vol_l = 0.7;
    ramped.target_vol_r = 0.3;
    ramped.start_ramp(16);

    let mut held = ramped;
    held.snap_ramp();

    let mut scratch_l = [0.0f32; 16];
    let mut scratch_r = [0.0f32; 16];
    ramped.render(&sample, &mut scratch_l, &mut scratch_r);
    let mut scratch_l = [0.0f32; 16];
    let mut scratch_r = [0.0f32; 16];
    held.render(&sample, &mut scratch_l, &mut scratch_r);

    assert_eq!(ramped.ramp_samples_left(), 0);
    assert_eq!(ramped.current_volume(), (0.7, 0.3), "ramp ends exactly on target");

    let mut a_l = [0.0f32; 64];
    let mut a_r = [0.0f32; 64];
    let mut b_l = [0.0f32; 64];
    let mut b_r = [0.0f32; 64];
    ramped.render(&sample, &mut a_l, &mut a_r);
    held.render(&sample, &mut b_l, &mut b_r);
    assert_eq!(a_l, b_l, "no residual drift after the ramp");
    assert_eq!(a_r, b_r);
}

#[test]
fn test_fade_out_voice_stops_after_ramp() {
    let sample = looped_sample(LoopMode::Forward, 128, 0, 128);
    let mut voice = voice_on(&sample, UNITY);
    voice.curr_vol_l = 1.0;
    voice.curr_vol_r = 1.0;
    voice.is_fade_out = true;
    voice.start_ramp(10);

    let mut left = [0.0f32; 32];
    let mut right = [0.0f32; 32];
    voice.render(&sample, &mut left, &mut right);
    assert!(!voice.is_active());
    assert_eq!(voice.current_volume(), (0.0, 0.0));
    assert!(left[10..].iter().all(|&s| s == 0.0), "silent after the fade");
}

#[test]
fn test_kernel_selection_by_ratio() {
    assert_eq!(Interpolation::kernel_for(UNITY), 0);
    assert_eq!(Interpolation::kernel_for(UNITY + UNITY / 4), 1);
    assert_eq!(Interpolation::kernel_for(UNITY * 2), 2);
}

#[test]
fn test_interpolators_agree_on_integer_positions() {
    let sample = Sample::from_i16((0..64).map(|i| i * 100).collect());
    let exact = sample.value(20);
    for mode in [
        Interpolation::Nearest,
        Interpolation::Linear,
        Interpolation::Sinc8,
        Interpolation::Sinc16,
    ] {
        let value = interpolate(mode, 0, &sample, 20, 0, false);
        assert!((value - exact).abs() < 1e-4, "{mode:?} gave {value}");
    }
}

#[test]
fn test_linear_halfway() {
    let sample = Sample::from_i16(vec![0, 16384, 0, 0]);
    let value = interpolate(Interpolation::Linear, 0, &sample, 0, 1 << 31, false);
    assert!((value - 0.25).abs() < 1e-6);
}
