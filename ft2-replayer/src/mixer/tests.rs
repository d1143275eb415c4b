use super::*;
use ft2_song::{Instrument, InstrumentHandle, LoopMode, Sample};

const QUICK: u32 = 240;
const TICK: u32 = 960;

fn table_with_tone() -> (InstrumentTable, InstrumentHandle) {
    let mut table = InstrumentTable::new();
    let sample = Sample::from_i16(vec![16384; 1000]).with_loop(LoopMode::Forward, 0, 1000);
    let handle = table
        .insert(1, Instrument::with_sample(sample))
        .expect("slot 1 is valid");
    (table, handle)
}

fn mixer(settings: &MixerSettings) -> Mixer {
    let mut mixer = Mixer::new(48_000, 2048, settings);
    mixer.set_ramp_lengths(QUICK, TICK);
    mixer
}

fn note_on(handle: InstrumentHandle) -> Channel {
    let mut ch = Channel::new(false);
    ch.instrument = handle;
    ch.sample = 0;
    ch.final_period = 4608;
    ch.final_vol = 1.0;
    ch.final_pan = 128;
    ch.status = ChannelStatus::UPDATE_VOL
        | ChannelStatus::UPDATE_PAN
        | ChannelStatus::UPDATE_PERIOD
        | ChannelStatus::TRIGGER_VOICE
        | ChannelStatus::USE_QUICK_VOLRAMP;
    ch
}

// ============================================================================
// Voice updates
// ============================================================================

#[test]
fn test_status_is_consumed() {
    let (table, handle) = table_with_tone();
    let mut mixer = mixer(&MixerSettings::default());
    let mut channels = vec![note_on(handle)];
    let raised = channels[0].status;

    mixer.update_voices(&mut channels, &table, true);
    assert!(channels[0].status().is_empty());
    assert_eq!(channels[0].last_status(), raised, "kept for the sync snapshot");
    assert!(mixer.voices()[0].is_active());
    assert!(mixer.voices()[0].delta() > 0);
    assert_eq!(mixer.voices()[0].period(), 4608);
}

#[test]
fn test_retrigger_spawns_fade_voice() {
    let (table, handle) = table_with_tone();
    let mut mixer = mixer(&MixerSettings::default());
    let mut channels = vec![note_on(handle)];

    mixer.update_voices(&mut channels, &table, true);
    assert!(!mixer.voices()[MAX_CHANNELS].is_active(), "nothing to fade on the first note");
    mixer.mix(&table, 1, 0, QUICK as usize);
    mixer.clear(QUICK as usize);
    let target = mixer.voices()[0].target_volume();
    assert_eq!(mixer.voices()[0].current_volume(), target, "ramped in");

    mixer.save_ramps();
    channels[0].status = note_on(handle).status;
    mixer.update_voices(&mut channels, &table, true);

    let fade = mixer.voices()[MAX_CHANNELS];
    assert!(fade.is_active() && fade.is_fade_out());
    assert_eq!(fade.current_volume(), target);
    assert_eq!(fade.target_volume(), (0.0, 0.0));
    assert_eq!(fade.ramp_samples_left(), QUICK);
    assert_eq!(mixer.voices()[0].current_volume(), (0.0, 0.0), "new note ramps in from zero");
    assert_eq!(mixer.voices()[0].ramp_samples_left(), QUICK);

    mixer.mix(&table, 1, 0, QUICK as usize);
    assert!(!mixer.voices()[MAX_CHANNELS].is_active(), "fade voice done after the quick ramp");
    assert_eq!(mixer.voices()[0].current_volume(), target);
}

#[test]
fn test_no_ramping_applies_targets_directly() {
    let (table, handle) = table_with_tone();
    let settings = MixerSettings {
        volume_ramping: false,
        ..MixerSettings::default()
    };
    let mut mixer = mixer(&settings);
    let mut channels = vec![note_on(handle)];
    mixer.update_voices(&mut channels, &table, true);

    let voice = mixer.voices()[0];
    assert_eq!(voice.current_volume(), voice.target_volume());
    assert_eq!(voice.ramp_samples_left(), 0);
}

#[test]
fn test_normal_changes_ramp_over_a_tick() {
    let (table, handle) = table_with_tone();
    let mut mixer = mixer(&MixerSettings::default());
    let mut channels = vec![note_on(handle)];
    mixer.update_voices(&mut channels, &table, true);
    mixer.save_ramps();

    channels[0].final_vol = 0.5;
    channels[0].status = ChannelStatus::UPDATE_VOL;
    mixer.update_voices(&mut channels, &table, true);
    assert_eq!(mixer.voices()[0].ramp_samples_left(), TICK);
}

#[test]
fn test_missing_sample_deactivates() {
    let (table, handle) = table_with_tone();
    let mut mixer = mixer(&MixerSettings::default());
    let mut channels = vec![note_on(handle)];
    channels[0].sample = 5;
    mixer.update_voices(&mut channels, &table, true);
    assert!(!mixer.voices()[0].is_active());
}

#[test]
fn test_rate_change_keeps_pitch() {
    let (table, handle) = table_with_tone();
    let mut mixer = mixer(&MixerSettings::default());
    let mut channels = vec![note_on(handle)];
    mixer.update_voices(&mut channels, &table, true);
    let before = mixer.voices()[0].delta();

    mixer.set_freq(24_000, 4096, true);
    let after = mixer.voices()[0].delta();
    assert!(after.abs_diff(before * 2) <= 2, "half the rate, twice the step");
    assert_eq!(mixer.max_block(), 4096);
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn test_normalization() {
    let mut mixer = mixer(&MixerSettings::default());
    assert_eq!(mixer.normalization(), 4.0 / 32.0);
    mixer.set_amplification(99);
    assert_eq!(mixer.amplification(), MAX_AMPLIFICATION);
    assert_eq!(mixer.normalization(), 1.0);
    mixer.set_master_volume(128);
    assert_eq!(mixer.normalization(), 0.5);
}

#[test]
fn test_dithered_silence_stays_silent() {
    let mut mixer = mixer(&MixerSettings::default());
    let mut out = vec![7i16; 512];
    mixer.write_i16(&mut out, 2, 256);
    assert!(out.iter().all(|&s| s == 0));
}

#[test]
fn test_f32_output_clamps_and_pads() {
    let mut settings = MixerSettings::default();
    settings.amplification = MAX_AMPLIFICATION;
    let mut mixer = mixer(&settings);
    mixer.mix_l[0] = 3.0;
    mixer.mix_r[0] = -0.25;
    mixer.mix_l[1] = 0.5;
    mixer.mix_r[1] = 0.5;

    let mut out = vec![9.0f32; 8];
    mixer.write_f32(&mut out, 4, 2);
    assert_eq!(&out[..4], &[1.0, -0.25, 0.0, 0.0]);
    assert_eq!(&out[4..], &[0.5, 0.5, 0.0, 0.0]);
    assert!(mixer.buffers().0.iter().all(|&s| s == 0.0), "cleared after output");
}

#[test]
fn test_mono_output_averages() {
    let mut settings = MixerSettings::default();
    settings.amplification = MAX_AMPLIFICATION;
    let mut mixer = mixer(&settings);
    mixer.mix_l[0] = 0.5;
    mixer.mix_r[0] = 0.25;
    let mut out = [0.0f32; 1];
    mixer.write_f32(&mut out, 1, 1);
    assert_eq!(out[0], 0.375);
}

#[test]
fn test_i16_output_full_scale() {
    let mut settings = MixerSettings::default();
    settings.amplification = MAX_AMPLIFICATION;
    let mut mixer = mixer(&settings);
    mixer.mix_l[0] = 2.0;
    mixer.mix_r[0] = -2.0;
    mixer.mix_l[1] = 0.5;
    let mut out = [0i16; 4];
    mixer.write_i16(&mut out, 2, 2);
    assert_eq!(out[0], i16::MAX);
    assert_eq!(out[1], i16::MIN);
    assert!((out[2] as i32 - 16384).abs() <= 1, "dither moves at most one LSB");
}
