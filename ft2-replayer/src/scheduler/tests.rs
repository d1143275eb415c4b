use super::*;
use ft2_song::{InstrumentTable, Song};

fn engine_with(config: &ReplayerConfig, song: Song) -> AudioEngine {
    let replayer = Replayer::new(song, InstrumentTable::new());
    AudioEngine::new(replayer, config, Arc::new(SyncQueues::new())).unwrap()
}

fn default_engine() -> AudioEngine {
    engine_with(&ReplayerConfig::default(), Song::new(4).unwrap())
}

// =============================================================================
// Tick scheduling
// =============================================================================

#[test]
fn test_default_tempo_consumes_960_samples_per_tick() {
    let mut engine = default_engine();
    engine.start_playing(PlayMode::Song, 0);

    let mut out = vec![0i16; 960 * 2];
    engine.render_i16(&mut out, 2, 1);
    assert_eq!(engine.tick_samples_left(), 0, "one whole tick consumed");
    assert_eq!(engine.sync().pattern.size(), 1, "exactly one tick ran");

    let mut one = [0i16; 2];
    engine.render_i16(&mut one, 2, 2);
    assert_eq!(engine.tick_samples_left(), 959, "next tick starts on the next sample");
    assert_eq!(engine.sync().pattern.size(), 2);
}

#[test]
fn test_row_length_at_speed_six() {
    let mut engine = default_engine();
    engine.start_playing(PlayMode::Song, 0);

    let mut out = vec![0i16; 960 * 6 * 2];
    engine.render_i16(&mut out, 2, 1);
    assert_eq!(engine.replayer().row(), 1, "six ticks of 960 samples per row");
    assert_eq!(engine.sync().pattern.size(), 6);
}

#[test]
fn test_fractional_ticks_do_not_drift_over_a_minute() {
    let mut config = ReplayerConfig::default();
    config.audio.sample_rate = 44_100;
    let mut song = Song::new(2).unwrap();
    song.initial_bpm = 33;
    let mut engine = engine_with(&config, song);
    engine.start_playing(PlayMode::Song, 0);

    let frames = 60 * 44_100usize;
    let mut out = vec![0i16; 1024];
    let mut done = 0;
    while done < frames {
        let count = (frames - done).min(1024);
        engine.render_i16(&mut out[..count], 1, 0);
        done += count;
    }

    let ticks = engine.sync().channels.size() as f64;
    let exact = 44_100.0 / (33.0 / 2.5);
    let scheduled = (frames as u64 + engine.tick_samples_left() as u64) as f64;
    let drift = (scheduled - ticks * exact).abs();
    assert!(drift < 1.0, "drift after one minute was {drift} samples");
}

#[test]
fn test_slices_never_exceed_block() {
    let mut engine = default_engine();
    engine.start_playing(PlayMode::Song, 0);
    let mut out = vec![0f32; 5000 * 2];
    engine.render_f32(&mut out, 2, 1);
    assert_eq!(engine.sync().pattern.size(), 6, "5000 samples touch six ticks");
}

// =============================================================================
// Output
// =============================================================================

#[test]
fn test_empty_song_renders_silence() {
    let mut engine = default_engine();
    engine.start_playing(PlayMode::Song, 0);
    let mut out = vec![1i16; 4096];
    engine.render_i16(&mut out, 2, 1);
    assert!(out.iter().all(|&s| s == 0), "dither alone never reaches one LSB");
}

#[test]
fn test_mono_and_surround_layouts_fill_whole_buffer() {
    let mut engine = default_engine();
    let mut out = vec![1.0f32; 6 * 100];
    engine.render_f32(&mut out, 6, 1);
    assert!(out.iter().all(|&s| s == 0.0));
}

// =============================================================================
// Sync timestamps
// =============================================================================

#[test]
fn test_timestamps_projected_by_latency() {
    let mut config = ReplayerConfig::default();
    config.audio.latency_ms = 20;
    let mut engine = engine_with(&config, Song::new(2).unwrap());
    engine.start_playing(PlayMode::Song, 0);

    let now = 1_000_000_000;
    let mut out = vec![0i16; 961 * 2];
    engine.render_i16(&mut out, 2, now);

    let first = engine.sync().pattern.pop().unwrap();
    let second = engine.sync().pattern.pop().unwrap();
    assert!(
        first.timestamp.abs_diff(now + 20_000_000) <= 1,
        "first tick is heard one latency later, got {}",
        first.timestamp
    );
    assert_eq!(second.timestamp - first.timestamp, 20_000_000, "20 ms per tick at 125 BPM");
}

#[test]
fn test_reset_tick_time_rearms_clock() {
    let mut engine = default_engine();
    engine.set_latency(0.0);
    engine.start_playing(PlayMode::Song, 0);

    let mut out = vec![0i16; 960 * 2];
    engine.render_i16(&mut out, 2, 500);
    engine.sync().reset();

    engine.reset_tick_time();
    engine.render_i16(&mut out, 2, 9_000_000_000);
    let entry = engine.sync().pattern.pop().unwrap();
    assert_eq!(entry.timestamp, 9_000_000_000);
}

#[test]
fn test_idle_pushes_channel_snapshots_only() {
    let mut engine = default_engine();
    let mut out = vec![0i16; 960 * 2 * 3];
    engine.render_i16(&mut out, 2, 1);
    assert_eq!(engine.sync().pattern.size(), 0);
    assert_eq!(engine.sync().channels.size(), 3);
}

#[test]
fn test_channel_snapshot_carries_rate() {
    let mut engine = default_engine();
    let mut out = vec![0i16; 2];
    engine.render_i16(&mut out, 2, 1);
    let snapshot = engine.sync().channels.pop().unwrap();
    assert_eq!(snapshot.rate, 48_000);
}

// =============================================================================
// Control
// =============================================================================

#[test]
fn test_set_audio_freq_rebuilds_timing() {
    let mut engine = default_engine();
    engine.set_audio_freq(44_100).unwrap();
    assert_eq!(engine.freq(), 44_100);
    assert_eq!(engine.timing().samples_per_tick(125).int, 882);
    assert_eq!(engine.mixer().freq(), 44_100);
}

#[test]
fn test_set_audio_freq_rejects_out_of_range() {
    let mut engine = default_engine();
    assert!(matches!(
        engine.set_audio_freq(4_000),
        Err(ReplayerError::SampleRate(4_000))
    ));
    assert_eq!(engine.freq(), 48_000, "rate unchanged after a rejected switch");
}

#[test]
fn test_new_rejects_bad_rate() {
    let mut config = ReplayerConfig::default();
    config.audio.sample_rate = 500_000;
    let replayer = Replayer::new(Song::default(), InstrumentTable::new());
    assert!(AudioEngine::new(replayer, &config, Arc::new(SyncQueues::new())).is_err());
}

#[test]
fn test_start_playing_runs_tick_immediately() {
    let mut engine = default_engine();
    let mut out = vec![0i16; 100 * 2];
    engine.render_i16(&mut out, 2, 1);

    engine.start_playing(PlayMode::Song, 0);
    assert_eq!(engine.tick_samples_left(), 0);
    engine.render_i16(&mut out[..2], 2, 2);
    assert_eq!(engine.sync().pattern.size(), 1);
}

#[test]
fn test_invalid_latency_ignored() {
    let mut engine = default_engine();
    let before = engine.latency_secs();
    engine.set_latency(f64::NAN);
    engine.set_latency(-1.0);
    assert_eq!(engine.latency_secs(), before);
}
