//! Live playback on the default output device

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use ft2_replayer::{
    AudioDevice, AudioEngine, Clock, EngineHandle, PlayMode, Replayer, ReplayerConfig,
    ScopeThread, SyncQueues,
};
use tracing::{debug, info};

use crate::demo::{self, DEMO_CHANNELS};

/// Display refresh interval
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Play the demo song for `seconds`, logging each row as it is heard
pub fn run(config: &ReplayerConfig, seed: u64, seconds: f64) -> Result<()> {
    let (song, table) = demo::build(seed).context("failed to build demo song")?;
    let engine = AudioEngine::new(
        Replayer::new(song, table),
        config,
        Arc::new(SyncQueues::new()),
    )
    .context("failed to create audio engine")?;

    let clock = Clock::new();
    let handle = EngineHandle::new(engine, clock);
    let device = AudioDevice::open(&handle, &config.audio).context("failed to open audio device")?;
    let scopes = ScopeThread::spawn(Arc::clone(handle.sync()), clock)?;
    info!(
        rate = device.sample_rate(),
        channels = device.channels(),
        seed,
        "playing demo song"
    );

    handle.start_playing(PlayMode::Song, 0);

    let started = Instant::now();
    let limit = Duration::from_secs_f64(seconds.max(0.0));
    let mut last_row = None;
    while started.elapsed() < limit {
        if let Some(pos) = handle.sync().drain_patterns_until(clock.now()) {
            let key = (pos.song_pos, pos.row);
            if last_row != Some(key) {
                last_row = Some(key);
                let active: String = (0..DEMO_CHANNELS)
                    .map(|ch| match scopes.sample_position(ch) {
                        Some(_) => '#',
                        None => '.',
                    })
                    .collect();
                info!(
                    "{:02X}/{:02X} pat {:02X}  bpm {:3} spd {:2}  [{}]",
                    pos.song_pos, pos.row, pos.pattern, pos.bpm, pos.speed, active
                );
            }
        }
        thread::sleep(POLL_INTERVAL);
    }

    handle.stop_playing();
    // Let the release tails ring out
    thread::sleep(Duration::from_millis(300));
    scopes.stop_all();
    debug!("playback finished");

    drop(scopes);
    drop(device);
    Ok(())
}
