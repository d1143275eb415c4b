//! Offline rendering to WAV

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use ft2_replayer::{
    AudioEngine, BitDepth, CLOCK_HZ, PatternSnapshot, PlayMode, Replayer, ReplayerConfig,
    SyncQueues,
};
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::debug;

use crate::demo;

/// Frames mixed per engine call
const BLOCK_FRAMES: usize = 1024;

/// Output channel count
const CHANNELS: usize = 2;

/// What an offline render produced
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderSummary {
    pub frames: u64,
    /// Distinct rows reached
    pub rows: u64,
    /// Stopped because the order list wrapped
    pub looped: bool,
}

/// Engine driven by a frame counter instead of a wall clock
pub struct OfflineRender {
    engine: AudioEngine,
    frames: u64,
    last_row: Option<(u8, u8)>,
    rows: u64,
}

impl OfflineRender {
    pub fn new(replayer: Replayer, config: &ReplayerConfig) -> Result<Self> {
        let mut engine = AudioEngine::new(replayer, config, Arc::new(SyncQueues::new()))
            .context("failed to create audio engine")?;
        engine.set_latency(0.0);
        engine.start_playing(PlayMode::Song, 0);
        Ok(Self {
            engine,
            frames: 0,
            last_row: None,
            rows: 0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.engine.freq()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn has_looped(&self) -> bool {
        self.engine.replayer().song_loops() > 0
    }

    /// Sample clock in timestamp units; never zero
    fn now(&self) -> u64 {
        (self.frames as f64 * CLOCK_HZ / self.sample_rate() as f64) as u64 + 1
    }

    pub fn render_i16(&mut self, out: &mut [i16]) {
        let now = self.now();
        self.engine.render_i16(out, CHANNELS, now);
        self.frames += (out.len() / CHANNELS) as u64;
    }

    pub fn render_f32(&mut self, out: &mut [f32]) {
        let now = self.now();
        self.engine.render_f32(out, CHANNELS, now);
        self.frames += (out.len() / CHANNELS) as u64;
    }

    /// Pattern snapshots for newly reached rows; channel snapshots are
    /// discarded so the queue never fills up
    pub fn take_rows(&mut self) -> Vec<PatternSnapshot> {
        let sync = self.engine.sync();
        while sync.channels.pop().is_some() {}

        let mut rows = Vec::new();
        while let Some(snapshot) = sync.pattern.pop() {
            let key = (snapshot.song_pos, snapshot.row);
            if self.last_row != Some(key) {
                self.last_row = Some(key);
                self.rows += 1;
                rows.push(snapshot);
            }
        }
        rows
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }
}

/// Render the demo song for `seed` into a WAV file
///
/// Rendering stops after `seconds` or when the song wraps to its loop
/// start, whichever comes first. With `json` set, each row reached is
/// written there as one JSON object per line.
pub fn render_to_wav(
    config: &ReplayerConfig,
    seed: u64,
    seconds: f64,
    path: &Path,
    json: Option<&Path>,
) -> Result<RenderSummary> {
    let (song, table) = demo::build(seed).context("failed to build demo song")?;
    let mut render = OfflineRender::new(Replayer::new(song, table), config)?;
    let rate = render.sample_rate();
    let max_frames = (seconds.max(0.0) * rate as f64) as u64;

    let bit_depth = config.audio.bit_depth;
    let spec = match bit_depth {
        BitDepth::I16 => WavSpec {
            channels: CHANNELS as u16,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
        BitDepth::F32 => WavSpec {
            channels: CHANNELS as u16,
            sample_rate: rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create {}", path.display()))?;

    let mut rows_out = match json {
        Some(p) => Some(BufWriter::new(
            File::create(p).with_context(|| format!("failed to create {}", p.display()))?,
        )),
        None => None,
    };

    let mut pcm16 = vec![0i16; BLOCK_FRAMES * CHANNELS];
    let mut pcmf = vec![0f32; BLOCK_FRAMES * CHANNELS];

    while render.frames() < max_frames && !render.has_looped() {
        let frames = (max_frames - render.frames()).min(BLOCK_FRAMES as u64) as usize;
        let len = frames * CHANNELS;
        match bit_depth {
            BitDepth::I16 => {
                render.render_i16(&mut pcm16[..len]);
                for &s in &pcm16[..len] {
                    writer.write_sample(s)?;
                }
            }
            BitDepth::F32 => {
                render.render_f32(&mut pcmf[..len]);
                for &s in &pcmf[..len] {
                    writer.write_sample(s)?;
                }
            }
        }

        let rows = render.take_rows();
        if let Some(out) = rows_out.as_mut() {
            for row in rows {
                serde_json::to_writer(&mut *out, &row)?;
                writeln!(out)?;
            }
        }
    }

    writer.finalize().context("failed to finalize WAV file")?;
    if let Some(mut out) = rows_out {
        out.flush()?;
    }

    let summary = RenderSummary {
        frames: render.frames(),
        rows: render.rows(),
        looped: render.has_looped(),
    };
    debug!(?summary, rate, ?bit_depth, "render complete");
    Ok(summary)
}
