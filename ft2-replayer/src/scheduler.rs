//! Audio callback body
//!
//! [`AudioEngine`] turns the replayer and mixer into a sample stream. Each
//! render call drains the "samples left in this tick" counter; when it hits
//! zero one full tick runs before the next slice is mixed, so a tick never
//! changes state in the middle of a slice. After every tick the sync queues
//! get a snapshot stamped with the timestamp the tick will be heard at.
//!
//! `now` is always supplied by the caller in nanoseconds. The device layer
//! passes a monotonic clock, tests pass whatever they like.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use ft2_song::MAX_CHANNELS;
use tracing::{debug, warn};

use crate::config::{MixerSettings, ReplayerConfig};
use crate::error::ReplayerError;
use crate::mixer::Mixer;
use crate::replayer::{PlayMode, Replayer};
use crate::sync::{ChannelSnapshot, ChannelState, PatternSnapshot, SyncQueues};
use crate::timing::{TICK_FRAC_MASK, TICK_FRAC_SCALE, TickLength, TimingTables};
use crate::{CLOCK_HZ, MAX_AUDIO_FREQ, MIN_AUDIO_FREQ};

/// Replayer + mixer + sync producer, driven by the output callback
#[derive(Debug)]
pub struct AudioEngine {
    replayer: Replayer,
    mixer: Mixer,
    timing: TimingTables,
    sync: Arc<SyncQueues>,

    latency_secs: f64,
    /// Output latency in timestamp-clock units
    latency: TickLength,

    tick_samples_left: u32,
    tick_samples_frac: u64,

    tick_time: u64,
    tick_time_frac: u64,
    reset_tick_time: bool,
}

fn check_freq(freq: u32) -> Result<(), ReplayerError> {
    if (MIN_AUDIO_FREQ..=MAX_AUDIO_FREQ).contains(&freq) {
        Ok(())
    } else {
        Err(ReplayerError::SampleRate(freq))
    }
}

impl AudioEngine {
    /// Engine at the configured rate
    ///
    /// # Errors
    ///
    /// Returns [`ReplayerError::SampleRate`] for a rate outside 8-192 kHz.
    pub fn new(
        mut replayer: Replayer,
        config: &ReplayerConfig,
        sync: Arc<SyncQueues>,
    ) -> Result<Self, ReplayerError> {
        let freq = config.audio.sample_rate;
        check_freq(freq)?;

        replayer.set_linear_periods(config.playback.linear_periods);
        replayer.set_kill_notes_on_stop(config.playback.kill_notes_on_stop);

        let timing = TimingTables::new(freq, CLOCK_HZ);
        let mixer = Mixer::new(freq, timing.max_samples_per_tick(), &config.mixer);
        let latency_secs = config.audio.latency_secs();

        debug!(freq, latency_secs, "audio engine ready");
        Ok(Self {
            replayer,
            mixer,
            latency: TickLength::split(latency_secs * CLOCK_HZ),
            latency_secs,
            timing,
            sync,
            tick_samples_left: 0,
            tick_samples_frac: 0,
            tick_time: 0,
            tick_time_frac: 0,
            reset_tick_time: true,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn replayer(&self) -> &Replayer {
        &self.replayer
    }

    pub fn replayer_mut(&mut self) -> &mut Replayer {
        &mut self.replayer
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn timing(&self) -> &TimingTables {
        &self.timing
    }

    pub fn sync(&self) -> &Arc<SyncQueues> {
        &self.sync
    }

    pub fn freq(&self) -> u32 {
        self.timing.freq()
    }

    /// Samples left before the next tick runs
    pub fn tick_samples_left(&self) -> u32 {
        self.tick_samples_left
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Fill an interleaved i16 buffer
    pub fn render_i16(&mut self, out: &mut [i16], channels: usize, now: u64) {
        let channels = channels.max(1);
        let frames = out.len() / channels;
        let mut done = 0;
        while done < frames {
            let count = self.next_slice(frames - done, now);
            self.mixer
                .write_i16(&mut out[done * channels..], channels, count);
            done += count;
        }
    }

    /// Fill an interleaved f32 buffer
    pub fn render_f32(&mut self, out: &mut [f32], channels: usize, now: u64) {
        let channels = channels.max(1);
        let frames = out.len() / channels;
        let mut done = 0;
        while done < frames {
            let count = self.next_slice(frames - done, now);
            self.mixer
                .write_f32(&mut out[done * channels..], channels, count);
            done += count;
        }
    }

    /// Run a tick if one is due, then mix the longest slice that stays
    /// inside the tick
    fn next_slice(&mut self, remaining: usize, now: u64) -> usize {
        if self.tick_samples_left == 0 {
            self.run_tick(now);
        }

        let count = remaining
            .min(self.tick_samples_left as usize)
            .min(self.mixer.max_block());
        let num_channels = self.replayer.num_channels();
        self.mixer
            .mix(&self.replayer.instruments, num_channels, 0, count);
        self.tick_samples_left -= count as u32;
        count
    }

    /// One replayer tick plus everything the mixer and display need from it
    pub(crate) fn run_tick(&mut self, now: u64) {
        if self.mixer.volume_ramping() {
            self.mixer.save_ramps();
        }

        self.replayer.tick();

        let spt = self.timing.samples_per_tick(self.replayer.bpm());
        self.mixer
            .set_ramp_lengths(self.timing.quick_ramp_samples(), spt.int);

        let linear = self.replayer.linear_periods();
        self.mixer.update_voices(
            &mut self.replayer.channels,
            &self.replayer.instruments,
            linear,
        );

        self.push_snapshots(now);

        self.tick_samples_left = spt.int;
        self.tick_samples_frac += spt.frac;
        if self.tick_samples_frac >= TICK_FRAC_SCALE {
            self.tick_samples_frac &= TICK_FRAC_MASK;
            self.tick_samples_left += 1;
        }
    }

    fn push_snapshots(&mut self, now: u64) {
        if self.reset_tick_time {
            self.reset_tick_time = false;
            self.tick_time = now + self.latency.int as u64;
            self.tick_time_frac = self.latency.frac;
        }

        if self.replayer.is_playing() {
            let pos = self.replayer.synced_position();
            self.sync.pattern.push(PatternSnapshot {
                pattern: pos.pattern,
                global_volume: self.replayer.global_volume(),
                song_pos: pos.song_pos,
                tick: pos.tick,
                speed: self.replayer.speed(),
                bpm: self.replayer.bpm(),
                row: pos.row,
                timestamp: self.tick_time,
            });
        }

        self.sync.channels.push(self.channel_snapshot());

        let step = self.timing.tick_time(self.replayer.bpm());
        self.tick_time += step.int as u64;
        self.tick_time_frac += step.frac;
        if self.tick_time_frac >= TICK_FRAC_SCALE {
            self.tick_time_frac &= TICK_FRAC_MASK;
            self.tick_time += 1;
        }
    }

    fn channel_snapshot(&self) -> ChannelSnapshot {
        let mut snapshot = ChannelSnapshot {
            timestamp: self.tick_time,
            rate: self.timing.freq(),
            ..Default::default()
        };

        let table = &self.replayer.instruments;
        let num_channels = self.replayer.num_channels().min(MAX_CHANNELS);
        let voices = self.mixer.voices();
        for (i, (state, ch)) in snapshot
            .channels
            .iter_mut()
            .zip(&self.replayer.channels)
            .enumerate()
            .take(num_channels)
        {
            let ins = table.resolve_or_placeholder(ch.instrument_handle());
            *state = ChannelState {
                voice_delta: voices[i].delta(),
                final_period: ch.final_period(),
                finetune: ch.finetune(),
                relative_note: ch.relative_note(),
                instrument: ch.instrument_number(),
                sample: ch.sample_number(),
                env_sustain_active: ch.env_sustain_active(ins),
                status: ch.last_status().bits(),
                final_volume: ch.final_volume(),
                start_pos: ch.sample_start(),
                ..Default::default()
            };

            if let Some(sample) = table.sample(ch.instrument_handle(), ch.sample_number()) {
                state.sample_length = sample.length();
                state.loop_start = sample.loop_start();
                state.loop_length = sample.loop_length();
                state.loop_mode = sample.loop_mode() as u8;
            }
        }
        snapshot
    }

    // =========================================================================
    // Control
    // =========================================================================

    /// Silence every channel and voice and restart the dither
    pub fn stop_voices(&mut self) {
        self.replayer.stop_voices();
        self.mixer.stop_voices();
    }

    /// Stamp the next tick relative to the clock again
    pub fn reset_tick_time(&mut self) {
        self.reset_tick_time = true;
    }

    /// Start playback with the tick counters zeroed so a tick runs at once
    pub fn start_playing(&mut self, mode: PlayMode, row: i16) {
        self.replayer.start_playing(mode, row);
        self.tick_samples_left = 0;
        self.tick_samples_frac = 0;
    }

    pub fn stop_playing(&mut self) {
        self.replayer.stop_playing();
        if self.replayer.kill_notes_on_stop() {
            self.stop_voices();
        }
    }

    /// Switch the output rate
    ///
    /// Tick lengths, ramp lengths and every voice delta are recomputed. The
    /// caller holds the pause guard.
    pub fn set_audio_freq(&mut self, freq: u32) -> Result<(), ReplayerError> {
        check_freq(freq)?;
        if freq == self.timing.freq() {
            return Ok(());
        }

        self.timing = TimingTables::new(freq, CLOCK_HZ);
        self.mixer.set_freq(
            freq,
            self.timing.max_samples_per_tick(),
            self.replayer.linear_periods(),
        );
        self.tick_samples_left = 0;
        self.tick_samples_frac = 0;
        self.reset_tick_time = true;
        debug!(freq, "audio frequency changed");
        Ok(())
    }

    /// Output latency used to project snapshot timestamps
    pub fn set_latency(&mut self, secs: f64) {
        if !secs.is_finite() || secs < 0.0 {
            warn!(secs, "ignoring invalid latency");
            return;
        }
        self.latency_secs = secs;
        self.latency = TickLength::split(secs * CLOCK_HZ);
        self.reset_tick_time = true;
    }

    pub fn latency_secs(&self) -> f64 {
        self.latency_secs
    }

    pub fn set_bpm(&mut self, bpm: u16) {
        self.replayer.set_bpm(bpm);
    }

    pub fn set_linear_periods(&mut self, linear: bool) {
        self.replayer.set_linear_periods(linear);
        self.mixer.recompute_deltas(linear);
    }

    /// Apply new mixer settings without touching the voices' positions
    pub fn apply_mixer_settings(&mut self, settings: &MixerSettings) {
        self.mixer.set_interpolation(settings.interpolation);
        self.mixer.set_volume_ramping(settings.volume_ramping);
        self.mixer.set_amplification(settings.amplification);
        self.mixer.set_master_volume(settings.master_volume);
    }
}
