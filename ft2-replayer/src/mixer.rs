//! Voice mixer
//!
//! Owns two voices per channel: the live voice at index `i` and its fade-out
//! voice at `MAX_CHANNELS + i`. Once per tick [`Mixer::update_voices`]
//! consumes the channels' status bits, then [`Mixer::mix`] renders blocks of
//! up to one tick into float accumulation buffers that the output stage
//! normalizes into the device format.

mod output;

#[cfg(test)]
mod tests;

use ft2_song::{InstrumentTable, MAX_CHANNELS};
use tracing::trace;

use crate::channels::{Channel, ChannelStatus};
use crate::config::MixerSettings;
use crate::pitch::PitchTables;
use crate::tables::PAN_TAB;
use crate::voice::{Interpolation, Voice};
use crate::{MAX_AMPLIFICATION, MAX_MASTER_VOLUME, MAX_VOICES};

pub use output::Dither;

/// Multi-voice resampling mixer
#[derive(Debug, Clone)]
pub struct Mixer {
    pitch: PitchTables,
    voices: Vec<Voice>,
    mix_l: Vec<f32>,
    mix_r: Vec<f32>,

    interpolation: Interpolation,
    volume_ramping: bool,
    amplification: u32,
    master_volume: u32,

    quick_ramp_samples: u32,
    tick_ramp_samples: u32,

    /// Last period → delta conversion, shared by all voices
    cached_period: Option<u16>,
    cached_delta: u64,

    dither: Dither,
}

impl Mixer {
    /// Mixer for an output rate with buffers for `max_block` samples
    pub fn new(freq: u32, max_block: usize, settings: &MixerSettings) -> Self {
        Self {
            pitch: PitchTables::new(freq),
            voices: vec![Voice::default(); MAX_VOICES],
            mix_l: vec![0.0; max_block],
            mix_r: vec![0.0; max_block],
            interpolation: settings.interpolation,
            volume_ramping: settings.volume_ramping,
            amplification: settings.amplification.clamp(1, MAX_AMPLIFICATION),
            master_volume: settings.master_volume.min(MAX_MASTER_VOLUME),
            quick_ramp_samples: 0,
            tick_ramp_samples: 0,
            cached_period: None,
            cached_delta: 0,
            dither: Dither::default(),
        }
    }

    pub fn freq(&self) -> u32 {
        self.pitch.freq()
    }

    /// Largest block [`Mixer::mix`] accepts
    pub fn max_block(&self) -> usize {
        self.mix_l.len()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn volume_ramping(&self) -> bool {
        self.volume_ramping
    }

    pub fn amplification(&self) -> u32 {
        self.amplification
    }

    pub fn master_volume(&self) -> u32 {
        self.master_volume
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Switch to a new output rate
    ///
    /// Pitch tables are rebuilt and every voice delta is recomputed from its
    /// stored period, so playing notes keep their pitch.
    pub fn set_freq(&mut self, freq: u32, max_block: usize, linear: bool) {
        self.pitch = PitchTables::new(freq);
        self.resize(max_block);
        self.recompute_deltas(linear);
    }

    pub fn resize(&mut self, max_block: usize) {
        self.mix_l.resize(max_block, 0.0);
        self.mix_r.resize(max_block, 0.0);
    }

    /// Ramp lengths for quick (trigger) and normal (per tick) changes
    pub fn set_ramp_lengths(&mut self, quick: u32, tick: u32) {
        self.quick_ramp_samples = quick;
        self.tick_ramp_samples = tick;
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
        for voice in &mut self.voices {
            voice.interpolation = interpolation;
        }
    }

    pub fn set_volume_ramping(&mut self, enabled: bool) {
        self.volume_ramping = enabled;
    }

    pub fn set_amplification(&mut self, amplification: u32) {
        self.amplification = amplification.clamp(1, MAX_AMPLIFICATION);
    }

    pub fn set_master_volume(&mut self, volume: u32) {
        self.master_volume = volume.min(MAX_MASTER_VOLUME);
    }

    /// Output gain: a full-scale voice at amplification 32 and master 256 is 1.0
    pub fn normalization(&self) -> f32 {
        (self.amplification * self.master_volume) as f32
            / (MAX_AMPLIFICATION * MAX_MASTER_VOLUME) as f32
    }

    /// Recompute every voice delta after a rate or period-mode change
    pub fn recompute_deltas(&mut self, linear: bool) {
        self.cached_period = None;
        for voice in &mut self.voices {
            let delta = self.pitch.period_to_delta(voice.period as u32, linear);
            voice.set_delta(delta, self.interpolation);
        }
    }

    /// Stop all voices and reset the dither state
    pub fn stop_voices(&mut self) {
        for voice in &mut self.voices {
            voice.stop();
        }
        self.dither.reset();
    }

    pub fn reset_dither(&mut self) {
        self.dither.reset();
    }

    // =========================================================================
    // Per-tick voice updates
    // =========================================================================

    /// Finish every running ramp before a new tick's changes are applied
    pub fn save_ramps(&mut self) {
        for voice in &mut self.voices {
            voice.snap_ramp();
            if voice.is_fade_out {
                voice.active = false;
            }
        }
    }

    /// Apply the channels' pending status to their voices
    ///
    /// Order per channel: volume, panning, ramp setup, period, trigger. The
    /// consumed status is kept in `tmp_status` for the sync snapshot.
    pub fn update_voices(&mut self, channels: &mut [Channel], table: &InstrumentTable, linear: bool) {
        for (i, ch) in channels.iter_mut().enumerate().take(MAX_CHANNELS) {
            let status = ch.status;
            ch.tmp_status = status;
            if status.is_empty() {
                continue;
            }
            ch.status = ChannelStatus::empty();

            let voice = &mut self.voices[i];
            if status.contains(ChannelStatus::UPDATE_VOL) {
                voice.volume = ch.final_vol;
            }
            if status.contains(ChannelStatus::UPDATE_PAN) {
                voice.panning = ch.final_pan;
            }
            if status.intersects(ChannelStatus::UPDATE_VOL | ChannelStatus::UPDATE_PAN) {
                self.update_volumes(i, status);
            }

            if status.contains(ChannelStatus::UPDATE_PERIOD) {
                let delta = self.period_delta(ch.final_period, linear);
                let voice = &mut self.voices[i];
                voice.period = ch.final_period;
                voice.set_delta(delta, self.interpolation);
            }

            if status.contains(ChannelStatus::TRIGGER_VOICE) {
                let voice = &mut self.voices[i];
                match table.sample(ch.instrument, ch.sample) {
                    Some(sample) => voice.trigger(sample, ch.instrument, ch.sample, ch.smp_start_pos),
                    None => {
                        trace!(channel = i, sample = ch.sample, "trigger on missing sample");
                        voice.active = false;
                    }
                }
            }
        }
    }

    fn period_delta(&mut self, period: u16, linear: bool) -> u64 {
        if self.cached_period != Some(period) {
            self.cached_period = Some(period);
            self.cached_delta = self.pitch.period_to_delta(period as u32, linear);
        }
        self.cached_delta
    }

    /// Derive ramp targets from a voice's volume and panning
    fn update_volumes(&mut self, index: usize, status: ChannelStatus) {
        let voice = &mut self.voices[index];
        let target_l = voice.volume * PAN_TAB[256 - voice.panning as usize];
        let target_r = voice.volume * PAN_TAB[voice.panning as usize];
        voice.target_vol_l = target_l;
        voice.target_vol_r = target_r;

        if !self.volume_ramping {
            voice.snap_ramp();
            return;
        }

        if status.contains(ChannelStatus::TRIGGER_VOICE) {
            if voice.curr_vol_l > 0.0 || voice.curr_vol_r > 0.0 {
                // Let the old note ramp out next to the new one
                let mut fade = *voice;
                fade.is_fade_out = true;
                fade.target_vol_l = 0.0;
                fade.target_vol_r = 0.0;
                fade.start_ramp(self.quick_ramp_samples);
                self.voices[MAX_CHANNELS + index] = fade;
            }
            let voice = &mut self.voices[index];
            voice.curr_vol_l = 0.0;
            voice.curr_vol_r = 0.0;
        }

        let voice = &mut self.voices[index];
        if voice.curr_vol_l == target_l && voice.curr_vol_r == target_r {
            voice.snap_ramp();
        } else if status.contains(ChannelStatus::USE_QUICK_VOLRAMP) {
            voice.start_ramp(self.quick_ramp_samples);
        } else {
            voice.start_ramp(self.tick_ramp_samples);
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Accumulate `count` samples of the first `num_channels` channels'
    /// voices at `offset` in the mix buffers
    pub fn mix(&mut self, table: &InstrumentTable, num_channels: usize, offset: usize, count: usize) {
        let end = (offset + count).min(self.mix_l.len());
        if offset >= end {
            return;
        }
        let left = &mut self.mix_l[offset..end];
        let right = &mut self.mix_r[offset..end];

        let num_channels = num_channels.min(MAX_CHANNELS);
        let lanes = (0..num_channels).flat_map(|i| [i, MAX_CHANNELS + i]);
        for index in lanes {
            let voice = &mut self.voices[index];
            if !voice.active {
                continue;
            }
            match table.sample(voice.instrument, voice.sample) {
                Some(sample) => voice.render(sample, left, right),
                None => {
                    trace!(voice = index, "sample vanished, stopping voice");
                    voice.active = false;
                }
            }
        }
    }

    /// Mixed left/right accumulation buffers
    pub fn buffers(&self) -> (&[f32], &[f32]) {
        (&self.mix_l, &self.mix_r)
    }
}
