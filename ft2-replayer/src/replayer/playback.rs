//! Playback control surface
//!
//! These mutate the engine context directly. Callers outside the audio
//! thread reach them through `EngineHandle`. Changes that can invalidate a
//! sample reference (starting playback, killing notes, rate or period mode
//! switches) run under its pause guard; position, tempo, mute and tone
//! changes only take the short engine lock.

use ft2_song::{InstrumentTable, MAX_CHANNELS, MAX_PATTERN_NOTE, NOTE_OFF, Song};
use tracing::{debug, warn};

use super::row::{release, retrigger_instrument, trigger_note};
use super::{MAX_GLOBAL_VOLUME, PlayMode, Replayer};
use crate::channels::{Channel, ChannelStatus};
use crate::error::ReplayerError;
use crate::timing::clamp_bpm;
use crate::{MAX_BPM, MIN_BPM};

impl Replayer {
    /// Replace the song and rewind to its start
    ///
    /// Voices must already be stopped: channel handles are reset to the
    /// placeholder instrument.
    pub fn set_song(&mut self, song: Song) {
        self.song = song;
        self.speed = self.song.initial_speed.max(1) as u16;
        self.bpm = clamp_bpm(self.song.initial_bpm as u16);
        self.global_volume = self.song.global_volume.min(MAX_GLOBAL_VOLUME);
        self.mode = PlayMode::Idle;
        self.reset_channels();
        self.reset_replayer_state();
        self.reset_playback_time();
        self.set_pos(0, 0, true);
        debug!(name = %self.song.name, channels = self.song.num_channels(), "song loaded");
    }

    /// Song data for editing; only valid while the engine is paused
    pub fn song_mut(&mut self) -> &mut Song {
        &mut self.song
    }

    /// Instrument table for loading and freeing; only valid while the engine
    /// is paused
    pub fn instruments_mut(&mut self) -> &mut InstrumentTable {
        &mut self.instruments
    }

    /// Start playback in `Song` or `Pattern` mode at a row
    ///
    /// `Song` mode starts at the current order position, `Pattern` mode loops
    /// the current pattern. Requesting `Idle` stops playback.
    pub fn start_playing(&mut self, mode: PlayMode, row: i16) {
        match mode {
            PlayMode::Idle => {
                self.stop_playing();
                return;
            }
            PlayMode::Pattern => self.set_pos(-1, row, true),
            PlayMode::Song => self.set_pos(self.song_pos, row, true),
        }

        self.mode = mode;
        self.reset_replayer_state();
        self.reset_playback_time();
        if self.speed == 0 {
            self.speed = self.song.initial_speed.max(1) as u16;
        }
        debug!(?mode, pos = self.song_pos, row = self.row, "start playing");
    }

    /// Stop reading pattern data
    ///
    /// Notes are released unless `kill_notes_on_stop` is set, in which case
    /// the caller is expected to stop the voices as well.
    pub fn stop_playing(&mut self) {
        self.mode = PlayMode::Idle;
        if !self.kill_notes_on_stop {
            for i in 0..MAX_CHANNELS {
                self.release_tone(i);
            }
        }
        self.tick = 1;
        self.global_volume = MAX_GLOBAL_VOLUME;
        debug!(pos = self.song_pos, row = self.row, "stop playing");
    }

    /// Move playback to an order position and row
    ///
    /// A negative argument leaves that coordinate unchanged; both are clamped
    /// to the song. `reset_timer` makes the next tick read a row.
    pub fn set_pos(&mut self, song_pos: i16, row: i16, reset_timer: bool) {
        if song_pos > -1 {
            let length = self.song.song_length() as i16;
            self.song_pos = song_pos.min(length - 1).max(0);
            self.pattern_num = self.song.pattern_at_order(self.song_pos as u16);
            self.num_rows = self.song.pattern_rows(self.pattern_num);
        }

        if row > -1 {
            self.row = row.min(self.num_rows as i16 - 1).max(0);
        }

        if reset_timer {
            self.tick = 1;
        }
    }

    /// Select the pattern `Pattern` mode loops
    pub fn select_pattern(&mut self, pattern: u8) {
        self.pattern_num = pattern;
        self.num_rows = self.song.pattern_rows(pattern);
        if self.row >= self.num_rows as i16 {
            self.row = 0;
        }
    }

    pub fn set_bpm(&mut self, bpm: u16) {
        if !(MIN_BPM as u16..=MAX_BPM as u16).contains(&bpm) {
            warn!(bpm, "BPM out of range, clamping");
        }
        self.bpm = clamp_bpm(bpm);
    }

    /// Ticks per row; 0 is ignored
    pub fn set_speed(&mut self, speed: u8) {
        if speed == 0 {
            warn!("ignoring speed 0");
            return;
        }
        self.speed = speed as u16;
    }

    pub fn set_global_volume(&mut self, volume: u8) {
        self.global_volume = volume.min(MAX_GLOBAL_VOLUME);
        self.refresh_volumes();
    }

    /// Switch between linear and Amiga periods
    ///
    /// Running notes keep their period until their next update.
    pub fn set_linear_periods(&mut self, linear: bool) {
        self.linear_periods = linear;
    }

    /// Mute or unmute a channel; muted channels only run flow commands
    pub fn set_channel_muted(&mut self, channel: usize, muted: bool) -> Result<(), ReplayerError> {
        let ch = self
            .channels
            .get_mut(channel)
            .ok_or(ReplayerError::InvalidChannel(channel))?;
        self.muted[channel] = muted;
        ch.muted = muted;

        if muted {
            ch.efx = 0;
            ch.efx_data = 0;
            ch.real_vol = 0;
            ch.out_vol = 0;
            ch.old_vol = 0;
            ch.final_vol = 0.0;
            ch.out_pan = 128;
            ch.old_pan = 128;
            ch.final_pan = 128;
            ch.status = ChannelStatus::UPDATE_VOL;
            // Keeps the piano key display from sticking
            ch.key_off = true;
        }
        Ok(())
    }

    pub fn is_channel_muted(&self, channel: usize) -> bool {
        self.muted.get(channel).copied().unwrap_or(false)
    }

    /// Play an instrument on a channel outside the pattern (keyboard jamming)
    ///
    /// `volume` overrides the sample's default volume. [`NOTE_OFF`] releases
    /// the channel's note.
    pub fn play_tone(
        &mut self,
        channel: usize,
        instrument: u8,
        note: u8,
        volume: Option<u8>,
    ) -> Result<(), ReplayerError> {
        if channel >= MAX_CHANNELS {
            return Err(ReplayerError::InvalidChannel(channel));
        }
        let ins = self
            .instruments
            .get(instrument as usize)
            .ok_or(ReplayerError::InvalidInstrument(instrument as usize))?;

        if note != NOTE_OFF {
            if note == 0 || note > MAX_PATTERN_NOTE {
                return Err(ReplayerError::InvalidNote(note));
            }
            let sample = ins
                .sample(ins.sample_for_note(note) as usize)
                .filter(|s| s.length() > 0)
                .ok_or(ReplayerError::InvalidNote(note))?;
            let final_note = note as i16 + sample.relative_note as i16;
            if !(1..120).contains(&final_note) {
                return Err(ReplayerError::InvalidNote(note));
            }
        }

        let linear = self.linear_periods;
        let ch = &mut self.channels[channel];
        if instrument != 0 && note != NOTE_OFF {
            ch.copy_of_instr_and_note = ((instrument as u16) << 8) | (ch.copy_of_instr_and_note & 0xFF);
            ch.instr_num = instrument;
        }
        ch.copy_of_instr_and_note = (ch.copy_of_instr_and_note & 0xFF00) | note as u16;
        ch.efx = 0;
        ch.efx_data = 0;

        trigger_note(ch, &self.instruments, linear, note, 0, 0);

        if note != NOTE_OFF {
            ch.reset_volumes();
            retrigger_instrument(ch, &self.instruments);
            if let Some(vol) = volume {
                let vol = vol.min(64);
                ch.real_vol = vol;
                ch.out_vol = vol;
                ch.old_vol = vol;
            }
        }

        self.update_vol_pan_auto_vib(channel);
        Ok(())
    }

    /// Key off a channel the way a released jam key does
    fn release_tone(&mut self, channel: usize) {
        let ch = &mut self.channels[channel];
        ch.copy_of_instr_and_note = (ch.copy_of_instr_and_note & 0xFF00) | NOTE_OFF as u16;
        ch.efx = 0;
        ch.efx_data = 0;
        release(ch, &self.instruments);
        self.update_vol_pan_auto_vib(channel);
    }

    /// Reset every channel to silence, dropping instrument references
    ///
    /// The caller stops the mixer's voices alongside.
    pub fn stop_voices(&mut self) {
        for ch in &mut self.channels {
            ch.silence();
        }
    }

    /// Fresh channel state, keeping the mute flags
    pub fn reset_channels(&mut self) {
        for (ch, &muted) in self.channels.iter_mut().zip(&self.muted) {
            *ch = Channel::new(muted);
        }
    }

    /// Clear break, jump, delay and loop state before playback starts
    pub(super) fn reset_replayer_state(&mut self) {
        self.patt_del_time = 0;
        self.patt_del_time2 = 0;
        self.pos_jump_flag = false;
        self.p_break_pos = 0;
        self.p_break_flag = false;
        self.break_latched = false;
        self.bxx_overflow = false;

        let num_channels = self.song.num_channels().min(MAX_CHANNELS);
        for ch in &mut self.channels[..num_channels] {
            ch.loop_start_row = 0;
            ch.loop_counter = 0;
        }

        if self.is_playing() {
            self.global_volume = self.song.global_volume.min(MAX_GLOBAL_VOLUME);
            self.refresh_volumes();
        }
    }

    pub fn reset_playback_time(&mut self) {
        self.playback_seconds = 0;
        self.playback_seconds_frac = 0;
        self.song_loops = 0;
    }

    /// Whole seconds of playback since the last start
    pub fn playback_seconds(&self) -> u32 {
        self.playback_seconds
    }
}
