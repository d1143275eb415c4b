//! Shared engine handle and the pause guard

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

use ft2_song::{InstrumentTable, Song};
use tracing::debug;

use crate::clock::Clock;
use crate::error::ReplayerError;
use crate::replayer::PlayMode;
use crate::scheduler::AudioEngine;
use crate::sync::SyncQueues;

/// Cloneable handle to a running engine
#[derive(Debug, Clone)]
pub struct EngineHandle {
    engine: Arc<Mutex<AudioEngine>>,
    sync: Arc<SyncQueues>,
    clock: Clock,
}

/// Exclusive access to a paused engine
///
/// While the guard lives every voice is stopped, the sync queues are empty
/// and disabled, and the device outputs silence. Dropping it re-arms the
/// timestamp clock and re-enables the queues.
pub struct PauseGuard<'a> {
    engine: MutexGuard<'a, AudioEngine>,
    sync: &'a SyncQueues,
}

impl Deref for PauseGuard<'_> {
    type Target = AudioEngine;

    fn deref(&self) -> &AudioEngine {
        &self.engine
    }
}

impl DerefMut for PauseGuard<'_> {
    fn deref_mut(&mut self) -> &mut AudioEngine {
        &mut self.engine
    }
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        self.engine.reset_tick_time();
        self.sync.set_enabled(true);
    }
}

impl EngineHandle {
    pub fn new(engine: AudioEngine, clock: Clock) -> Self {
        let sync = Arc::clone(engine.sync());
        Self {
            engine: Arc::new(Mutex::new(engine)),
            sync,
            clock,
        }
    }

    pub fn sync(&self) -> &Arc<SyncQueues> {
        &self.sync
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Short lock for changes that keep every sample reference valid
    pub fn lock(&self) -> MutexGuard<'_, AudioEngine> {
        self.engine.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stop the mixer and take the engine exclusively
    pub fn pause(&self) -> PauseGuard<'_> {
        let mut engine = self.lock();
        self.sync.set_enabled(false);
        engine.stop_voices();
        engine.reset_tick_time();
        self.sync.reset();
        self.sync.bump_stop_epoch();
        PauseGuard {
            engine,
            sync: &self.sync,
        }
    }

    pub fn is_paused(&self) -> bool {
        !self.sync.is_enabled()
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Render into an interleaved i16 buffer; silence while paused
    pub fn render_i16(&self, out: &mut [i16], channels: usize) {
        if self.is_paused() {
            out.fill(0);
            return;
        }
        let now = self.clock.now();
        self.lock().render_i16(out, channels, now);
    }

    /// Render into an interleaved f32 buffer; silence while paused
    pub fn render_f32(&self, out: &mut [f32], channels: usize) {
        if self.is_paused() {
            out.fill(0.0);
            return;
        }
        let now = self.clock.now();
        self.lock().render_f32(out, channels, now);
    }

    /// Render into an interleaved u16 buffer through an i16 `scratch`
    ///
    /// Buffers longer than `scratch` are rendered in whole-frame chunks, so
    /// nothing is allocated here.
    pub fn render_u16(&self, out: &mut [u16], channels: usize, scratch: &mut [i16]) {
        let frame = channels.max(1);
        let chunk = scratch.len() - scratch.len() % frame;
        if chunk == 0 {
            out.fill(32768);
            return;
        }
        for out in out.chunks_mut(chunk) {
            let scratch = &mut scratch[..out.len()];
            self.render_i16(scratch, channels);
            for (dst, &s) in out.iter_mut().zip(scratch.iter()) {
                *dst = (s as i32 + 32768) as u16;
            }
        }
    }

    // =========================================================================
    // Control surface
    // =========================================================================

    pub fn start_playing(&self, mode: PlayMode, row: i16) {
        self.pause().start_playing(mode, row);
    }

    /// Stop playback; held notes are released unless `kill_notes_on_stop`
    /// is set, in which case every voice is cut under the pause guard
    pub fn stop_playing(&self) {
        let kill = self.lock().replayer().kill_notes_on_stop();
        if kill {
            self.pause().stop_playing();
        } else {
            self.lock().stop_playing();
        }
    }

    pub fn set_pos(&self, song_pos: i16, row: i16) {
        self.lock().replayer_mut().set_pos(song_pos, row, true);
    }

    pub fn set_bpm(&self, bpm: u16) {
        self.lock().set_bpm(bpm);
    }

    pub fn set_audio_freq(&self, freq: u32) -> Result<(), ReplayerError> {
        self.pause().set_audio_freq(freq)
    }

    pub fn set_linear_periods(&self, linear: bool) {
        self.pause().set_linear_periods(linear);
    }

    pub fn set_channel_muted(&self, channel: usize, muted: bool) -> Result<(), ReplayerError> {
        self.lock().replayer_mut().set_channel_muted(channel, muted)
    }

    pub fn play_tone(
        &self,
        channel: usize,
        instrument: u8,
        note: u8,
        volume: Option<u8>,
    ) -> Result<(), ReplayerError> {
        self.lock()
            .replayer_mut()
            .play_tone(channel, instrument, note, volume)
    }

    /// Replace the song; playback stops
    pub fn load_song(&self, song: Song) {
        let mut engine = self.pause();
        engine.replayer_mut().set_song(song);
        debug!("song replaced");
    }

    /// Edit the instrument table with every voice stopped
    pub fn with_instruments<R>(&self, edit: impl FnOnce(&mut InstrumentTable) -> R) -> R {
        let mut engine = self.pause();
        edit(engine.replayer_mut().instruments_mut())
    }

    /// Edit song data (channel count, patterns) with every voice stopped
    pub fn with_song<R>(&self, edit: impl FnOnce(&mut Song) -> R) -> R {
        let mut engine = self.pause();
        edit(engine.replayer_mut().song_mut())
    }
}
