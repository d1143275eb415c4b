//! Scope position trackers
//!
//! Scopes follow each channel's sample position for display without touching
//! the mixer. They run on their own thread at [`SCOPE_HZ`], start and retune
//! from due channel snapshots, and move with the same wrap rules as the
//! mixer's voices, so forward and ping-pong loops look the same as they
//! sound.

#[cfg(test)]
mod tests;

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ft2_song::{LoopMode, MAX_CHANNELS};
use tracing::{debug, trace};

use crate::SCOPE_HZ;
use crate::channels::ChannelStatus;
use crate::clock::Clock;
use crate::error::ReplayerError;
use crate::sync::{ChannelState, SyncQueues};
use crate::voice::Voice;

/// One channel's display tracker
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope {
    voice: Voice,
    volume: f32,
}

fn loop_mode_from_raw(raw: u8) -> LoopMode {
    match raw {
        1 => LoopMode::Forward,
        2 => LoopMode::PingPong,
        _ => LoopMode::Off,
    }
}

impl Scope {
    /// Restart at the channel's sample start
    pub fn trigger(&mut self, state: &ChannelState) {
        let mode = if state.loop_length < 1 {
            LoopMode::Off
        } else {
            loop_mode_from_raw(state.loop_mode)
        };
        let end = match mode {
            LoopMode::Off => state.sample_length,
            _ => state.loop_start + state.loop_length,
        };

        let voice = &mut self.voice;
        voice.loop_mode = mode;
        voice.loop_start = state.loop_start;
        voice.loop_length = state.loop_length;
        voice.sample_end = end;
        voice.sample = state.sample;
        voice.position = state.start_pos;
        voice.frac = 0;
        voice.backwards = false;
        voice.has_looped = false;
        voice.delta = state.voice_delta;
        voice.active = state.sample_length > 0 && state.start_pos < end;
        self.volume = state.final_volume;
    }

    /// Follow pitch and volume changes without restarting
    pub fn update(&mut self, state: &ChannelState) {
        self.voice.delta = state.voice_delta;
        self.volume = state.final_volume;
    }

    pub fn advance(&mut self, samples: u32) {
        self.voice.skip(samples);
    }

    pub fn stop(&mut self) {
        self.voice.active = false;
        self.volume = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.voice.is_active()
    }

    /// Sample index being played, `None` when the scope is idle
    pub fn position(&self) -> Option<i32> {
        self.is_active()
            .then(|| self.voice.read_position().0 as i32)
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

/// All channel scopes plus the pacing state of the scope clock
#[derive(Debug, Clone)]
pub struct ScopeSet {
    scopes: [Scope; MAX_CHANNELS],
    rate: u32,
    /// 32.32 accumulator of output samples per scope tick
    sample_acc: u64,
    stop_epoch: u64,
}

impl Default for ScopeSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeSet {
    pub fn new() -> Self {
        Self {
            scopes: [Scope::default(); MAX_CHANNELS],
            rate: 0,
            sample_acc: 0,
            stop_epoch: 0,
        }
    }

    pub fn scope(&self, channel: usize) -> Option<&Scope> {
        self.scopes.get(channel)
    }

    pub fn stop_all(&mut self) {
        for scope in &mut self.scopes {
            scope.stop();
        }
    }

    /// One scope tick: move running scopes, then apply the newest due snapshot
    pub fn update(&mut self, sync: &SyncQueues, now: u64) {
        let epoch = sync.stop_epoch();
        if epoch != self.stop_epoch {
            self.stop_epoch = epoch;
            self.stop_all();
        }

        if self.rate > 0 {
            self.sample_acc += ((self.rate as u64) << 32) / SCOPE_HZ as u64;
            let samples = (self.sample_acc >> 32) as u32;
            self.sample_acc &= 0xFFFF_FFFF;
            for scope in &mut self.scopes {
                scope.advance(samples);
            }
        }

        let Some(snapshot) = sync.drain_channels_until(now) else {
            return;
        };
        self.rate = snapshot.rate;

        for (scope, state) in self.scopes.iter_mut().zip(&snapshot.channels) {
            let status = state.status();
            if status.contains(ChannelStatus::TRIGGER_VOICE) {
                scope.trigger(state);
            } else if !status.is_empty() {
                scope.update(state);
            }
        }
        trace!(timestamp = snapshot.timestamp, "scopes synced");
    }
}

/// Background thread ticking a [`ScopeSet`] at [`SCOPE_HZ`]
pub struct ScopeThread {
    scopes: Arc<Mutex<ScopeSet>>,
    /// Dropped to stop the thread
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ScopeThread {
    /// Start the thread
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the OS refuses to create the thread.
    pub fn spawn(sync: Arc<SyncQueues>, clock: Clock) -> Result<Self, ReplayerError> {
        let scopes = Arc::new(Mutex::new(ScopeSet::new()));
        let (shutdown, rx) = mpsc::channel::<()>();
        let period = Duration::from_nanos(1_000_000_000 / SCOPE_HZ as u64);

        let worker_scopes = Arc::clone(&scopes);
        let handle = thread::Builder::new()
            .name("ft2-scopes".into())
            .spawn(move || {
                debug!("scope thread started");
                loop {
                    match rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => {
                            let mut scopes = worker_scopes.lock().unwrap_or_else(|e| e.into_inner());
                            scopes.update(&sync, clock.now());
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("scope thread exiting");
            })?;

        Ok(Self {
            scopes,
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    fn with_scopes<R>(&self, f: impl FnOnce(&mut ScopeSet) -> R) -> R {
        let mut scopes = self.scopes.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut scopes)
    }

    pub fn sample_position(&self, channel: usize) -> Option<i32> {
        self.with_scopes(|s| s.scope(channel).and_then(Scope::position))
    }

    pub fn volume(&self, channel: usize) -> f32 {
        self.with_scopes(|s| s.scope(channel).map(Scope::volume).unwrap_or(0.0))
    }

    pub fn stop_all(&self) {
        self.with_scopes(ScopeSet::stop_all);
    }

    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ScopeThread {
    fn drop(&mut self) {
        // Dropping the sender wakes recv_timeout with Disconnected
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
