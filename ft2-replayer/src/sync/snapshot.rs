//! Snapshot types carried by the sync queues

use ft2_song::MAX_CHANNELS;
use serde::Serialize;

use crate::channels::ChannelStatus;
use crate::pitch::piano_key;

/// Queue entries stamped with the time they become audible
pub trait Timestamped {
    fn timestamp(&self) -> u64;
}

/// Sequencer position for display, one per played tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PatternSnapshot {
    pub pattern: u8,
    pub global_volume: u8,
    pub song_pos: u8,
    pub tick: u8,
    pub speed: u16,
    pub bpm: u8,
    pub row: u8,
    pub timestamp: u64,
}

impl Timestamped for PatternSnapshot {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// Per-channel view the scopes and piano display need
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelState {
    pub voice_delta: u64,
    pub final_period: u16,
    pub finetune: i8,
    pub relative_note: i8,
    pub instrument: u8,
    pub sample: u8,
    pub env_sustain_active: bool,
    /// [`ChannelStatus`] bits consumed by the mixer this tick
    pub status: u8,
    pub final_volume: f32,
    pub start_pos: u32,

    // Sample geometry for the scope trackers
    pub sample_length: u32,
    pub loop_start: u32,
    pub loop_length: u32,
    /// 0 = off, 1 = forward, 2 = ping-pong
    pub loop_mode: u8,
}

impl ChannelState {
    pub fn status(&self) -> ChannelStatus {
        ChannelStatus::from_bits(self.status)
    }

    /// Piano key currently sounding, `None` when nothing is
    pub fn piano_key(&self, linear: bool) -> Option<u8> {
        if self.final_period == 0 || self.instrument == 0 {
            return None;
        }
        let key = piano_key(self.final_period, self.finetune, self.relative_note, linear);
        u8::try_from(key).ok().filter(|&k| k < 96)
    }
}

/// Every channel's state after one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelSnapshot {
    pub timestamp: u64,
    /// Output rate the deltas were computed for
    pub rate: u32,
    pub channels: [ChannelState; MAX_CHANNELS],
}

impl Timestamped for ChannelSnapshot {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}
