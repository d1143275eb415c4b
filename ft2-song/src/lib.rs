//! FT2 song data model
//!
//! The types in this crate describe a FastTracker II composition as the
//! replayer consumes it: an order list of patterns, a grid of note events per
//! pattern, and a table of instruments owning their PCM samples.
//!
//! # Architecture
//!
//! ```text
//!  ┌───────────────────────┐        ┌──────────────────────────────┐
//!  │ Song                  │        │ InstrumentTable (1 + 128)    │
//!  │  - orders[256]        │        │  - slot 0: placeholder       │
//!  │  - patterns[256]      │        │  - slots 1..=128: Arc<Instr> │
//!  │  - speed / BPM / vol  │        │  - generation per slot       │
//!  └──────────┬────────────┘        └──────────────┬───────────────┘
//!             │ NoteEvent                          │ InstrumentHandle
//!             ▼                                    ▼
//!        ┌───────────────────────────────────────────────┐
//!        │        ft2-replayer (channels, voices)        │
//!        └───────────────────────────────────────────────┘
//! ```
//!
//! Loading and saving module files is not handled here; callers build the
//! structures directly (or through their own loaders) and hand them to the
//! replayer while it is paused.

mod effects;
mod instrument;
mod pattern;
mod sample;
mod table;

#[cfg(test)]
mod tests;

pub use effects::{Effect, ExtendedEffect, VolumeCommand};
pub use instrument::{
    AutoVibrato, AutoVibratoWaveform, Envelope, EnvelopeFlags, EnvelopePoint, Instrument,
    MAX_ENVELOPE_POINTS, MAX_SAMPLES_PER_INSTRUMENT,
};
pub use pattern::{NoteEvent, Pattern};
pub use sample::{GUARD_TAPS, LoopMode, Sample, SampleData};
pub use table::{InstrumentHandle, InstrumentTable};

// =============================================================================
// Limits
// =============================================================================

/// Maximum number of tracker channels
pub const MAX_CHANNELS: usize = 32;

/// Number of pattern slots in a song
pub const MAX_PATTERNS: usize = 256;

/// Length of the order list
pub const MAX_ORDERS: usize = 256;

/// Maximum rows in a pattern
pub const MAX_ROWS: u16 = 256;

/// Number of real instrument slots (slot 0 is the placeholder)
pub const MAX_INSTRUMENTS: usize = 128;

/// Highest playable pattern note (B-7)
pub const MAX_PATTERN_NOTE: u8 = 96;

/// Note-off marker in the note column
pub const NOTE_OFF: u8 = 97;

/// Pattern row count used for freshly created patterns
pub const DEFAULT_PATTERN_ROWS: u16 = 64;

/// Errors raised while building song data
#[derive(Debug, thiserror::Error)]
pub enum SongError {
    #[error("instrument slot {0} is out of range (1..={max})", max = MAX_INSTRUMENTS)]
    InstrumentSlot(usize),
    #[error("pattern {0} is out of range")]
    PatternIndex(usize),
    #[error("order position {0} is out of range")]
    OrderIndex(usize),
    #[error("an instrument holds at most {max} samples, got {0}", max = MAX_SAMPLES_PER_INSTRUMENT)]
    TooManySamples(usize),
    #[error("channel count {0} is not an even number in 2..={max}", max = MAX_CHANNELS)]
    ChannelCount(usize),
}

// =============================================================================
// Song
// =============================================================================

/// A complete composition minus its instruments
#[derive(Debug, Clone)]
pub struct Song {
    /// Song name
    pub name: String,
    /// Number of channels in use (even, 2-32)
    pub(crate) num_channels: u8,
    /// Number of used entries in the order list (1-256)
    pub(crate) song_length: u16,
    /// Order position the song wraps to after the last order
    pub song_loop_start: u16,
    /// Pattern order list
    pub orders: [u8; MAX_ORDERS],
    /// Pattern slots (always `MAX_PATTERNS` long)
    pub(crate) patterns: Vec<Pattern>,
    /// Initial speed (ticks per row)
    pub initial_speed: u8,
    /// Initial BPM
    pub initial_bpm: u8,
    /// Initial global volume (0-64)
    pub global_volume: u8,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            name: String::new(),
            num_channels: 8,
            song_length: 1,
            song_loop_start: 0,
            orders: [0; MAX_ORDERS],
            patterns: vec![Pattern::new(DEFAULT_PATTERN_ROWS); MAX_PATTERNS],
            initial_speed: 6,
            initial_bpm: 125,
            global_volume: 64,
        }
    }
}

impl Song {
    /// Create an empty song with the given channel count
    pub fn new(num_channels: usize) -> Result<Self, SongError> {
        let mut song = Self::default();
        song.set_num_channels(num_channels)?;
        Ok(song)
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels as usize
    }

    /// Change the channel count
    ///
    /// Existing pattern data is re-strided so that columns keep their
    /// contents; new columns are empty.
    pub fn set_num_channels(&mut self, num_channels: usize) -> Result<(), SongError> {
        if !(2..=MAX_CHANNELS).contains(&num_channels) || num_channels % 2 != 0 {
            return Err(SongError::ChannelCount(num_channels));
        }
        for pattern in &mut self.patterns {
            pattern.conform(num_channels);
        }
        self.num_channels = num_channels as u8;
        Ok(())
    }

    pub fn song_length(&self) -> u16 {
        self.song_length
    }

    /// Set the number of used orders, clamped to 1-256
    pub fn set_song_length(&mut self, length: u16) {
        self.song_length = length.clamp(1, MAX_ORDERS as u16);
        if self.song_loop_start >= self.song_length {
            self.song_loop_start = 0;
        }
    }

    /// Set the order list from a slice and update the song length
    pub fn set_orders(&mut self, orders: &[u8]) -> Result<(), SongError> {
        if orders.is_empty() || orders.len() > MAX_ORDERS {
            return Err(SongError::OrderIndex(orders.len()));
        }
        self.orders = [0; MAX_ORDERS];
        self.orders[..orders.len()].copy_from_slice(orders);
        self.set_song_length(orders.len() as u16);
        Ok(())
    }

    /// Pattern number at an order position
    pub fn pattern_at_order(&self, song_pos: u16) -> u8 {
        self.orders
            .get(song_pos as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn pattern(&self, index: u8) -> &Pattern {
        &self.patterns[index as usize]
    }

    pub fn pattern_mut(&mut self, index: u8) -> &mut Pattern {
        &mut self.patterns[index as usize]
    }

    /// Replace a pattern slot
    ///
    /// The pattern is re-strided to the song's channel count if it was built
    /// for a different one.
    pub fn set_pattern(&mut self, index: usize, mut pattern: Pattern) -> Result<(), SongError> {
        if index >= MAX_PATTERNS {
            return Err(SongError::PatternIndex(index));
        }
        pattern.conform(self.num_channels as usize);
        self.patterns[index] = pattern;
        Ok(())
    }

    /// Row count of a pattern (1-256)
    pub fn pattern_rows(&self, index: u8) -> u16 {
        self.patterns[index as usize].num_rows()
    }

    /// Write a cell, allocating the pattern on first use
    ///
    /// Returns `false` when the row or channel is out of range.
    pub fn set_note(&mut self, pattern: u8, row: u16, channel: usize, event: NoteEvent) -> bool {
        let channels = self.num_channels as usize;
        match self.patterns[pattern as usize].note_mut(row, channel, channels) {
            Some(cell) => {
                *cell = event;
                true
            }
            None => false,
        }
    }

    /// Note event on a row, `None` for empty patterns or out-of-range cells
    pub fn note(&self, pattern: u8, row: u16, channel: usize) -> Option<&NoteEvent> {
        self.patterns[pattern as usize].get_note(row, channel)
    }
}
