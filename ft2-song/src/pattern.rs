//! Pattern and note data structures

use crate::{MAX_ROWS, NOTE_OFF};

/// Single cell in a pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteEvent {
    /// Note value (0 = none, 1-96 = C-0 to B-7, 97 = note off)
    pub note: u8,
    /// Instrument number (1-128, 0 = none)
    pub instrument: u8,
    /// Raw volume column byte
    pub volume: u8,
    /// Effect type (0-35, XM letter index)
    pub efx: u8,
    /// Effect parameter
    pub efx_data: u8,
}

impl NoteEvent {
    /// Note with an instrument and no effect
    pub const fn note(note: u8, instrument: u8) -> Self {
        Self {
            note,
            instrument,
            volume: 0,
            efx: 0,
            efx_data: 0,
        }
    }

    /// Effect-only cell
    pub const fn effect(efx: u8, efx_data: u8) -> Self {
        Self {
            note: 0,
            instrument: 0,
            volume: 0,
            efx,
            efx_data,
        }
    }

    pub const fn with_volume(mut self, volume: u8) -> Self {
        self.volume = volume;
        self
    }

    pub const fn with_effect(mut self, efx: u8, efx_data: u8) -> Self {
        self.efx = efx;
        self.efx_data = efx_data;
        self
    }

    pub fn is_note_off(&self) -> bool {
        self.note == NOTE_OFF
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Tracker pattern
///
/// Cell storage is allocated lazily: a pattern without data still has a row
/// count, and every cell of it reads as empty.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Number of rows (1-256)
    num_rows: u16,
    /// Column stride of `notes`
    channels: usize,
    /// Note data, row-major (empty when unallocated)
    notes: Vec<NoteEvent>,
}

impl Pattern {
    /// Pattern without cell data
    pub fn new(num_rows: u16) -> Self {
        Self {
            num_rows: num_rows.clamp(1, MAX_ROWS),
            channels: 0,
            notes: Vec::new(),
        }
    }

    /// Pattern with all-empty cells allocated
    pub fn empty(num_rows: u16, channels: usize) -> Self {
        let num_rows = num_rows.clamp(1, MAX_ROWS);
        Self {
            num_rows,
            channels,
            notes: vec![NoteEvent::default(); num_rows as usize * channels],
        }
    }

    /// Build a pattern from `[row][channel]` data
    ///
    /// Missing cells in short rows are empty.
    pub fn from_rows(rows: &[Vec<NoteEvent>], channels: usize) -> Self {
        let mut pattern = Self::empty(rows.len() as u16, channels);
        for (row, cells) in rows.iter().enumerate().take(pattern.num_rows as usize) {
            for (ch, cell) in cells.iter().enumerate().take(channels) {
                pattern.notes[row * channels + ch] = *cell;
            }
        }
        pattern
    }

    pub fn num_rows(&self) -> u16 {
        self.num_rows
    }

    /// Change the row count, keeping existing rows
    pub fn set_num_rows(&mut self, num_rows: u16) {
        self.num_rows = num_rows.clamp(1, MAX_ROWS);
        if self.has_data() {
            self.notes
                .resize(self.num_rows as usize * self.channels, NoteEvent::default());
        }
    }

    pub fn has_data(&self) -> bool {
        !self.notes.is_empty()
    }

    /// Get note at specific row and channel
    pub fn get_note(&self, row: u16, channel: usize) -> Option<&NoteEvent> {
        if row >= self.num_rows || channel >= self.channels {
            return None;
        }
        self.notes.get(row as usize * self.channels + channel)
    }

    /// Mutable cell access; allocates the pattern for `channels` columns first
    pub fn note_mut(&mut self, row: u16, channel: usize, channels: usize) -> Option<&mut NoteEvent> {
        if !self.has_data() {
            *self = Self::empty(self.num_rows, channels);
        }
        if row >= self.num_rows || channel >= self.channels {
            return None;
        }
        self.notes.get_mut(row as usize * self.channels + channel)
    }

    /// Re-stride allocated data to a new column count
    pub(crate) fn conform(&mut self, channels: usize) {
        if !self.has_data() {
            self.channels = channels;
            return;
        }
        if self.channels == channels {
            return;
        }
        let mut notes = vec![NoteEvent::default(); self.num_rows as usize * channels];
        let keep = self.channels.min(channels);
        for row in 0..self.num_rows as usize {
            let src = &self.notes[row * self.channels..row * self.channels + keep];
            notes[row * channels..row * channels + keep].copy_from_slice(src);
        }
        self.notes = notes;
        self.channels = channels;
    }
}
