//! Tick sequencer and engine context
//!
//! [`Replayer`] owns everything the effect engine reads or writes: the song,
//! the instrument table, the channel array and the sequencer counters. The
//! audio callback calls [`Replayer::tick`] once per tick; row reads, effect
//! dispatch and position advancement all happen inside that call, in FT2's
//! order.
//!
//! ```text
//! tick()
//!  ├─ tick counter hits zero and no pattern delay → read row
//!  │    └─ per channel: get_new_note → tick-zero effects → envelopes
//!  ├─ otherwise
//!  │    └─ per channel: tick-nonzero effects → envelopes
//!  └─ advance(): row++, delay, break/jump/loop, order wrap
//! ```

mod playback;
mod row;
mod tick;

#[cfg(test)]
mod tests;

use ft2_song::{InstrumentTable, MAX_CHANNELS, Song};
use tracing::{debug, trace};

use crate::channels::{Channel, ChannelStatus};
use crate::timing::{SECONDS_FRAC_BITS, tick_duration_35fp};

/// Global volume ceiling
pub const MAX_GLOBAL_VOLUME: u8 = 64;

/// What the sequencer is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayMode {
    /// Not reading pattern data; envelopes still run for jammed notes
    #[default]
    Idle,
    /// Following the order list
    Song,
    /// Looping the current pattern
    Pattern,
}

/// Position captured when the current row was read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncedPosition {
    pub tick: u8,
    pub row: u8,
    pub pattern: u8,
    pub song_pos: u8,
}

/// Engine context: song, instruments, channels and sequencer state
#[derive(Debug, Clone)]
pub struct Replayer {
    pub(crate) song: Song,
    pub(crate) instruments: InstrumentTable,
    pub(crate) channels: Vec<Channel>,
    muted: [bool; MAX_CHANNELS],
    mode: PlayMode,

    // Position
    song_pos: i16,
    pattern_num: u8,
    row: i16,
    num_rows: u16,

    // Tempo
    speed: u16,
    tick: u16,
    bpm: u8,
    global_volume: u8,

    // Flow control
    patt_del_time: u8,
    patt_del_time2: u8,
    p_break_flag: bool,
    p_break_pos: u8,
    pos_jump_flag: bool,
    /// Set by Dxx for the rest of the row so a later Bxx keeps its row
    break_latched: bool,
    /// Bxx pointed past the order list; wrap to order 0
    bxx_overflow: bool,

    // Settings
    linear_periods: bool,
    kill_notes_on_stop: bool,

    // Playback clock
    playback_seconds: u32,
    playback_seconds_frac: u64,

    synced: SyncedPosition,
    /// Times the order list wrapped to its loop start
    song_loops: u32,
}

impl Replayer {
    pub fn new(song: Song, instruments: InstrumentTable) -> Self {
        let mut replayer = Self {
            speed: song.initial_speed.max(1) as u16,
            bpm: crate::timing::clamp_bpm(song.initial_bpm as u16),
            global_volume: song.global_volume.min(MAX_GLOBAL_VOLUME),
            song,
            instruments,
            channels: (0..MAX_CHANNELS).map(|_| Channel::new(false)).collect(),
            muted: [false; MAX_CHANNELS],
            mode: PlayMode::Idle,
            song_pos: 0,
            pattern_num: 0,
            row: 0,
            num_rows: 0,
            tick: 1,
            patt_del_time: 0,
            patt_del_time2: 0,
            p_break_flag: false,
            p_break_pos: 0,
            pos_jump_flag: false,
            break_latched: false,
            bxx_overflow: false,
            linear_periods: true,
            kill_notes_on_stop: false,
            playback_seconds: 0,
            playback_seconds_frac: 0,
            synced: SyncedPosition::default(),
            song_loops: 0,
        };
        replayer.set_pos(0, 0, true);
        replayer
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn instruments(&self) -> &InstrumentTable {
        &self.instruments
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn num_channels(&self) -> usize {
        self.song.num_channels()
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn is_playing(&self) -> bool {
        self.mode != PlayMode::Idle
    }

    pub fn song_pos(&self) -> u16 {
        self.song_pos.max(0) as u16
    }

    pub fn row(&self) -> u16 {
        self.row.max(0) as u16
    }

    pub fn pattern(&self) -> u8 {
        self.pattern_num
    }

    /// Rows in the pattern being played
    pub fn pattern_rows(&self) -> u16 {
        self.num_rows
    }

    pub fn speed(&self) -> u16 {
        self.speed
    }

    /// Tick countdown within the row (from `speed` down to 1)
    pub fn tick_counter(&self) -> u16 {
        self.tick
    }

    pub fn bpm(&self) -> u8 {
        self.bpm
    }

    pub fn global_volume(&self) -> u8 {
        self.global_volume
    }

    pub fn linear_periods(&self) -> bool {
        self.linear_periods
    }

    pub fn kill_notes_on_stop(&self) -> bool {
        self.kill_notes_on_stop
    }

    pub fn set_kill_notes_on_stop(&mut self, kill: bool) {
        self.kill_notes_on_stop = kill;
    }

    /// Position as of the last row read, for display sync
    pub fn synced_position(&self) -> SyncedPosition {
        self.synced
    }

    pub fn song_loops(&self) -> u32 {
        self.song_loops
    }

    // =========================================================================
    // Sequencer
    // =========================================================================

    /// Run one replayer tick
    pub fn tick(&mut self) {
        let num_channels = self.song.num_channels().min(MAX_CHANNELS);

        if self.mode == PlayMode::Idle {
            for i in 0..num_channels {
                self.update_vol_pan_auto_vib(i);
            }
            return;
        }

        self.playback_seconds_frac += tick_duration_35fp(self.bpm);
        if self.playback_seconds_frac >= 1 << SECONDS_FRAC_BITS {
            self.playback_seconds_frac &= (1 << SECONDS_FRAC_BITS) - 1;
            self.playback_seconds += 1;
        }

        let mut tick_zero = false;
        self.tick = self.tick.saturating_sub(1);
        if self.tick == 0 {
            self.tick = self.speed;
            tick_zero = true;
        }
        self.synced.tick = self.tick as u8;

        if tick_zero && self.patt_del_time2 == 0 {
            self.synced.row = self.row as u8;
            self.synced.pattern = self.pattern_num;
            self.synced.song_pos = self.song_pos as u8;
            self.break_latched = false;
            trace!(pos = self.song_pos, row = self.row, pattern = self.pattern_num, "row");

            for i in 0..num_channels {
                let event = self
                    .song
                    .note(self.pattern_num, self.row as u16, i)
                    .copied()
                    .unwrap_or_default();
                self.get_new_note(i, &event);
                self.update_vol_pan_auto_vib(i);
            }
        } else {
            for i in 0..num_channels {
                self.handle_effects_tick_nonzero(i);
                self.update_vol_pan_auto_vib(i);
            }
        }

        self.advance();
    }

    /// Move to the next row once the row's last tick has run
    fn advance(&mut self) {
        if self.tick != 1 {
            return;
        }

        self.row += 1;

        if self.patt_del_time > 0 {
            self.patt_del_time2 = self.patt_del_time;
            self.patt_del_time = 0;
        }
        if self.patt_del_time2 > 0 {
            self.patt_del_time2 -= 1;
            if self.patt_del_time2 > 0 {
                self.row -= 1;
            }
        }

        if self.p_break_flag {
            self.p_break_flag = false;
            self.row = self.p_break_pos as i16;
        }

        if self.row >= self.num_rows as i16 || self.pos_jump_flag {
            self.row = self.p_break_pos as i16;
            self.p_break_pos = 0;
            self.pos_jump_flag = false;
            self.break_latched = false;

            if self.mode != PlayMode::Pattern {
                if self.bxx_overflow {
                    self.song_pos = 0;
                    self.bxx_overflow = false;
                } else {
                    self.song_pos += 1;
                    if self.song_pos >= self.song.song_length() as i16 {
                        self.song_pos = self.song.song_loop_start as i16;
                        self.song_loops += 1;
                        debug!(loop_start = self.song_pos, "song wrapped");
                    }
                }
                self.pattern_num = self.song.pattern_at_order(self.song_pos as u16);
                self.num_rows = self.song.pattern_rows(self.pattern_num);
            }

            // A loop start carried over from the last pattern may not fit
            if self.row >= self.num_rows as i16 {
                self.row = 0;
            }
        }
    }

    /// Fadeout, envelopes and auto-vibrato for one channel
    fn update_vol_pan_auto_vib(&mut self, index: usize) {
        let ch = &mut self.channels[index];
        let ins = self.instruments.resolve_or_placeholder(ch.instrument);
        ch.update_envelopes(ins, self.global_volume);
    }

    /// Raise a volume update on every channel of the song
    fn refresh_volumes(&mut self) {
        let num_channels = self.song.num_channels().min(MAX_CHANNELS);
        for ch in &mut self.channels[..num_channels] {
            ch.status |= ChannelStatus::UPDATE_VOL;
        }
    }
}
