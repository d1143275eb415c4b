//! Row reads and tick-zero effects

use ft2_song::{
    Effect, ExtendedEffect, InstrumentHandle, InstrumentTable, MAX_INSTRUMENTS, MAX_PATTERN_NOTE,
    NOTE_OFF, NoteEvent,
};

use super::{MAX_GLOBAL_VOLUME, PlayMode, Replayer};
use crate::channels::{Channel, ChannelStatus};
use crate::tables::{NOTE_LUT_LEN, note_periods};

/// Highest note after the sample's relative note is applied
const MAX_FINAL_NOTE: u8 = 10 * 12;

/// Start a note on a channel
///
/// `note` 0 replays the channel's last note (multi retrigger and E9x);
/// [`NOTE_OFF`] releases it.
pub(super) fn trigger_note(
    ch: &mut Channel,
    table: &InstrumentTable,
    linear: bool,
    note: u8,
    efx: u8,
    efx_data: u8,
) {
    if note == NOTE_OFF {
        release(ch, table);
        return;
    }

    let note = if note == 0 { ch.note_num } else { note };
    if note == 0 {
        return;
    }
    ch.note_num = note;

    ch.instrument = table
        .handle(ch.instr_num as usize)
        .unwrap_or(InstrumentHandle::PLACEHOLDER);
    let ins = table.resolve_or_placeholder(ch.instrument);

    let note = note.min(MAX_PATTERN_NOTE);
    ch.sample = ins.sample_for_note(note);
    let (volume, panning, finetune, relative_note) = match ins.sample(ch.sample as usize) {
        Some(s) => (s.volume, s.panning, s.finetune, s.relative_note),
        None => (64, 128, 0, 0),
    };
    ch.relative_note = relative_note;

    let note = note.wrapping_add(relative_note as u8);
    if note >= MAX_FINAL_NOTE {
        return;
    }

    ch.old_vol = volume;
    ch.old_pan = panning;

    ch.finetune = if efx == Effect::EXTENDED && efx_data & 0xF0 == 0x50 {
        ((efx_data & 0x0F) as i32 * 16 - 128) as i8
    } else {
        finetune
    };

    if note != 0 {
        let index = ((note as usize - 1) << 4) + ((ch.finetune >> 3) + 16) as usize;
        let period = note_periods(linear)[index.min(NOTE_LUT_LEN - 1)];
        ch.real_period = period;
        ch.out_period = period;
    }

    ch.status |= ChannelStatus::UPDATE_PERIOD
        | ChannelStatus::UPDATE_VOL
        | ChannelStatus::UPDATE_PAN
        | ChannelStatus::TRIGGER_VOICE
        | ChannelStatus::USE_QUICK_VOLRAMP;

    if efx == Effect::SAMPLE_OFFSET {
        if efx_data > 0 {
            ch.sample_offset = ch.efx_data;
        }
        ch.smp_start_pos = (ch.sample_offset as u32) << 8;
    } else {
        ch.smp_start_pos = 0;
    }
}

/// Key off against the channel's current instrument
pub(super) fn release(ch: &mut Channel, table: &InstrumentTable) {
    let ins = table.resolve_or_placeholder(ch.instrument);
    ch.key_off(ins);
}

/// Restart envelopes and fadeout of the channel's current instrument
pub(super) fn retrigger_instrument(ch: &mut Channel, table: &InstrumentTable) {
    let ins = table.resolve_or_placeholder(ch.instrument);
    ch.trigger_instrument(ins);
}

/// Tone portamento row: set the target instead of triggering
///
/// The instrument is not re-resolved here, so a new instrument number only
/// takes effect on the next real trigger.
fn prepare_portamento(
    ch: &mut Channel,
    table: &InstrumentTable,
    linear: bool,
    event: &NoteEvent,
    inst: u8,
) {
    if event.note > 0 {
        if event.note == NOTE_OFF {
            release(ch, table);
        } else {
            let index = (((event.note as i32 - 1) + ch.relative_note as i32) * 16)
                + ((ch.finetune >> 3) as i32 + 16);
            if (0..NOTE_LUT_LEN as i32).contains(&index) {
                ch.porta_target = note_periods(linear)[index as usize];
                ch.porta_direction = match ch.porta_target.cmp(&ch.real_period) {
                    std::cmp::Ordering::Equal => 0,
                    std::cmp::Ordering::Greater => 1,
                    std::cmp::Ordering::Less => 2,
                };
            }
        }
    }

    if inst > 0 {
        ch.reset_volumes();
        if event.note != NOTE_OFF {
            retrigger_instrument(ch, table);
        }
    }
}

/// Rxy retrigger step, run on every tick of the row
pub(super) fn do_multi_note_retrig(ch: &mut Channel, table: &InstrumentTable, linear: bool) {
    let count = ch.retrig_counter.wrapping_add(1);
    if count < ch.retrig_speed {
        ch.retrig_counter = count;
        return;
    }
    ch.retrig_counter = 0;

    let vol = ch.real_vol as i16;
    let vol = match ch.retrig_vol {
        0x1 => vol - 1,
        0x2 => vol - 2,
        0x3 => vol - 4,
        0x4 => vol - 8,
        0x5 => vol - 16,
        0x6 => (vol >> 1) + (vol >> 3) + (vol >> 4),
        0x7 => vol >> 1,
        0x9 => vol + 1,
        0xA => vol + 2,
        0xB => vol + 4,
        0xC => vol + 8,
        0xD => vol + 16,
        0xE => (vol >> 1) + vol,
        0xF => vol + vol,
        _ => vol,
    };
    ch.real_vol = vol.clamp(0, 64) as u8;
    ch.out_vol = ch.real_vol;

    apply_volume_column_override(ch);
    trigger_note(ch, table, linear, 0, 0, 0);
}

/// A set-volume or set-panning volume column survives a retrigger
pub(super) fn apply_volume_column_override(ch: &mut Channel) {
    match ch.vol_column {
        0x10..=0x50 => {
            ch.out_vol = ch.vol_column - 0x10;
            ch.real_vol = ch.out_vol;
        }
        0xC0..=0xCF => ch.out_pan = (ch.vol_column & 0x0F) << 4,
        _ => {}
    }
}

impl Replayer {
    /// Read one pattern cell into a channel
    pub(super) fn get_new_note(&mut self, index: usize, event: &NoteEvent) {
        let linear = self.linear_periods;
        let ch = &mut self.channels[index];
        ch.vol_column = event.volume;

        if ch.efx == Effect::ARPEGGIO {
            if ch.efx_data > 0 {
                // Arpeggio ends: back to the base period
                ch.out_period = ch.real_period;
                ch.status |= ChannelStatus::UPDATE_PERIOD;
            }
        } else if matches!(ch.efx, Effect::VIBRATO | Effect::VIBRATO_VOL_SLIDE)
            && !matches!(event.efx, Effect::VIBRATO | Effect::VIBRATO_VOL_SLIDE)
        {
            ch.out_period = ch.real_period;
            ch.status |= ChannelStatus::UPDATE_PERIOD;
        }

        ch.efx = event.efx;
        ch.efx_data = event.efx_data;
        ch.copy_of_instr_and_note = ((event.instrument as u16) << 8) | event.note as u16;

        if ch.muted {
            self.handle_more_effects_tick_zero(index);
            return;
        }

        let mut inst = event.instrument;
        if inst > 0 {
            if inst as usize <= MAX_INSTRUMENTS {
                ch.instr_num = inst;
            } else {
                inst = 0;
            }
        }

        let is_extended = event.efx == Effect::EXTENDED;
        if is_extended && (0xD1..=0xDF).contains(&event.efx_data) {
            // Note delay: the cell is replayed from copy_of_instr_and_note later
            return;
        }

        // E90 falls through to a plain trigger
        if !(is_extended && event.efx_data == 0x90) {
            let table = &self.instruments;

            if ch.vol_column & 0xF0 == 0xF0 {
                let param = ch.vol_column & 0x0F;
                if param > 0 {
                    ch.porta_speed = ((param as u16) << 4) * 4;
                }
                prepare_portamento(ch, table, linear, event, inst);
                self.handle_effects_tick_zero(index);
                return;
            }

            if matches!(event.efx, Effect::TONE_PORTAMENTO | Effect::TONE_PORTA_VOL_SLIDE) {
                if event.efx != Effect::TONE_PORTA_VOL_SLIDE && event.efx_data != 0 {
                    ch.porta_speed = event.efx_data as u16 * 4;
                }
                prepare_portamento(ch, table, linear, event, inst);
                self.handle_effects_tick_zero(index);
                return;
            }

            if event.efx == Effect::KEY_OFF && event.efx_data == 0 {
                release(ch, table);
                if inst > 0 {
                    ch.reset_volumes();
                }
                self.handle_effects_tick_zero(index);
                return;
            }

            if event.note == 0 {
                if inst > 0 {
                    ch.reset_volumes();
                    retrigger_instrument(ch, table);
                }
                self.handle_effects_tick_zero(index);
                return;
            }
        }

        let table = &self.instruments;
        if event.note == NOTE_OFF {
            release(ch, table);
        } else {
            trigger_note(ch, table, linear, event.note, event.efx, event.efx_data);
        }

        if inst > 0 {
            ch.reset_volumes();
            if event.note != NOTE_OFF {
                retrigger_instrument(ch, table);
            }
        }

        self.handle_effects_tick_zero(index);
    }

    // =========================================================================
    // Tick zero effects
    // =========================================================================

    /// Volume column, then the main column's tick-zero commands
    pub(super) fn handle_effects_tick_zero(&mut self, index: usize) {
        let ch = &mut self.channels[index];
        let new_vol_column = ch.volume_column_tick_zero();

        let param = ch.efx_data;
        if ch.efx == Effect::ARPEGGIO && param == 0 {
            return;
        }

        match Effect::from_raw(ch.efx, param) {
            Effect::SetPanning(p) => ch.set_pan(p),
            Effect::SetVolume(p) => ch.set_vol(p),
            Effect::MultiRetrig(p) => self.multi_note_retrig(index, p, new_vol_column),
            Effect::ExtraFinePortaUp(_) | Effect::ExtraFinePortaDown(_) => {
                ch.extra_fine_pitch_slide(param)
            }
            _ => {}
        }

        self.handle_more_effects_tick_zero(index);
    }

    /// Flow and global commands; also run on muted channels
    pub(super) fn handle_more_effects_tick_zero(&mut self, index: usize) {
        let ch = &self.channels[index];
        if ch.efx > Effect::LAST {
            return;
        }

        match Effect::from_raw(ch.efx, ch.efx_data) {
            Effect::PositionJump(p) => self.position_jump(p),
            Effect::PatternBreak(p) => self.pattern_break(p),
            Effect::Extended(sub) => self.extended_tick_zero(index, sub),
            Effect::SetSpeed(p) => self.speed_effect(p),
            Effect::SetGlobalVolume(p) => {
                self.global_volume = p.min(MAX_GLOBAL_VOLUME);
                self.refresh_volumes();
            }
            Effect::SetEnvelopePosition(p) => {
                let ch = &mut self.channels[index];
                let ins = self.instruments.resolve_or_placeholder(ch.instrument);
                ch.set_envelope_pos(ins, p);
            }
            _ => {}
        }
    }

    fn extended_tick_zero(&mut self, index: usize, sub: ExtendedEffect) {
        let ch = &mut self.channels[index];
        if ch.muted {
            match sub {
                ExtendedEffect::PatternLoop(p) => self.pattern_loop(index, p),
                ExtendedEffect::PatternDelay(p) => self.pattern_delay(p),
                _ => {}
            }
            return;
        }

        match sub {
            ExtendedEffect::FinePortaUp(p) => ch.fine_pitch_slide_up(p),
            ExtendedEffect::FinePortaDown(p) => ch.fine_pitch_slide_down(p),
            ExtendedEffect::GlissandoControl(p) => ch.semitone_porta = p != 0,
            ExtendedEffect::VibratoControl(p) => ch.set_vibrato_control(p),
            ExtendedEffect::PatternLoop(p) => self.pattern_loop(index, p),
            ExtendedEffect::TremoloControl(p) => ch.set_tremolo_control(p),
            ExtendedEffect::FineVolumeSlideUp(p) => ch.fine_vol_slide_up(p),
            ExtendedEffect::FineVolumeSlideDown(p) => ch.fine_vol_slide_down(p),
            ExtendedEffect::NoteCut(0) => {
                ch.real_vol = 0;
                ch.out_vol = 0;
                ch.status |= ChannelStatus::UPDATE_VOL | ChannelStatus::USE_QUICK_VOLRAMP;
            }
            ExtendedEffect::PatternDelay(p) => self.pattern_delay(p),
            _ => {}
        }
    }

    /// Bxx
    fn position_jump(&mut self, param: u8) {
        if self.mode != PlayMode::Pattern {
            let pos = param as i16 - 1;
            if pos < 0 || pos >= self.song.song_length() as i16 {
                self.bxx_overflow = true;
            } else {
                self.song_pos = pos;
            }
        }

        if !self.break_latched {
            self.p_break_pos = 0;
        }
        self.pos_jump_flag = true;
    }

    /// Dxx, parameter in BCD
    fn pattern_break(&mut self, param: u8) {
        let row = (param >> 4) * 10 + (param & 0x0F);
        self.p_break_pos = if row <= 63 { row } else { 0 };
        self.pos_jump_flag = true;
        self.break_latched = true;
    }

    /// Fxx: BPM from 32 up, speed below; F00 is ignored
    fn speed_effect(&mut self, param: u8) {
        if param >= 32 {
            self.bpm = param;
        } else if param > 0 {
            self.speed = param as u16;
            self.tick = param as u16;
        }
    }

    /// E6x
    fn pattern_loop(&mut self, index: usize, param: u8) {
        let ch = &mut self.channels[index];
        if param == 0 {
            ch.loop_start_row = self.row as u8;
        } else if ch.loop_counter == 0 {
            ch.loop_counter = param;
            self.p_break_pos = ch.loop_start_row;
            self.p_break_flag = true;
        } else {
            ch.loop_counter -= 1;
            if ch.loop_counter > 0 {
                self.p_break_pos = ch.loop_start_row;
                self.p_break_flag = true;
            }
        }
    }

    /// EEx
    fn pattern_delay(&mut self, param: u8) {
        if self.patt_del_time2 == 0 {
            self.patt_del_time = param + 1;
        }
    }

    /// Rxy on tick zero: latch speed and volume change, retrigger unless the
    /// volume column already rewrote this row
    fn multi_note_retrig(&mut self, index: usize, param: u8, vol_column: u8) {
        let linear = self.linear_periods;
        let ch = &mut self.channels[index];

        let speed = param & 0x0F;
        if speed != 0 {
            ch.retrig_speed = speed;
        }
        let vol = param >> 4;
        if vol != 0 {
            ch.retrig_vol = vol;
        }

        if vol_column == 0 {
            do_multi_note_retrig(ch, &self.instruments, linear);
        }
    }
}
