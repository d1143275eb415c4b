//! Channel-local effect primitives
//!
//! Everything here only touches one channel. Effects that need the song
//! position, the tick counter or the instrument table live in the replayer.

use super::{Channel, ChannelStatus};
use crate::pitch::period_to_note_period;
use crate::tables::{ARPEGGIO_TAB, VIBRATO_TAB};

/// Lowest period a slide may reach
const MIN_PERIOD: u16 = 1;
/// Slides clamp just below this period
const MAX_PERIOD: u16 = 32000;

/// Raise pitch (lower the period), stopping at 1
#[inline]
fn period_sub(period: u16, amount: u16) -> u16 {
    let period = period.wrapping_sub(amount);
    if (period as i16) < MIN_PERIOD as i16 {
        MIN_PERIOD
    } else {
        period
    }
}

/// Lower pitch (raise the period), stopping below 32000
#[inline]
fn period_add(period: u16, amount: u16) -> u16 {
    let period = period.wrapping_add(amount);
    if (period as i16) >= MAX_PERIOD as i16 {
        MAX_PERIOD - 1
    } else {
        period
    }
}

/// `realVol - amount`, stopping at 0
#[inline]
fn vol_sub(vol: u8, amount: u8) -> u8 {
    let vol = vol.wrapping_sub(amount);
    if (vol as i8) < 0 { 0 } else { vol }
}

#[inline]
fn vol_add(vol: u8, amount: u8) -> u8 {
    vol.saturating_add(amount).min(64)
}

/// Modulator waveform value (0-255) for a position and a 2-bit shape
///
/// The ramp branch reads the sign of `sign_pos`, which for tremolo is the
/// vibrato position.
#[inline]
fn modulator(pos: u8, shape: u8, sign_pos: u8) -> u8 {
    let index = (pos >> 2) & 31;
    match shape & 3 {
        0 => VIBRATO_TAB[index as usize],
        1 => {
            let ramp = index << 3;
            if (sign_pos as i8) < 0 { !ramp } else { ramp }
        }
        _ => 255,
    }
}

impl Channel {
    fn set_out_period_from_real(&mut self) {
        self.out_period = self.real_period;
        self.status |= ChannelStatus::UPDATE_PERIOD;
    }

    fn set_out_vol_from_real(&mut self) {
        self.out_vol = self.real_vol;
        self.status |= ChannelStatus::UPDATE_VOL;
    }

    // =========================================================================
    // Tick-zero primitives
    // =========================================================================

    /// 8xx
    pub(crate) fn set_pan(&mut self, param: u8) {
        self.out_pan = param;
        self.status |= ChannelStatus::UPDATE_PAN;
    }

    /// Cxx
    pub(crate) fn set_vol(&mut self, param: u8) {
        let vol = param.min(64);
        self.real_vol = vol;
        self.out_vol = vol;
        self.status |= ChannelStatus::UPDATE_VOL | ChannelStatus::USE_QUICK_VOLRAMP;
    }

    /// E1x
    pub(crate) fn fine_pitch_slide_up(&mut self, param: u8) {
        let param = if param == 0 { self.fine_porta_up_speed } else { param };
        self.fine_porta_up_speed = param;
        self.real_period = period_sub(self.real_period, param as u16 * 4);
        self.set_out_period_from_real();
    }

    /// E2x
    pub(crate) fn fine_pitch_slide_down(&mut self, param: u8) {
        let param = if param == 0 { self.fine_porta_down_speed } else { param };
        self.fine_porta_down_speed = param;
        self.real_period = period_add(self.real_period, param as u16 * 4);
        self.set_out_period_from_real();
    }

    /// X1x / X2x, one period unit per step
    pub(crate) fn extra_fine_pitch_slide(&mut self, param: u8) {
        let kind = param >> 4;
        let param = param & 0x0F;
        match kind {
            1 => {
                let param = if param == 0 { self.extra_fine_up_speed } else { param };
                self.extra_fine_up_speed = param;
                self.real_period = period_sub(self.real_period, param as u16);
                self.set_out_period_from_real();
            }
            2 => {
                let param = if param == 0 { self.extra_fine_down_speed } else { param };
                self.extra_fine_down_speed = param;
                self.real_period = period_add(self.real_period, param as u16);
                self.set_out_period_from_real();
            }
            _ => {}
        }
    }

    /// EAx
    pub(crate) fn fine_vol_slide_up(&mut self, param: u8) {
        let param = if param == 0 { self.fine_vol_up_speed } else { param };
        self.fine_vol_up_speed = param;
        self.real_vol = vol_add(self.real_vol, param);
        self.set_out_vol_from_real();
    }

    /// EBx
    pub(crate) fn fine_vol_slide_down(&mut self, param: u8) {
        let param = if param == 0 { self.fine_vol_down_speed } else { param };
        self.fine_vol_down_speed = param;
        self.real_vol = vol_sub(self.real_vol, param);
        self.set_out_vol_from_real();
    }

    /// E4x
    pub(crate) fn set_vibrato_control(&mut self, param: u8) {
        self.vib_trem_ctrl = (self.vib_trem_ctrl & 0xF0) | (param & 0x0F);
    }

    /// E7x
    pub(crate) fn set_tremolo_control(&mut self, param: u8) {
        self.vib_trem_ctrl = ((param & 0x0F) << 4) | (self.vib_trem_ctrl & 0x0F);
    }

    // =========================================================================
    // Per-tick primitives
    // =========================================================================

    /// 1xx
    pub(crate) fn pitch_slide_up(&mut self, param: u8) {
        let param = if param == 0 { self.porta_up_speed } else { param };
        self.porta_up_speed = param;
        self.real_period = period_sub(self.real_period, param as u16 * 4);
        self.set_out_period_from_real();
    }

    /// 2xx
    pub(crate) fn pitch_slide_down(&mut self, param: u8) {
        let param = if param == 0 { self.porta_down_speed } else { param };
        self.porta_down_speed = param;
        self.real_period = period_add(self.real_period, param as u16 * 4);
        self.set_out_period_from_real();
    }

    /// 0xy on ticks other than zero
    pub(crate) fn arpeggio(&mut self, param: u8, tick: u8, linear: bool) {
        let step = ARPEGGIO_TAB[(tick & 31) as usize];
        if step == 0 {
            self.out_period = self.real_period;
        } else {
            let offset = if step == 1 { param >> 4 } else { param & 0x0F };
            self.out_period = period_to_note_period(self.real_period, offset, self.finetune, linear);
        }
        self.status |= ChannelStatus::UPDATE_PERIOD;
    }

    /// 3xx and the volume column's Fx
    pub(crate) fn portamento(&mut self, linear: bool) {
        match self.porta_direction {
            0 => return,
            1 => {
                self.real_period = self.real_period.wrapping_add(self.porta_speed);
                if self.real_period >= self.porta_target {
                    self.porta_direction = 1;
                    self.real_period = self.porta_target;
                }
            }
            _ => {
                self.real_period = self.real_period.wrapping_sub(self.porta_speed);
                if (self.real_period as i16) <= (self.porta_target as i16) {
                    self.porta_direction = 1;
                    self.real_period = self.porta_target;
                }
            }
        }

        self.out_period = if self.semitone_porta {
            period_to_note_period(self.real_period, 0, self.finetune, linear)
        } else {
            self.real_period
        };
        self.status |= ChannelStatus::UPDATE_PERIOD;
    }

    pub(crate) fn do_vibrato(&mut self) {
        let value = modulator(self.vibrato_pos, self.vib_trem_ctrl, self.vibrato_pos) as u16;
        let offset = (value * self.vibrato_depth as u16) >> 5;
        self.out_period = if (self.vibrato_pos as i8) < 0 {
            self.real_period.wrapping_sub(offset)
        } else {
            self.real_period.wrapping_add(offset)
        };
        self.status |= ChannelStatus::UPDATE_PERIOD;
        self.vibrato_pos = self.vibrato_pos.wrapping_add(self.vibrato_speed);
    }

    /// 4xy
    pub(crate) fn vibrato(&mut self, param: u8) {
        if param & 0x0F > 0 {
            self.vibrato_depth = param & 0x0F;
        }
        if param & 0xF0 > 0 {
            self.vibrato_speed = (param & 0xF0) >> 2;
        }
        self.do_vibrato();
    }

    /// 7xy
    pub(crate) fn tremolo(&mut self, param: u8) {
        if param & 0x0F > 0 {
            self.tremolo_depth = param & 0x0F;
        }
        if param & 0xF0 > 0 {
            self.tremolo_speed = (param & 0xF0) >> 2;
        }

        let value = modulator(self.tremolo_pos, self.vib_trem_ctrl >> 4, self.vibrato_pos) as u16;
        let offset = ((value * self.tremolo_depth as u16) >> 6) as i16;
        let vol = if (self.tremolo_pos as i8) < 0 {
            (self.real_vol as i16 - offset).max(0)
        } else {
            (self.real_vol as i16 + offset).min(64)
        };
        self.out_vol = vol as u8;
        self.status |= ChannelStatus::UPDATE_VOL;
        self.tremolo_pos = self.tremolo_pos.wrapping_add(self.tremolo_speed);
    }

    /// Axy (and the slide half of 5xy/6xy)
    pub(crate) fn vol_slide(&mut self, param: u8) {
        let param = if param == 0 { self.vol_slide_speed } else { param };
        self.vol_slide_speed = param;
        self.real_vol = if param & 0xF0 == 0 {
            vol_sub(self.real_vol, param)
        } else {
            vol_add(self.real_vol, param >> 4)
        };
        self.set_out_vol_from_real();
    }

    /// Pxy
    pub(crate) fn panning_slide(&mut self, param: u8) {
        let param = if param == 0 { self.pan_slide_speed } else { param };
        self.pan_slide_speed = param;
        let pan = if param & 0xF0 == 0 {
            (self.out_pan as i16 - param as i16).max(0)
        } else {
            (self.out_pan as i16 + (param >> 4) as i16).min(255)
        };
        self.out_pan = pan as u8;
        self.status |= ChannelStatus::UPDATE_PAN;
    }

    /// Txy: x ticks on, y ticks off
    pub(crate) fn tremor(&mut self, param: u8) {
        let param = if param == 0 { self.tremor_param } else { param };
        self.tremor_param = param;

        let mut sign = self.tremor_pos & 0x80;
        let mut data = (self.tremor_pos & 0x7F).wrapping_sub(1);
        if (data as i8) < 0 {
            if sign == 0x80 {
                sign = 0x00;
                data = param & 0x0F;
            } else {
                sign = 0x80;
                data = param >> 4;
            }
        }
        self.tremor_pos = sign | data;
        self.out_vol = if sign == 0x80 { self.real_vol } else { 0 };
        self.status |= ChannelStatus::UPDATE_VOL | ChannelStatus::USE_QUICK_VOLRAMP;
    }

    // =========================================================================
    // Volume column
    // =========================================================================

    /// Volume column commands that act on the row's first tick
    ///
    /// Returns the column byte as rewritten by the command (the new volume,
    /// vibrato speed or panning). Rxy reads it to decide whether to retrigger
    /// on this tick.
    pub(crate) fn volume_column_tick_zero(&mut self) -> u8 {
        let data = self.vol_column & 0x0F;
        match self.vol_column >> 4 {
            0x1..=0x5 => {
                let vol = (self.vol_column - 0x10).min(64);
                self.set_vol(vol);
                vol
            }
            0x8 => {
                self.real_vol = vol_sub(self.real_vol, data);
                self.set_out_vol_from_real();
                self.real_vol
            }
            0x9 => {
                self.real_vol = vol_add(self.real_vol, data);
                self.set_out_vol_from_real();
                self.real_vol
            }
            0xA => {
                let speed = data << 2;
                if speed != 0 {
                    self.vibrato_speed = speed;
                }
                speed
            }
            0xC => {
                self.out_pan = data << 4;
                self.status |= ChannelStatus::UPDATE_PAN;
                self.out_pan
            }
            _ => self.vol_column,
        }
    }

    /// Volume column commands that act on the remaining ticks
    pub(crate) fn volume_column_tick_nonzero(&mut self, linear: bool) {
        let data = self.vol_column & 0x0F;
        match self.vol_column >> 4 {
            0x6 => {
                self.real_vol = vol_sub(self.real_vol, data);
                self.set_out_vol_from_real();
            }
            0x7 => {
                self.real_vol = vol_add(self.real_vol, data);
                self.set_out_vol_from_real();
            }
            0xB => {
                if data > 0 {
                    self.vibrato_depth = data;
                }
                self.do_vibrato();
            }
            0xD => {
                // A zero step also lands on the hard left position
                let pan = self.out_pan as u16 + 0u8.wrapping_sub(data) as u16;
                self.out_pan = if pan < 256 { 0 } else { pan as u8 };
                self.status |= ChannelStatus::UPDATE_PAN;
            }
            0xE => {
                self.out_pan = (self.out_pan as u16 + data as u16).min(255) as u8;
                self.status |= ChannelStatus::UPDATE_PAN;
            }
            0xF => self.portamento(linear),
            _ => {}
        }
    }
}
