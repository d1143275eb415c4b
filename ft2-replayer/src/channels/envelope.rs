//! Per-tick envelope, fadeout and auto-vibrato processing

use ft2_song::{AutoVibratoWaveform, Envelope, Instrument};

use super::{Channel, ChannelStatus, ENV_ONE};
use crate::tables::AUTO_VIBRATO_SINE;

const ENV_MAX: i32 = 64 * ENV_ONE;

/// Position of one envelope on a channel
struct EnvelopeCursor<'a> {
    tick: &'a mut u16,
    pos: &'a mut u8,
    value: &'a mut i32,
    delta: &'a mut i32,
}

impl EnvelopeCursor<'_> {
    /// Advance one tick and return the value (16.16, 0-64)
    fn advance(&mut self, env: &Envelope, key_off: bool) -> i32 {
        let mut did_interpolate = false;
        let mut result = 0;
        let mut pos = *self.pos as usize;

        *self.tick = self.tick.wrapping_add(1);
        if *self.tick == env.point(pos).tick {
            *self.value = (env.point(pos).value as i32) << 16;

            pos += 1;
            if env.has_loop() {
                pos -= 1;
                if pos == env.loop_end as usize
                    && (!env.has_sustain() || pos != env.sustain_point as usize || !key_off)
                {
                    pos = env.loop_start as usize;
                    *self.tick = env.point(pos).tick;
                    *self.value = (env.point(pos).value as i32) << 16;
                }
                pos += 1;
            }

            if pos < env.len() {
                let mut interpolate = true;
                if env.has_sustain() && !key_off && pos - 1 == env.sustain_point as usize {
                    *self.delta = 0;
                    interpolate = false;
                }

                if interpolate {
                    *self.pos = pos as u8;
                    let p0 = env.point(pos - 1);
                    let p1 = env.point(pos);
                    let x_diff = p1.tick as i32 - p0.tick as i32;
                    if x_diff > 0 {
                        let y_diff = p1.value as i32 - p0.value as i32;
                        *self.delta = (y_diff << 16) / x_diff;
                        result = *self.value;
                        did_interpolate = true;
                    } else {
                        *self.delta = 0;
                    }
                }
            } else {
                *self.delta = 0;
            }
        }

        if !did_interpolate {
            *self.value += *self.delta;
            result = *self.value;
            if !(0..=ENV_MAX).contains(&result) {
                result = result.clamp(0, ENV_MAX);
                *self.delta = 0;
            }
        }
        result
    }

    /// Jump to `tick` (Lxx), interpolating the value to land there
    fn set_position(&mut self, env: &Envelope, param: u8) {
        *self.tick = (param as u16).wrapping_sub(1);

        let len = env.len();
        let mut point = 0usize;
        let mut snap = true;
        let mut tick = param as i32;

        if len > 1 {
            point += 1;
            for _ in 0..len - 1 {
                if tick < env.point(point).tick as i32 {
                    point -= 1;

                    tick -= env.point(point).tick as i32;
                    if tick == 0 {
                        snap = false;
                        break;
                    }

                    let p0 = env.point(point);
                    let p1 = env.point(point + 1);
                    let x_diff = p1.tick as i32 - p0.tick as i32;
                    if x_diff <= 0 {
                        break;
                    }

                    let y_diff = p1.value as i32 - p0.value as i32;
                    *self.delta = (y_diff << 16) / x_diff;
                    *self.value = ((p0.value as i32) << 16) + *self.delta * (tick - 1);
                    point += 1;
                    snap = false;
                    break;
                }
                point += 1;
            }
            if snap {
                point = point.saturating_sub(1);
            }
        }

        if snap {
            *self.delta = 0;
            *self.value = (env.point(point).value as i32) << 16;
        }
        *self.pos = point.min(len.saturating_sub(1)) as u8;
    }
}

impl Channel {
    fn volume_cursor(&mut self) -> EnvelopeCursor<'_> {
        EnvelopeCursor {
            tick: &mut self.vol_env_tick,
            pos: &mut self.vol_env_pos,
            value: &mut self.vol_env_value,
            delta: &mut self.vol_env_delta,
        }
    }

    fn panning_cursor(&mut self) -> EnvelopeCursor<'_> {
        EnvelopeCursor {
            tick: &mut self.pan_env_tick,
            pos: &mut self.pan_env_pos,
            value: &mut self.pan_env_value,
            delta: &mut self.pan_env_delta,
        }
    }

    /// Lxx: set the envelope position
    ///
    /// The panning envelope is moved only when the volume envelope has a
    /// sustain point, matching FT2.
    pub(crate) fn set_envelope_pos(&mut self, ins: &Instrument, param: u8) {
        if ins.volume_envelope.is_enabled() {
            self.volume_cursor().set_position(&ins.volume_envelope, param);
        }
        if ins.volume_envelope.has_sustain() {
            self.panning_cursor().set_position(&ins.panning_envelope, param);
        }
    }

    /// Fadeout, envelopes and auto-vibrato for one tick
    ///
    /// Produces `final_vol`, `final_pan` and `final_period`.
    pub(crate) fn update_envelopes(&mut self, ins: &Instrument, global_volume: u8) {
        if self.key_off {
            if self.fadeout_speed > 0 {
                self.fadeout_vol -= self.fadeout_speed as i32;
                if self.fadeout_vol <= 0 {
                    self.fadeout_vol = 0;
                    self.fadeout_speed = 0;
                }
            }
            // Keep updating once the fadeout reached zero
            self.status |= ChannelStatus::UPDATE_VOL;
        }

        let base = global_volume as i32 * self.out_vol as i32 * self.fadeout_vol;
        let mut vol = base as f32 * (1.0 / (64.0 * 64.0 * 32768.0));

        if ins.volume_envelope.is_enabled() {
            let key_off = self.key_off;
            let env = self.volume_cursor().advance(&ins.volume_envelope, key_off);
            vol *= env as f32 / ENV_MAX as f32;
            self.status |= ChannelStatus::UPDATE_VOL;
        }
        self.final_vol = vol.clamp(0.0, 1.0);

        if ins.panning_envelope.is_enabled() {
            let key_off = self.key_off;
            let env = self.panning_cursor().advance(&ins.panning_envelope, key_off) - 32 * ENV_ONE;
            let room = 128 - (self.out_pan as i32 - 128).abs();
            let pan_add = (room as i64 * env as i64) / (32 * ENV_ONE as i64);
            self.final_pan = (self.out_pan as i64 + pan_add).clamp(0, 255) as u8;
            self.status |= ChannelStatus::UPDATE_PAN;
        } else {
            self.final_pan = self.out_pan;
        }

        self.update_auto_vibrato(ins);
    }

    fn update_auto_vibrato(&mut self, ins: &Instrument) {
        let vib = &ins.auto_vibrato;
        if vib.depth == 0 {
            self.final_period = self.out_period;
            return;
        }

        let amp = if self.auto_vib_sweep > 0 {
            let mut amp = self.auto_vib_sweep;
            if !self.key_off {
                amp = amp.wrapping_add(self.auto_vib_amp);
                if (amp >> 8) > vib.depth as u16 {
                    amp = (vib.depth as u16) << 8;
                    self.auto_vib_sweep = 0;
                }
                self.auto_vib_amp = amp;
            }
            amp
        } else {
            self.auto_vib_amp
        };

        self.auto_vib_pos = self.auto_vib_pos.wrapping_add(vib.rate);
        let pos = self.auto_vib_pos as i32;
        let value: i32 = match vib.waveform {
            AutoVibratoWaveform::Square => {
                if pos > 127 {
                    64
                } else {
                    -64
                }
            }
            AutoVibratoWaveform::RampUp => (((pos >> 1) + 64) & 127) - 64,
            AutoVibratoWaveform::RampDown => ((-(pos >> 1) + 64) & 127) - 64,
            AutoVibratoWaveform::Sine => AUTO_VIBRATO_SINE[pos as usize] as i32,
        };

        let offset = (value * amp as i16 as i32) >> (6 + 8);
        let period = self.out_period.wrapping_add(offset as i16 as u16);
        self.final_period = if period >= 32000 { 0 } else { period };
        self.status |= ChannelStatus::UPDATE_PERIOD;
    }
}
