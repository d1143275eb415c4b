//! Effects on the ticks after a row's first

use ft2_song::{Effect, ExtendedEffect};

use super::row::{apply_volume_column_override, do_multi_note_retrig, release, retrigger_instrument, trigger_note};
use super::{MAX_GLOBAL_VOLUME, Replayer};
use crate::channels::ChannelStatus;

impl Replayer {
    /// Volume column, then the main column's per-tick command
    pub(super) fn handle_effects_tick_nonzero(&mut self, index: usize) {
        let linear = self.linear_periods;
        // Ticks elapsed since the row started
        let elapsed = self.speed as i32 - self.tick as i32;
        let table = &self.instruments;
        let ch = &mut self.channels[index];
        if ch.muted {
            return;
        }

        ch.volume_column_tick_nonzero(linear);

        let (efx, param) = (ch.efx, ch.efx_data);
        if (efx == Effect::ARPEGGIO && param == 0) || efx > Effect::LAST {
            return;
        }

        let mut refresh_volumes = false;
        match Effect::from_raw(efx, param) {
            Effect::Arpeggio(p) => ch.arpeggio(p, self.tick as u8, linear),
            Effect::PortaUp(p) => ch.pitch_slide_up(p),
            Effect::PortaDown(p) => ch.pitch_slide_down(p),
            Effect::TonePortamento(_) => ch.portamento(linear),
            Effect::Vibrato(p) => ch.vibrato(p),
            Effect::TonePortaVolSlide(p) => {
                ch.portamento(linear);
                ch.vol_slide(p);
            }
            Effect::VibratoVolSlide(p) => {
                ch.do_vibrato();
                ch.vol_slide(p);
            }
            Effect::Tremolo(p) => ch.tremolo(p),
            Effect::VolumeSlide(p) => ch.vol_slide(p),
            Effect::Extended(ExtendedEffect::Retrigger(p)) => {
                // E90 was handled as a plain trigger on tick zero
                if p != 0 && elapsed % p as i32 == 0 {
                    trigger_note(ch, table, linear, 0, 0, 0);
                    retrigger_instrument(ch, table);
                }
            }
            Effect::Extended(ExtendedEffect::NoteCut(p)) => {
                if elapsed as u8 == p {
                    ch.real_vol = 0;
                    ch.out_vol = 0;
                    ch.status |= ChannelStatus::UPDATE_VOL | ChannelStatus::USE_QUICK_VOLRAMP;
                }
            }
            Effect::Extended(ExtendedEffect::NoteDelay(p)) => {
                if elapsed as u8 == p {
                    let note = (ch.copy_of_instr_and_note & 0xFF) as u8;
                    let instrument = (ch.copy_of_instr_and_note >> 8) as u8;
                    trigger_note(ch, table, linear, note, 0, 0);
                    if instrument > 0 {
                        ch.reset_volumes();
                    }
                    retrigger_instrument(ch, table);
                    apply_volume_column_override(ch);
                }
            }
            Effect::GlobalVolumeSlide(p) => {
                let p = if p == 0 { ch.global_vol_slide_speed } else { p };
                ch.global_vol_slide_speed = p;

                let up = p >> 4;
                self.global_volume = if up == 0 {
                    self.global_volume.saturating_sub(p & 0x0F)
                } else {
                    (self.global_volume + up).min(MAX_GLOBAL_VOLUME)
                };
                refresh_volumes = true;
            }
            Effect::KeyOff(p) => {
                if elapsed as u8 == p & 31 {
                    release(ch, table);
                }
            }
            Effect::PanningSlide(p) => ch.panning_slide(p),
            Effect::MultiRetrig(_) => do_multi_note_retrig(ch, table, linear),
            Effect::Tremor(p) => ch.tremor(p),
            _ => {}
        }

        if refresh_volumes {
            self.refresh_volumes();
        }
    }
}
