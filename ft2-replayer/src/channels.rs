//! Tracker channel state
//!
//! One [`Channel`] per pattern column. The effect engine mutates it tick by
//! tick and raises [`ChannelStatus`] bits; the mixer consumes those bits
//! once per tick to update the channel's voice.

mod effects;
mod envelope;


use ft2_song::{Instrument, InstrumentHandle};

/// Pending voice updates raised by the effect engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelStatus(u8);

impl ChannelStatus {
    pub const UPDATE_VOL: Self = Self(0x01);
    pub const UPDATE_PERIOD: Self = Self(0x02);
    pub const TRIGGER_VOICE: Self = Self(0x04);
    pub const UPDATE_PAN: Self = Self(0x08);
    pub const USE_QUICK_VOLRAMP: Self = Self(0x10);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn intersects(&self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for ChannelStatus {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ChannelStatus {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Envelope value scale (16.16 fixed point)
pub const ENV_ONE: i32 = 1 << 16;

/// Per-track replayer state
#[derive(Debug, Clone)]
pub struct Channel {
    // Note and instrument
    pub(crate) note_num: u8,
    pub(crate) instr_num: u8,
    pub(crate) instrument: InstrumentHandle,
    pub(crate) sample: u8,
    /// `(instrument << 8) | note` of the row, replayed by note delay
    pub(crate) copy_of_instr_and_note: u16,
    pub(crate) relative_note: i8,
    pub(crate) finetune: i8,
    pub(crate) smp_start_pos: u32,
    pub(crate) muted: bool,

    // Current row's commands
    pub(crate) efx: u8,
    pub(crate) efx_data: u8,
    pub(crate) vol_column: u8,

    // Status
    pub(crate) status: ChannelStatus,
    /// Status consumed by the mixer on the last tick
    pub(crate) tmp_status: ChannelStatus,

    // Period
    pub(crate) real_period: u16,
    pub(crate) out_period: u16,
    pub(crate) final_period: u16,
    pub(crate) porta_target: u16,
    /// 0 = none, 1 = up (toward higher periods), 2 = down
    pub(crate) porta_direction: u8,
    pub(crate) porta_speed: u16,
    pub(crate) semitone_porta: bool,

    // Volume
    pub(crate) real_vol: u8,
    pub(crate) out_vol: u8,
    pub(crate) old_vol: u8,
    pub(crate) final_vol: f32,

    // Panning
    pub(crate) old_pan: u8,
    pub(crate) out_pan: u8,
    pub(crate) final_pan: u8,

    // Key off and fadeout
    pub(crate) key_off: bool,
    pub(crate) fadeout_speed: u16,
    pub(crate) fadeout_vol: i32,

    // Envelopes (16.16)
    pub(crate) vol_env_tick: u16,
    pub(crate) vol_env_pos: u8,
    pub(crate) vol_env_value: i32,
    pub(crate) vol_env_delta: i32,
    pub(crate) pan_env_tick: u16,
    pub(crate) pan_env_pos: u8,
    pub(crate) pan_env_value: i32,
    pub(crate) pan_env_delta: i32,

    // Auto-vibrato
    pub(crate) auto_vib_pos: u8,
    pub(crate) auto_vib_amp: u16,
    pub(crate) auto_vib_sweep: u16,

    // Vibrato / tremolo
    pub(crate) vibrato_pos: u8,
    pub(crate) vibrato_speed: u8,
    pub(crate) vibrato_depth: u8,
    pub(crate) tremolo_pos: u8,
    pub(crate) tremolo_speed: u8,
    pub(crate) tremolo_depth: u8,
    /// Low nibble: vibrato waveform/retrigger, high nibble: tremolo
    pub(crate) vib_trem_ctrl: u8,

    // Tremor
    pub(crate) tremor_pos: u8,
    pub(crate) tremor_param: u8,

    // Multi retrigger
    pub(crate) retrig_counter: u8,
    pub(crate) retrig_speed: u8,
    pub(crate) retrig_vol: u8,

    // Pattern loop
    pub(crate) loop_start_row: u8,
    pub(crate) loop_counter: u8,

    // Effect memories
    pub(crate) porta_up_speed: u8,
    pub(crate) porta_down_speed: u8,
    pub(crate) fine_porta_up_speed: u8,
    pub(crate) fine_porta_down_speed: u8,
    pub(crate) extra_fine_up_speed: u8,
    pub(crate) extra_fine_down_speed: u8,
    pub(crate) vol_slide_speed: u8,
    pub(crate) fine_vol_up_speed: u8,
    pub(crate) fine_vol_down_speed: u8,
    pub(crate) global_vol_slide_speed: u8,
    pub(crate) pan_slide_speed: u8,
    pub(crate) sample_offset: u8,
}

impl Default for Channel {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Channel {
    /// Fresh channel pointing at the placeholder instrument
    pub fn new(muted: bool) -> Self {
        Self {
            note_num: 0,
            instr_num: 0,
            instrument: InstrumentHandle::PLACEHOLDER,
            sample: 0,
            copy_of_instr_and_note: 0,
            relative_note: 0,
            finetune: 0,
            smp_start_pos: 0,
            muted,
            efx: 0,
            efx_data: 0,
            vol_column: 0,
            status: ChannelStatus::UPDATE_VOL,
            tmp_status: ChannelStatus::empty(),
            real_period: 0,
            out_period: 0,
            final_period: 0,
            porta_target: 0,
            porta_direction: 0,
            porta_speed: 0,
            semitone_porta: false,
            real_vol: 0,
            out_vol: 0,
            old_vol: 0,
            final_vol: 0.0,
            old_pan: 128,
            out_pan: 128,
            final_pan: 128,
            key_off: false,
            fadeout_speed: 0,
            fadeout_vol: 0,
            vol_env_tick: 0,
            vol_env_pos: 0,
            vol_env_value: 0,
            vol_env_delta: 0,
            pan_env_tick: 0,
            pan_env_pos: 0,
            pan_env_value: 0,
            pan_env_delta: 0,
            auto_vib_pos: 0,
            auto_vib_amp: 0,
            auto_vib_sweep: 0,
            vibrato_pos: 0,
            vibrato_speed: 0,
            vibrato_depth: 0,
            tremolo_pos: 0,
            tremolo_speed: 0,
            tremolo_depth: 0,
            vib_trem_ctrl: 0,
            tremor_pos: 0,
            tremor_param: 0,
            retrig_counter: 0,
            retrig_speed: 0,
            retrig_vol: 0,
            loop_start_row: 0,
            loop_counter: 0,
            porta_up_speed: 0,
            porta_down_speed: 0,
            fine_porta_up_speed: 0,
            fine_porta_down_speed: 0,
            extra_fine_up_speed: 0,
            extra_fine_down_speed: 0,
            vol_slide_speed: 0,
            fine_vol_up_speed: 0,
            fine_vol_down_speed: 0,
            global_vol_slide_speed: 0,
            pan_slide_speed: 0,
            sample_offset: 0,
        }
    }

    /// Clear what `stop_voices` clears, keeping effect memories
    pub(crate) fn silence(&mut self) {
        self.copy_of_instr_and_note = 0;
        self.relative_note = 0;
        self.sample = 0;
        self.instr_num = 0;
        self.instrument = InstrumentHandle::PLACEHOLDER;
        self.status = ChannelStatus::UPDATE_VOL;
        self.real_vol = 0;
        self.out_vol = 0;
        self.old_vol = 0;
        self.final_vol = 0.0;
        self.old_pan = 128;
        self.out_pan = 128;
        self.final_pan = 128;
        self.vibrato_depth = 0;
        self.porta_direction = 0;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn note(&self) -> u8 {
        self.note_num
    }

    pub fn instrument_number(&self) -> u8 {
        self.instr_num
    }

    pub fn instrument_handle(&self) -> InstrumentHandle {
        self.instrument
    }

    pub fn sample_number(&self) -> u8 {
        self.sample
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn real_period(&self) -> u16 {
        self.real_period
    }

    pub fn out_period(&self) -> u16 {
        self.out_period
    }

    pub fn final_period(&self) -> u16 {
        self.final_period
    }

    pub fn volume(&self) -> u8 {
        self.real_vol
    }

    pub fn out_volume(&self) -> u8 {
        self.out_vol
    }

    pub fn final_volume(&self) -> f32 {
        self.final_vol
    }

    pub fn panning(&self) -> u8 {
        self.out_pan
    }

    pub fn final_panning(&self) -> u8 {
        self.final_pan
    }

    pub fn is_key_off(&self) -> bool {
        self.key_off
    }

    pub fn fadeout_volume(&self) -> i32 {
        self.fadeout_vol
    }

    pub fn finetune(&self) -> i8 {
        self.finetune
    }

    pub fn relative_note(&self) -> i8 {
        self.relative_note
    }

    pub fn sample_start(&self) -> u32 {
        self.smp_start_pos
    }

    /// Status raised so far on the current tick
    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    /// Status the mixer consumed on the last tick
    pub fn last_status(&self) -> ChannelStatus {
        self.tmp_status
    }

    /// Volume envelope value (0-64) as a float
    pub fn volume_envelope(&self) -> f32 {
        self.vol_env_value as f32 / ENV_ONE as f32
    }

    pub fn panning_envelope(&self) -> f32 {
        self.pan_env_value as f32 / ENV_ONE as f32
    }

    // =========================================================================
    // Note lifecycle
    // =========================================================================

    /// Restore the sample's default volume and panning
    pub(crate) fn reset_volumes(&mut self) {
        self.real_vol = self.old_vol;
        self.out_vol = self.old_vol;
        self.out_pan = self.old_pan;
        self.status |=
            ChannelStatus::UPDATE_VOL | ChannelStatus::UPDATE_PAN | ChannelStatus::USE_QUICK_VOLRAMP;
    }

    /// Restart envelopes, fadeout, auto-vibrato and modulator phases
    pub(crate) fn trigger_instrument(&mut self, ins: &Instrument) {
        if self.vib_trem_ctrl & 0x04 == 0 {
            self.vibrato_pos = 0;
        }
        if self.vib_trem_ctrl & 0x40 == 0 {
            self.tremolo_pos = 0;
        }

        self.retrig_counter = 0;
        self.tremor_pos = 0;
        self.key_off = false;

        if ins.volume_envelope.is_enabled() {
            // Wraps to 0 on the next envelope tick
            self.vol_env_tick = u16::MAX;
            self.vol_env_pos = 0;
        }
        if ins.panning_envelope.is_enabled() {
            self.pan_env_tick = u16::MAX;
            self.pan_env_pos = 0;
        }

        self.fadeout_speed = ins.fadeout;
        self.fadeout_vol = 32768;

        let vib = &ins.auto_vibrato;
        if vib.depth > 0 {
            self.auto_vib_pos = 0;
            if vib.sweep > 0 {
                self.auto_vib_amp = 0;
                self.auto_vib_sweep = ((vib.depth as u16) << 8) / vib.sweep as u16;
            } else {
                self.auto_vib_amp = (vib.depth as u16) << 8;
                self.auto_vib_sweep = 0;
            }
        }
    }

    /// Release the note
    ///
    /// Without a volume envelope the note is cut, otherwise the envelope
    /// leaves its sustain point. The panning branch tests the wrong
    /// envelope, as FT2 does.
    pub(crate) fn key_off(&mut self, ins: &Instrument) {
        self.key_off = true;

        let vol_env = &ins.volume_envelope;
        if vol_env.is_enabled() {
            let point_tick = vol_env.point(self.vol_env_pos as usize).tick;
            if self.vol_env_tick >= point_tick {
                self.vol_env_tick = point_tick.wrapping_sub(1);
            }
        } else {
            self.real_vol = 0;
            self.out_vol = 0;
            self.status |= ChannelStatus::UPDATE_VOL | ChannelStatus::USE_QUICK_VOLRAMP;
        }

        let pan_env = &ins.panning_envelope;
        if !pan_env.is_enabled() {
            let point_tick = pan_env.point(self.pan_env_pos as usize).tick;
            if self.pan_env_tick >= point_tick {
                self.pan_env_tick = point_tick.wrapping_sub(1);
            }
        }
    }

    /// Whether the volume envelope is currently held at its sustain point
    pub fn env_sustain_active(&self, ins: &Instrument) -> bool {
        let env = &ins.volume_envelope;
        env.is_enabled() && env.has_sustain() && !self.key_off
    }
}
