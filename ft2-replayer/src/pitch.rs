//! Period ↔ pitch conversion
//!
//! FT2 works in "periods" throughout the effect engine and only converts to
//! a 32.32 resampling delta when a voice is updated. Linear mode uses an
//! exponential table with 768 steps per octave; Amiga mode divides a
//! constant by the period.

use crate::tables::{NOTE_LUT_LEN, note_periods};

/// Steps per octave in the linear period space
const OCTAVE_STEPS: u32 = 4 * 12 * 16;

/// Period of C-4 on a sample without finetune/relative note (linear mode)
const LINEAR_C4_SPAN: u32 = 12 * 192 * 4;

/// Reference C-4 rate in Hz
pub const C4_FREQ: f64 = 8363.0;

/// Pattern-note index of C-4 (0-based)
pub const NOTE_C4: i32 = 4 * 12;

/// `8363 * 256 * 2^(i/768)`, the rate-independent part of the log table
fn base_log(i: u32) -> f64 {
    (C4_FREQ * 256.0) * (i as f64 / OCTAVE_STEPS as f64).exp2()
}

/// Split a linear period into (octave shift, fine step)
#[inline]
fn linear_split(period: u32) -> (u32, usize) {
    let inv = LINEAR_C4_SPAN.wrapping_sub(period) & 0xFFFF;
    (inv / OCTAVE_STEPS, (inv % OCTAVE_STEPS) as usize)
}

/// Rate-dependent pitch tables
#[derive(Debug, Clone)]
pub struct PitchTables {
    freq: u32,
    log_tab: Box<[u64; OCTAVE_STEPS as usize]>,
    amiga_period_div: u64,
}

impl PitchTables {
    /// Build tables for an output rate in Hz
    pub fn new(freq: u32) -> Self {
        let freq = freq.max(1);
        let mul = (u32::MAX as f64 + 1.0) / freq as f64;
        let mut log_tab = Box::new([0u64; OCTAVE_STEPS as usize]);
        for (i, value) in log_tab.iter_mut().enumerate() {
            *value = (base_log(i as u32) * mul).round() as u64;
        }
        let amiga_period_div = (((1u64 << 32) as f64 * (1712.0 * C4_FREQ)) / freq as f64).round() as u64;

        Self {
            freq,
            log_tab,
            amiga_period_div,
        }
    }

    pub fn freq(&self) -> u32 {
        self.freq
    }

    /// Period → 32.32 resampling delta (0 for period 0)
    pub fn period_to_delta(&self, period: u32, linear: bool) -> u64 {
        let period = period & 0xFFFF;
        if period == 0 {
            return 0;
        }
        if linear {
            let (quotient, remainder) = linear_split(period);
            self.log_tab[remainder] >> (14u32.wrapping_sub(quotient) & 31)
        } else {
            self.amiga_period_div / period as u64
        }
    }
}

/// Period → playback rate in Hz, for display
pub fn period_to_hz(period: u32, linear: bool) -> f64 {
    let period = period & 0xFFFF;
    if period == 0 {
        return 0.0;
    }
    if linear {
        let (quotient, remainder) = linear_split(period);
        let shift = (14u32.wrapping_sub(quotient) & 31) as i32;
        base_log(remainder as u32) * (-shift as f64).exp2()
    } else {
        (C4_FREQ * 1712.0) / period as f64
    }
}

/// Index into the note→period table for a note (1-based, relative note
/// already applied) and a sample finetune
#[inline]
pub fn note_index(note: u8, finetune: i8) -> usize {
    let index = ((note as i32 - 1) << 4) + ((finetune >> 3) as i32 + 16);
    index.clamp(0, NOTE_LUT_LEN as i32 - 1) as usize
}

/// Snap a period to the closest note at or below it, then add semitones
///
/// Used by arpeggio and glissando. Reproduces FT2's search bounds, which stop
/// at B-7: notes pushed higher by the relative note setting snap to B-7.
pub fn period_to_note_period(period: u16, note_offset: u8, finetune: i8, linear: bool) -> u16 {
    let lut = note_periods(linear);
    let finetune = (finetune >> 3) as i32 + 16;

    let mut hi = 8 * 12 * 16;
    let mut lo = 0;
    for _ in 0..8 {
        let tmp = (((lo + hi) >> 1) & !15) + finetune;
        let look_up = (tmp - 8).max(0) as usize;
        if period >= lut[look_up] {
            hi = (tmp - finetune) & !15;
        } else {
            lo = (tmp - finetune) & !15;
        }
    }

    let mut tmp = lo + finetune + ((note_offset as i32) << 4);
    if tmp >= (8 * 12 * 16 + 15) - 1 {
        tmp = (8 * 12 * 16 + 16) - 1;
    }
    lut[tmp as usize]
}

/// Piano key (0-based, may fall outside 0..96) currently sounding at a period
pub fn piano_key(period: u16, finetune: i8, relative_note: i8, linear: bool) -> i32 {
    let relative_note = relative_note as i32;
    if linear {
        let period = (period as i32 >> 2) + (finetune >> 3) as i32;
        return (((10 * 12 * 16) - period) >> 4) - relative_note;
    }

    let lut = note_periods(false);
    if period > lut[0] {
        return -1;
    }
    let finetune = (finetune >> 3) as i32 + 16;
    let mut hi = 10 * 12 * 16;
    let mut lo = 0;
    for _ in 0..7 {
        let tmp = (((lo + hi) >> 1) & !15) + finetune;
        let look_up = (tmp - 16).max(0) as usize;
        if period >= lut[look_up] {
            hi = (tmp - finetune) & !15;
        } else {
            lo = (tmp - finetune) & !15;
        }
    }
    (lo >> 4) - relative_note
}

/// Exact C-4 rate of a sample, `None` when relative note pushes C-4 out of range
pub fn sample_c4_rate(finetune: i8, relative_note: i8, linear: bool) -> Option<f64> {
    let note = NOTE_C4 + relative_note as i32;
    if !(0..(10 * 12) - 1).contains(&note) {
        return None;
    }
    let index = ((note << 4) + ((finetune >> 3) as i32 + 16)) as usize;
    Some(period_to_hz(note_periods(linear)[index] as u32, linear))
}
