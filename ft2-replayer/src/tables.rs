//! Static lookup tables
//!
//! Everything here is independent of the output rate. Rate-dependent tables
//! live in [`crate::pitch`] and [`crate::timing`].

use std::sync::LazyLock;

/// Entries in the note→period lookup tables: 10 octaves × 12 notes × 16
/// finetune steps, plus 16 entries of headroom below C-0
pub const NOTE_LUT_LEN: usize = 10 * 12 * 16 + 16;

/// Vibrato/tremolo sine half-wave (32 steps, peak 255)
pub const VIBRATO_TAB: [u8; 32] = [
    0, 24, 49, 74, 97, 120, 141, 161, 180, 197, 212, 224, 235, 244, 250, 253, 255, 253, 250, 244,
    235, 224, 212, 197, 180, 161, 141, 120, 97, 74, 49, 24,
];

/// Arpeggio step per tick, indexed with `tick & 31`
///
/// Values 0/1/2 select base note, high nibble and low nibble. The upper half
/// holds FT2's out-of-range garbage, which only ever hits the "low nibble"
/// branch because it is neither 0 nor 1.
pub const ARPEGGIO_TAB: [u8; 32] = [
    0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 0x00, 0x18, 0x31, 0x4A, 0x61, 0x78, 0x8D, 0xA1,
    0xB4, 0xC5, 0xD4, 0xE0, 0xEB, 0xF4, 0xFA, 0xFD,
];

/// Auto-vibrato sine (256 steps, amplitude 64, starts downwards)
pub static AUTO_VIBRATO_SINE: LazyLock<[i8; 256]> = LazyLock::new(|| {
    let mut tab = [0i8; 256];
    for (i, value) in tab.iter_mut().enumerate() {
        let phase = std::f64::consts::TAU * i as f64 / 256.0;
        *value = -(64.0 * phase.sin()).round() as i8;
    }
    tab
});

/// Equal-power panning law, `sqrt(i / 256)` for `i` in `0..=256`
///
/// Left gain is `PAN_TAB[256 - pan]`, right gain is `PAN_TAB[pan]`.
pub static PAN_TAB: LazyLock<[f32; 257]> = LazyLock::new(|| {
    let mut tab = [0.0f32; 257];
    for (i, value) in tab.iter_mut().enumerate() {
        *value = (i as f64 / 256.0).sqrt() as f32;
    }
    tab
});

/// Linear-frequency periods, 4 period units per finetune step
pub static LINEAR_PERIODS: LazyLock<[u16; NOTE_LUT_LEN]> = LazyLock::new(|| {
    let mut tab = [0u16; NOTE_LUT_LEN];
    for (i, value) in tab.iter_mut().enumerate() {
        *value = (7744 - 4 * i) as u16;
    }
    tab
});

/// Amiga periods on the same note/finetune grid
///
/// Index 784 (C-4, finetune 0) is period 1712; every 768 linear units
/// halve the period.
pub static AMIGA_PERIODS: LazyLock<[u16; NOTE_LUT_LEN]> = LazyLock::new(|| {
    let mut tab = [0u16; NOTE_LUT_LEN];
    for (i, value) in tab.iter_mut().enumerate() {
        let exponent = (3136.0 - 4.0 * i as f64) / 768.0;
        *value = (1712.0 * exponent.exp2()).round() as u16;
    }
    tab
});

/// Period table for the active frequency mode
pub fn note_periods(linear: bool) -> &'static [u16; NOTE_LUT_LEN] {
    if linear {
        &LINEAR_PERIODS
    } else {
        &AMIGA_PERIODS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_periods() {
        assert_eq!(LINEAR_PERIODS[0], 7744);
        assert_eq!(LINEAR_PERIODS[784], 4608, "C-4");
        assert_eq!(LINEAR_PERIODS[NOTE_LUT_LEN - 1], 7744 - 4 * 1935);
    }

    #[test]
    fn test_amiga_periods_octaves() {
        assert_eq!(AMIGA_PERIODS[784], 1712, "C-4");
        assert_eq!(AMIGA_PERIODS[16], 1712 * 16, "C-0");
        assert_eq!(AMIGA_PERIODS[784 + 192], 856, "C-5");
        assert!(
            AMIGA_PERIODS.windows(2).all(|w| w[0] >= w[1]),
            "periods shrink as pitch rises"
        );
    }

    #[test]
    fn test_pan_table_law() {
        assert_eq!(PAN_TAB[0], 0.0);
        assert_eq!(PAN_TAB[256], 1.0);
        let center = PAN_TAB[128];
        assert!((center * center - 0.5).abs() < 1e-6, "equal power at center");
    }

    #[test]
    fn test_auto_vibrato_sine_shape() {
        assert_eq!(AUTO_VIBRATO_SINE[0], 0);
        assert_eq!(AUTO_VIBRATO_SINE[64], -64);
        assert_eq!(AUTO_VIBRATO_SINE[192], 64);
    }
}
