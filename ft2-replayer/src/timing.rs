//! BPM → tick length tables
//!
//! A tick lasts `rate / (bpm / 2.5)` output samples. The integer part is
//! mixed directly; the fractional part is accumulated in a 52-bit fixed-point
//! counter so rounding never drifts over long playback. The same split is
//! done against the timestamp clock for the sync queues.

use crate::{MAX_BPM, MIN_BPM};

/// Fractional bits of the samples-per-tick and tick-time accumulators
pub const TICK_FRAC_BITS: u32 = 52;
pub const TICK_FRAC_SCALE: u64 = 1 << TICK_FRAC_BITS;
pub const TICK_FRAC_MASK: u64 = TICK_FRAC_SCALE - 1;

/// Fractional bits of the playback-seconds counter
pub const SECONDS_FRAC_BITS: u32 = 35;

/// Quick volume ramp length in milliseconds
pub const QUICK_RAMP_MS: f64 = 5.0;

const NUM_BPMS: usize = (MAX_BPM - MIN_BPM + 1) as usize;

/// Integer/fraction pair of a tick length
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickLength {
    pub int: u32,
    /// Fraction scaled by [`TICK_FRAC_SCALE`]
    pub frac: u64,
}

impl TickLength {
    /// Split `value` with FT2's modf-then-round order
    pub fn split(value: f64) -> Self {
        let int = value.trunc();
        let frac = value - int;
        Self {
            int: int as u32,
            frac: ((frac * TICK_FRAC_SCALE as f64) + 0.5) as u64,
        }
    }
}

/// Rate-dependent timing tables
#[derive(Debug, Clone)]
pub struct TimingTables {
    freq: u32,
    samples_per_tick: [TickLength; NUM_BPMS],
    tick_time: [TickLength; NUM_BPMS],
    quick_ramp_samples: u32,
}

/// Clamp a BPM request into the supported range
pub fn clamp_bpm(bpm: u16) -> u8 {
    bpm.clamp(MIN_BPM as u16, MAX_BPM as u16) as u8
}

/// Tick duration in seconds, scaled by 2^35 (independent of the output rate)
pub fn tick_duration_35fp(bpm: u8) -> u64 {
    let bpm = clamp_bpm(bpm as u16);
    ((2.5 / bpm as f64) * (1u64 << SECONDS_FRAC_BITS) as f64).round() as u64
}

impl TimingTables {
    /// Build tables for an output rate and a timestamp clock rate (ticks/s)
    pub fn new(freq: u32, clock_hz: f64) -> Self {
        let freq = freq.max(1);
        let mut samples_per_tick = [TickLength::default(); NUM_BPMS];
        let mut tick_time = [TickLength::default(); NUM_BPMS];

        for bpm in MIN_BPM..=MAX_BPM {
            let i = (bpm - MIN_BPM) as usize;
            let bpm_hz = bpm as f64 / 2.5;
            samples_per_tick[i] = TickLength::split(freq as f64 / bpm_hz);
            tick_time[i] = TickLength::split(clock_hz / bpm_hz);
        }

        Self {
            freq,
            samples_per_tick,
            tick_time,
            quick_ramp_samples: (freq as f64 / (1000.0 / QUICK_RAMP_MS)).round() as u32,
        }
    }

    #[inline]
    fn index(bpm: u8) -> usize {
        (clamp_bpm(bpm as u16) - MIN_BPM) as usize
    }

    pub fn freq(&self) -> u32 {
        self.freq
    }

    /// Output samples per tick at a BPM
    pub fn samples_per_tick(&self, bpm: u8) -> TickLength {
        self.samples_per_tick[Self::index(bpm)]
    }

    /// Timestamp-clock units per tick at a BPM
    pub fn tick_time(&self, bpm: u8) -> TickLength {
        self.tick_time[Self::index(bpm)]
    }

    /// Samples in the 5 ms anti-click ramp
    pub fn quick_ramp_samples(&self) -> u32 {
        self.quick_ramp_samples
    }

    /// Longest tick at any BPM, plus one sample for the fraction carry
    pub fn max_samples_per_tick(&self) -> usize {
        self.samples_per_tick(MIN_BPM).int as usize + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tempo_tick_length() {
        let timing = TimingTables::new(48_000, 1e9);
        let tick = timing.samples_per_tick(125);
        assert_eq!(tick.int, 960);
        assert_eq!(tick.frac, 0);
        assert_eq!(timing.tick_time(125).int, 20_000_000, "20 ms per tick");
    }

    #[test]
    fn test_fraction_rounded_not_truncated() {
        let timing = TimingTables::new(44_100, 1e9);
        let tick = timing.samples_per_tick(33);
        let exact: f64 = 44_100.0 / (33.0 / 2.5);
        assert_eq!(tick.int, exact as u32);
        let frac = tick.frac as f64 / TICK_FRAC_SCALE as f64;
        assert!((frac - exact.fract()).abs() < 1.0 / TICK_FRAC_SCALE as f64);
    }

    #[test]
    fn test_bpm_clamped() {
        let timing = TimingTables::new(48_000, 1e9);
        assert_eq!(timing.samples_per_tick(0), timing.samples_per_tick(MIN_BPM));
        assert_eq!(clamp_bpm(1000), MAX_BPM);
        assert_eq!(clamp_bpm(5), MIN_BPM);
    }

    #[test]
    fn test_quick_ramp_is_5ms() {
        assert_eq!(TimingTables::new(48_000, 1e9).quick_ramp_samples(), 240);
        assert_eq!(TimingTables::new(44_100, 1e9).quick_ramp_samples(), 221);
    }

    #[test]
    fn test_tick_duration_seconds() {
        let secs = tick_duration_35fp(125) as f64 / (1u64 << SECONDS_FRAC_BITS) as f64;
        assert!((secs - 0.02).abs() < 1e-9);
    }
}
