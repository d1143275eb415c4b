//! Resampling kernels
//!
//! Sinc kernels are Kaiser-windowed with 4096 phases. Three cutoffs exist per
//! width; a voice picks one from its resampling ratio when its pitch changes,
//! trading treble for less aliasing as the ratio grows.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use ft2_song::Sample;

/// Phases per sinc kernel
pub const SINC_PHASES: usize = 4096;
const SINC_PHASE_SHIFT: u32 = 32 - 12;

/// Number of cutoff variants per kernel width
pub const SINC_KERNELS: usize = 3;

/// (Kaiser beta, cutoff) per variant
const SINC_CONFIG: [(f64, f64); SINC_KERNELS] = [(9.6377, 1.0), (8.5, 0.75), (7.3, 0.425)];

/// Ratio thresholds (32.32) for the cutoff variants
const SINC_RATIO_1: u64 = (1.1875 * (1u64 << 32) as f64) as u64;
const SINC_RATIO_2: u64 = (1.5 * (1u64 << 32) as f64) as u64;

/// Mixer interpolation quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Nearest sample (no interpolation)
    Nearest,
    /// 2-point linear
    Linear,
    /// 8-point windowed sinc
    #[default]
    Sinc8,
    /// 16-point windowed sinc
    Sinc16,
}

impl Interpolation {
    /// Sinc cutoff variant for a resampling delta
    pub fn kernel_for(delta: u64) -> u8 {
        if delta <= SINC_RATIO_1 {
            0
        } else if delta <= SINC_RATIO_2 {
            1
        } else {
            2
        }
    }
}

/// Zeroth-order modified Bessel function of the first kind
fn bessel_i0(z: f64) -> f64 {
    let zz = z * z;
    let mut s = 1.0;
    let mut ds = 1.0;
    let mut d = 2.0;
    loop {
        ds *= zz / (d * d);
        s += ds;
        d += 2.0;
        if ds <= s * 1e-12 {
            return s;
        }
    }
}

fn sinc(x: f64, cutoff: f64) -> f64 {
    if x == 0.0 {
        cutoff
    } else {
        let x = x * std::f64::consts::PI;
        (cutoff * x).sin() / x
    }
}

/// Build a `points × SINC_PHASES` kernel, phase-major
fn make_kernel(points: usize, beta: f64, cutoff: f64) -> Box<[f32]> {
    let center = (points / 2) as f64 - 1.0;
    let inv_i0_beta = 1.0 / bessel_i0(beta);
    let phase_mul = 1.0 / SINC_PHASES as f64;
    let x_mul = 1.0 / (points / 2) as f64;

    (0..points * SINC_PHASES)
        .map(|i| {
            let tap = (i % points) as f64;
            let phase = (i / points) as f64;
            let x = (tap - center) - phase * phase_mul;
            let n = x * x_mul;
            let window = bessel_i0(beta * (1.0 - n * n).max(0.0).sqrt()) * inv_i0_beta;
            (sinc(x, cutoff) * window) as f32
        })
        .collect()
}

/// Precomputed sinc kernels for both widths
pub struct SincKernels {
    sinc8: [Box<[f32]>; SINC_KERNELS],
    sinc16: [Box<[f32]>; SINC_KERNELS],
}

static SHARED_KERNELS: LazyLock<SincKernels> = LazyLock::new(SincKernels::new);

impl SincKernels {
    fn new() -> Self {
        Self {
            sinc8: SINC_CONFIG.map(|(beta, cutoff)| make_kernel(8, beta, cutoff)),
            sinc16: SINC_CONFIG.map(|(beta, cutoff)| make_kernel(16, beta, cutoff)),
        }
    }

    /// Process-wide kernel set, built on first use
    pub fn shared() -> &'static SincKernels {
        &SHARED_KERNELS
    }

    /// Filter coefficients for one phase
    #[inline]
    pub fn phase(&self, width: usize, kernel: u8, frac: u32) -> &[f32] {
        let kernel = (kernel as usize).min(SINC_KERNELS - 1);
        let lut = if width == 16 {
            &self.sinc16[kernel]
        } else {
            &self.sinc8[kernel]
        };
        let phase = (frac >> SINC_PHASE_SHIFT) as usize;
        &lut[phase * width..phase * width + width]
    }
}

/// Interpolated sample value at `index + frac / 2^32`
#[inline]
pub fn interpolate(
    mode: Interpolation,
    kernel: u8,
    sample: &Sample,
    index: i64,
    frac: u32,
    looped: bool,
) -> f32 {
    match mode {
        Interpolation::Nearest => sample.tap(index, looped),
        Interpolation::Linear => {
            let a = sample.tap(index, looped);
            let b = sample.tap(index + 1, looped);
            a + (b - a) * (frac as f32 * (1.0 / 4_294_967_296.0))
        }
        Interpolation::Sinc8 => convolve(8, kernel, sample, index, frac, looped),
        Interpolation::Sinc16 => convolve(16, kernel, sample, index, frac, looped),
    }
}

#[inline]
fn convolve(width: usize, kernel: u8, sample: &Sample, index: i64, frac: u32, looped: bool) -> f32 {
    let coeffs = SincKernels::shared().phase(width, kernel, frac);
    let first = index - (width as i64 / 2 - 1);
    coeffs
        .iter()
        .enumerate()
        .map(|(k, c)| sample.tap(first + k as i64, looped) * c)
        .sum()
}
