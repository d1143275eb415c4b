//! Accumulation buffer → device format

use super::Mixer;

const INITIAL_DITHER_SEED: u32 = 0x1234_5000;

/// 1-bit triangular dither state
#[derive(Debug, Clone, Copy)]
pub struct Dither {
    seed: u32,
    prev_l: f32,
    prev_r: f32,
}

impl Default for Dither {
    fn default() -> Self {
        Self {
            seed: INITIAL_DITHER_SEED,
            prev_l: 0.0,
            prev_r: 0.0,
        }
    }
}

impl Dither {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    fn random32(&mut self) -> u32 {
        self.seed = self.seed.wrapping_mul(134_775_813).wrapping_add(1);
        self.seed
    }

    /// Uniform noise in ±0.5 LSB
    #[inline]
    fn noise(&mut self) -> f32 {
        self.random32() as i32 as f32 * (0.5 / i32::MAX as f32)
    }

    #[inline]
    fn left(&mut self, value: f32) -> i16 {
        let noise = self.noise();
        let out = value + noise - self.prev_l;
        self.prev_l = noise;
        (out as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }

    #[inline]
    fn right(&mut self, value: f32) -> i16 {
        let noise = self.noise();
        let out = value + noise - self.prev_r;
        self.prev_r = noise;
        (out as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }
}

impl Mixer {
    /// Write `count` mixed frames as interleaved i16 and clear them
    ///
    /// `channels` is the device channel count: 1 averages left and right,
    /// more than 2 pads the extra channels with silence.
    pub fn write_i16(&mut self, out: &mut [i16], channels: usize, count: usize) {
        let channels = channels.max(1);
        let count = count.min(self.mix_l.len()).min(out.len() / channels);
        let scale = self.normalization() * 32768.0;

        for (i, frame) in out.chunks_exact_mut(channels).take(count).enumerate() {
            let l = self.mix_l[i] * scale;
            let r = self.mix_r[i] * scale;
            if channels == 1 {
                frame[0] = self.dither.left((l + r) * 0.5);
            } else {
                frame[0] = self.dither.left(l);
                frame[1] = self.dither.right(r);
                frame[2..].fill(0);
            }
        }
        self.clear(count);
    }

    /// Write `count` mixed frames as interleaved f32 (clamped to ±1) and clear them
    pub fn write_f32(&mut self, out: &mut [f32], channels: usize, count: usize) {
        let channels = channels.max(1);
        let count = count.min(self.mix_l.len()).min(out.len() / channels);
        let scale = self.normalization();

        for (i, frame) in out.chunks_exact_mut(channels).take(count).enumerate() {
            let l = (self.mix_l[i] * scale).clamp(-1.0, 1.0);
            let r = (self.mix_r[i] * scale).clamp(-1.0, 1.0);
            if channels == 1 {
                frame[0] = (l + r) * 0.5;
            } else {
                frame[0] = l;
                frame[1] = r;
                frame[2..].fill(0.0);
            }
        }
        self.clear(count);
    }

    /// Zero the first `count` accumulation frames
    pub fn clear(&mut self, count: usize) {
        let count = count.min(self.mix_l.len());
        self.mix_l[..count].fill(0.0);
        self.mix_r[..count].fill(0.0);
    }
}
