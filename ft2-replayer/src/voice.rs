//! Mixer voices
//!
//! A voice is one resampling lane. Its position is a 32.32 pair moving
//! forward through the sample; for ping-pong loops the backwards direction is
//! a flag and the real read position is the mirror image inside the loop.
//! The stored position therefore always satisfies `position < sample_end`,
//! and loop wraps work the same for both loop kinds.

mod interpolation;

#[cfg(test)]
mod tests;

pub use interpolation::{Interpolation, SINC_KERNELS, SINC_PHASES, SincKernels, interpolate};

use ft2_song::{InstrumentHandle, LoopMode, Sample};
use tracing::trace;

const FRAC_MASK: u64 = 0xFFFF_FFFF;

/// One resampling lane
#[derive(Debug, Clone, Copy, Default)]
pub struct Voice {
    pub(crate) active: bool,
    pub(crate) is_fade_out: bool,

    // Sample reference
    pub(crate) instrument: InstrumentHandle,
    pub(crate) sample: u8,

    // Position (forward space, see module docs)
    pub(crate) position: u32,
    pub(crate) frac: u32,
    pub(crate) delta: u64,
    pub(crate) backwards: bool,
    pub(crate) has_looped: bool,

    // Loop geometry, copied from the sample at trigger time
    pub(crate) loop_mode: LoopMode,
    pub(crate) loop_start: u32,
    pub(crate) loop_length: u32,
    pub(crate) sample_end: u32,

    // Volume and panning as set by the channel
    pub(crate) volume: f32,
    pub(crate) panning: u8,

    // Ramp state
    pub(crate) curr_vol_l: f32,
    pub(crate) curr_vol_r: f32,
    pub(crate) target_vol_l: f32,
    pub(crate) target_vol_r: f32,
    pub(crate) vol_delta_l: f32,
    pub(crate) vol_delta_r: f32,
    pub(crate) ramp_left: u32,

    // Resampling
    pub(crate) period: u16,
    pub(crate) interpolation: Interpolation,
    pub(crate) kernel: u8,
}

impl Voice {
    /// Start playing a sample from `start`
    ///
    /// Empty samples and start offsets at or past the end deactivate the
    /// voice instead.
    pub fn trigger(&mut self, sample: &Sample, instrument: InstrumentHandle, index: u8, start: u32) {
        let length = sample.length();
        if length < 1 {
            self.active = false;
            return;
        }

        self.instrument = instrument;
        self.sample = index;
        self.loop_mode = sample.loop_mode();
        self.loop_start = sample.loop_start();
        self.loop_length = sample.loop_length();
        self.sample_end = sample.end();
        self.backwards = false;
        self.has_looped = false;
        self.position = start;
        self.frac = 0;

        if self.position >= self.sample_end {
            trace!(start, end = self.sample_end, "start offset past sample end");
            self.active = false;
            return;
        }
        self.active = true;
    }

    /// Stop the voice and clear its volumes
    pub fn stop(&mut self) {
        *self = Self {
            interpolation: self.interpolation,
            ..Self::default()
        };
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_fade_out(&self) -> bool {
        self.is_fade_out
    }

    pub fn delta(&self) -> u64 {
        self.delta
    }

    /// Period the delta was derived from
    pub fn period(&self) -> u16 {
        self.period
    }

    pub fn kernel(&self) -> u8 {
        self.kernel
    }

    pub fn has_looped(&self) -> bool {
        self.has_looped
    }

    pub fn is_backwards(&self) -> bool {
        self.backwards
    }

    /// Current left/right gains
    pub fn current_volume(&self) -> (f32, f32) {
        (self.curr_vol_l, self.curr_vol_r)
    }

    pub fn target_volume(&self) -> (f32, f32) {
        (self.target_vol_l, self.target_vol_r)
    }

    pub fn ramp_samples_left(&self) -> u32 {
        self.ramp_left
    }

    /// Set the resampling delta and pick the sinc cutoff for it
    pub fn set_delta(&mut self, delta: u64, interpolation: Interpolation) {
        self.delta = delta;
        self.interpolation = interpolation;
        self.kernel = Interpolation::kernel_for(delta);
    }

    /// Real read position (integer, fraction)
    pub fn read_position(&self) -> (u32, u32) {
        if self.backwards {
            let mirrored = (self.loop_start + self.sample_end - 1).wrapping_sub(self.position);
            (mirrored, !self.frac)
        } else {
            (self.position, self.frac)
        }
    }

    /// Apply a loop wrap to a forward-space position past the sample end
    fn wrap(&mut self, position: u64) {
        let end = self.sample_end as u64;
        let start = self.loop_start as u64;
        let length = self.loop_length as u64;

        match self.loop_mode {
            LoopMode::Off => {
                self.active = false;
                return;
            }
            LoopMode::Forward => {
                self.position = if length >= 2 {
                    (start + (position - end) % length) as u32
                } else {
                    start as u32
                };
            }
            LoopMode::PingPong => {
                if length >= 2 {
                    let overflow = position - end;
                    let cycles = overflow / length;
                    self.position = (start + overflow % length) as u32;
                    self.backwards ^= cycles & 1 == 0;
                } else {
                    self.position = start as u32;
                }
            }
        }
        self.has_looped = true;
    }

    /// Advance by one output sample
    #[inline]
    fn step(&mut self) {
        let frac = self.frac as u64 + (self.delta & FRAC_MASK);
        let position = self.position as u64 + (self.delta >> 32) + (frac >> 32);
        self.frac = frac as u32;
        if position >= self.sample_end as u64 {
            self.wrap(position);
        } else {
            self.position = position as u32;
        }
    }

    /// Advance by `count` samples without producing output
    pub fn skip(&mut self, count: u32) {
        if !self.active || count == 0 {
            return;
        }
        let frac_sum = (self.delta & FRAC_MASK) * count as u64 + self.frac as u64;
        let position = self.position as u64 + (self.delta >> 32) * count as u64 + (frac_sum >> 32);
        self.frac = frac_sum as u32;
        if position >= self.sample_end as u64 {
            self.wrap(position);
        } else {
            self.position = position as u32;
        }
    }

    /// Audible at the moment or about to become audible
    fn is_silent(&self) -> bool {
        self.ramp_left == 0 && self.curr_vol_l == 0.0 && self.curr_vol_r == 0.0
    }

    /// Ramp the current gains toward the targets over `length` samples
    pub fn start_ramp(&mut self, length: u32) {
        if length == 0 {
            self.snap_ramp();
            return;
        }
        let mul = 1.0 / length as f32;
        self.vol_delta_l = (self.target_vol_l - self.curr_vol_l) * mul;
        self.vol_delta_r = (self.target_vol_r - self.curr_vol_r) * mul;
        self.ramp_left = length;
    }

    /// Finish any running ramp at its target
    pub fn snap_ramp(&mut self) {
        self.curr_vol_l = self.target_vol_l;
        self.curr_vol_r = self.target_vol_r;
        self.vol_delta_l = 0.0;
        self.vol_delta_r = 0.0;
        self.ramp_left = 0;
    }

    /// Mix `left.len()` samples into the accumulation buffers
    pub fn render(&mut self, sample: &Sample, left: &mut [f32], right: &mut [f32]) {
        let count = left.len().min(right.len());
        if self.is_silent() {
            self.skip(count as u32);
            return;
        }

        for (out_l, out_r) in left[..count].iter_mut().zip(right[..count].iter_mut()) {
            if !self.active {
                break;
            }
            let (index, frac) = self.read_position();
            let value = interpolate(
                self.interpolation,
                self.kernel,
                sample,
                index as i64,
                frac,
                self.has_looped,
            );
            *out_l += value * self.curr_vol_l;
            *out_r += value * self.curr_vol_r;

            if self.ramp_left > 0 {
                self.curr_vol_l += self.vol_delta_l;
                self.curr_vol_r += self.vol_delta_r;
                self.ramp_left -= 1;
                if self.ramp_left == 0 {
                    self.snap_ramp();
                    if self.is_fade_out {
                        self.active = false;
                        break;
                    }
                }
            }
            self.step();
        }
    }
}
