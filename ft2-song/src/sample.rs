//! Sample data structures
//!
//! Besides the raw PCM, every sample keeps a float working copy padded with
//! [`GUARD_TAPS`] extra taps on both sides. Interpolation kernels read up to
//! eight taps around the playback position, so the padding lets the mixer
//! read past the loop or sample boundaries without special-casing them:
//!
//! - before the start: silence
//! - past the end (no loop): silence
//! - past the loop end (forward): the loop start repeated
//! - past the loop end (ping-pong): the loop mirrored
//!
//! A second small buffer holds the taps left of the loop start as they sound
//! once the loop has wrapped (the loop end, or its mirror image), which the
//! voice switches to after its first wrap.

/// Padding taps on each side of the working copy
pub const GUARD_TAPS: usize = 16;

/// Raw sample PCM
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleData {
    Pcm8(Vec<i8>),
    Pcm16(Vec<i16>),
}

impl SampleData {
    pub fn len(&self) -> usize {
        match self {
            Self::Pcm8(data) => data.len(),
            Self::Pcm16(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample value normalized to -1.0..1.0
    fn normalized(&self, index: usize) -> f32 {
        match self {
            Self::Pcm8(data) => data[index] as f32 * (1.0 / 128.0),
            Self::Pcm16(data) => data[index] as f32 * (1.0 / 32768.0),
        }
    }
}

/// Sample loop type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// No loop
    #[default]
    Off,
    /// Forward loop
    Forward,
    /// Ping-pong (bidirectional) loop
    PingPong,
}

/// FT2 sample
#[derive(Debug, Clone)]
pub struct Sample {
    /// Sample name
    pub name: String,
    data: SampleData,
    loop_start: u32,
    loop_length: u32,
    loop_mode: LoopMode,
    /// Default volume (0-64)
    pub volume: u8,
    /// Default panning (0-255)
    pub panning: u8,
    /// Finetune (-128..127, 16 steps per semitone after `>> 3`)
    pub finetune: i8,
    /// Relative note offset in semitones
    pub relative_note: i8,
    /// Padded float working copy
    taps: Vec<f32>,
    /// Taps left of the loop start after the loop has wrapped
    looped_left_edge: [f32; GUARD_TAPS],
}

impl Default for Sample {
    fn default() -> Self {
        Self::new(SampleData::Pcm8(Vec::new()))
    }
}

impl Sample {
    pub fn new(data: SampleData) -> Self {
        let mut sample = Self {
            name: String::new(),
            data,
            loop_start: 0,
            loop_length: 0,
            loop_mode: LoopMode::Off,
            volume: 64,
            panning: 128,
            finetune: 0,
            relative_note: 0,
            taps: Vec::new(),
            looped_left_edge: [0.0; GUARD_TAPS],
        };
        sample.rebuild_taps();
        sample
    }

    pub fn from_i8(data: Vec<i8>) -> Self {
        Self::new(SampleData::Pcm8(data))
    }

    pub fn from_i16(data: Vec<i16>) -> Self {
        Self::new(SampleData::Pcm16(data))
    }

    /// Set the loop, clamping it into the sample
    pub fn with_loop(mut self, mode: LoopMode, start: u32, length: u32) -> Self {
        self.set_loop(mode, start, length);
        self
    }

    pub fn set_loop(&mut self, mode: LoopMode, start: u32, length: u32) {
        let len = self.length();
        self.loop_start = start.min(len);
        self.loop_length = length.min(len - self.loop_start);
        self.loop_mode = mode;
        self.rebuild_taps();
    }

    /// Replace the PCM; the loop is re-clamped to the new length
    pub fn set_data(&mut self, data: SampleData) {
        self.data = data;
        self.set_loop(self.loop_mode, self.loop_start, self.loop_length);
    }

    pub fn data(&self) -> &SampleData {
        &self.data
    }

    pub fn is_16bit(&self) -> bool {
        matches!(self.data, SampleData::Pcm16(_))
    }

    pub fn length(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn loop_start(&self) -> u32 {
        self.loop_start
    }

    pub fn loop_length(&self) -> u32 {
        self.loop_length
    }

    /// Loop mode as played: a loop shorter than one sample is off
    pub fn loop_mode(&self) -> LoopMode {
        if self.loop_length < 1 {
            LoopMode::Off
        } else {
            self.loop_mode
        }
    }

    /// Position where playback stops or wraps
    pub fn end(&self) -> u32 {
        match self.loop_mode() {
            LoopMode::Off => self.length(),
            _ => self.loop_start + self.loop_length,
        }
    }

    /// Interpolation tap at sample index `index` (may be outside the sample)
    ///
    /// `looped` selects the post-wrap taps left of the loop start.
    #[inline]
    pub fn tap(&self, index: i64, looped: bool) -> f32 {
        if looped {
            let edge = index - self.loop_start as i64 + GUARD_TAPS as i64;
            if (0..GUARD_TAPS as i64).contains(&edge) {
                return self.looped_left_edge[edge as usize];
            }
        }
        let padded = index + GUARD_TAPS as i64;
        if padded < 0 {
            return 0.0;
        }
        self.taps.get(padded as usize).copied().unwrap_or(0.0)
    }

    /// Raw normalized value without padding, for scopes and tests
    pub fn value(&self, index: u32) -> f32 {
        if index < self.length() {
            self.data.normalized(index as usize)
        } else {
            0.0
        }
    }

    fn rebuild_taps(&mut self) {
        let len = self.data.len();
        let mut taps = vec![0.0f32; len + 2 * GUARD_TAPS];
        for i in 0..len {
            taps[GUARD_TAPS + i] = self.data.normalized(i);
        }

        self.looped_left_edge = [0.0; GUARD_TAPS];
        let start = self.loop_start as usize;
        let loop_len = self.loop_length as usize;
        let end = start + loop_len;

        match self.loop_mode() {
            LoopMode::Off => {
                for tap in &mut taps[GUARD_TAPS + len..] {
                    *tap = 0.0;
                }
            }
            LoopMode::Forward => {
                for k in 0..GUARD_TAPS {
                    taps[GUARD_TAPS + end + k] = self.data.normalized(start + k % loop_len);
                }
                for k in 1..=GUARD_TAPS {
                    let src = start + (loop_len - k % loop_len) % loop_len;
                    self.looped_left_edge[GUARD_TAPS - k] = self.data.normalized(src);
                }
            }
            LoopMode::PingPong => {
                let period = 2 * loop_len;
                for k in 0..GUARD_TAPS {
                    let m = k % period;
                    let src = if m < loop_len {
                        end - 1 - m
                    } else {
                        start + (m - loop_len)
                    };
                    taps[GUARD_TAPS + end + k] = self.data.normalized(src);
                }
                for k in 1..=GUARD_TAPS {
                    let m = (k - 1) % period;
                    let src = if m < loop_len {
                        start + m
                    } else {
                        end - 1 - (m - loop_len)
                    };
                    self.looped_left_edge[GUARD_TAPS - k] = self.data.normalized(src);
                }
            }
        }
        self.taps = taps;
    }
}
