//! Instrument data structures and envelopes

use crate::sample::Sample;
use crate::{MAX_PATTERN_NOTE, SongError};

/// Maximum breakpoints per envelope
pub const MAX_ENVELOPE_POINTS: usize = 12;

/// Maximum sample slots per instrument
pub const MAX_SAMPLES_PER_INSTRUMENT: usize = 16;

/// FT2 instrument
#[derive(Debug, Clone)]
pub struct Instrument {
    /// Instrument name
    pub name: String,
    /// Note→sample mapping (96 entries, sample slot 0-15)
    pub note_to_sample: [u8; MAX_PATTERN_NOTE as usize],
    /// Sample slots
    pub(crate) samples: Vec<Sample>,
    /// Volume envelope (values 0-64)
    pub volume_envelope: Envelope,
    /// Panning envelope (values 0-64, 32 = center)
    pub panning_envelope: Envelope,
    /// Fadeout speed (0-4095), subtracted from a 32768 fadeout volume per tick
    pub fadeout: u16,
    /// Automatic vibrato applied to every note
    pub auto_vibrato: AutoVibrato,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            name: String::new(),
            note_to_sample: [0; MAX_PATTERN_NOTE as usize],
            samples: Vec::new(),
            volume_envelope: Envelope::default(),
            panning_envelope: Envelope::default(),
            fadeout: 0,
            auto_vibrato: AutoVibrato::default(),
        }
    }
}

impl Instrument {
    /// Instrument with a single sample mapped to every note
    pub fn with_sample(sample: Sample) -> Self {
        Self {
            samples: vec![sample],
            ..Self::default()
        }
    }

    /// Instrument with several samples; mapping defaults to slot 0
    pub fn with_samples(samples: Vec<Sample>) -> Result<Self, SongError> {
        if samples.len() > MAX_SAMPLES_PER_INSTRUMENT {
            return Err(SongError::TooManySamples(samples.len()));
        }
        Ok(Self {
            samples,
            ..Self::default()
        })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Sample in a slot, `None` for unused slots
    pub fn sample(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn sample_mut(&mut self, index: usize) -> Option<&mut Sample> {
        self.samples.get_mut(index)
    }

    /// Sample slot for a pattern note (1-96)
    pub fn sample_for_note(&self, note: u8) -> u8 {
        let index = note.clamp(1, MAX_PATTERN_NOTE) as usize - 1;
        self.note_to_sample[index] & 0x0F
    }

    /// Map an inclusive note range to a sample slot
    pub fn map_notes(&mut self, notes: std::ops::RangeInclusive<u8>, sample: u8) {
        for note in notes {
            if (1..=MAX_PATTERN_NOTE).contains(&note) {
                self.note_to_sample[note as usize - 1] = sample & 0x0F;
            }
        }
    }
}

/// Envelope breakpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvelopePoint {
    /// Position in ticks
    pub tick: u16,
    /// Value (0-64)
    pub value: u8,
}

/// Breakpoint envelope with optional sustain point and loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Breakpoints; only the first `num_points` are used
    pub points: [EnvelopePoint; MAX_ENVELOPE_POINTS],
    /// Number of used points (1-12)
    pub num_points: u8,
    /// Sustain point index
    pub sustain_point: u8,
    /// Loop start point index
    pub loop_start: u8,
    /// Loop end point index
    pub loop_end: u8,
    /// Envelope flags
    pub flags: EnvelopeFlags,
}

impl Default for Envelope {
    fn default() -> Self {
        let mut points = [EnvelopePoint::default(); MAX_ENVELOPE_POINTS];
        points[0] = EnvelopePoint { tick: 0, value: 32 };
        Self {
            points,
            num_points: 1,
            sustain_point: 0,
            loop_start: 0,
            loop_end: 0,
            flags: EnvelopeFlags::empty(),
        }
    }
}

impl Envelope {
    /// Enabled envelope from `(tick, value)` pairs (at most 12 are kept)
    pub fn from_points(points: &[(u16, u8)]) -> Self {
        let mut env = Self::default();
        let count = points.len().min(MAX_ENVELOPE_POINTS);
        for (slot, &(tick, value)) in env.points.iter_mut().zip(points.iter().take(count)) {
            *slot = EnvelopePoint { tick, value };
        }
        env.num_points = count.max(1) as u8;
        env.flags = EnvelopeFlags::ENABLED;
        env
    }

    pub fn with_sustain(mut self, point: u8) -> Self {
        self.sustain_point = point;
        self.flags = self.flags | EnvelopeFlags::SUSTAIN;
        self
    }

    pub fn with_loop(mut self, start: u8, end: u8) -> Self {
        self.loop_start = start;
        self.loop_end = end;
        self.flags = self.flags | EnvelopeFlags::LOOP;
        self
    }

    /// Check if envelope is enabled
    pub fn is_enabled(&self) -> bool {
        self.flags.contains(EnvelopeFlags::ENABLED)
    }

    /// Check if envelope has a sustain point
    pub fn has_sustain(&self) -> bool {
        self.flags.contains(EnvelopeFlags::SUSTAIN)
    }

    /// Check if envelope has loop
    pub fn has_loop(&self) -> bool {
        self.flags.contains(EnvelopeFlags::LOOP)
    }

    /// Point lookup with the index clamped into the used range
    ///
    /// A shortened envelope can leave a channel's position past the last
    /// point; reads are clamped instead of trusting the index.
    pub fn point(&self, index: usize) -> EnvelopePoint {
        let last = (self.num_points.max(1) as usize).min(MAX_ENVELOPE_POINTS) - 1;
        self.points[index.min(last)]
    }

    pub fn len(&self) -> usize {
        (self.num_points as usize).min(MAX_ENVELOPE_POINTS)
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }
}

/// Envelope flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvelopeFlags(u8);

impl EnvelopeFlags {
    pub const ENABLED: Self = Self(0x01);
    pub const SUSTAIN: Self = Self(0x02);
    pub const LOOP: Self = Self(0x04);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for EnvelopeFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Auto-vibrato waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoVibratoWaveform {
    #[default]
    Sine,
    Square,
    RampUp,
    RampDown,
}

impl AutoVibratoWaveform {
    pub fn from_raw(value: u8) -> Self {
        match value {
            1 => Self::Square,
            2 => Self::RampUp,
            3 => Self::RampDown,
            _ => Self::Sine,
        }
    }
}

/// Instrument auto-vibrato settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutoVibrato {
    pub waveform: AutoVibratoWaveform,
    /// Ticks until full depth (0 = immediate)
    pub sweep: u8,
    /// Depth (0-15)
    pub depth: u8,
    /// Phase increment per tick (0-63)
    pub rate: u8,
}
