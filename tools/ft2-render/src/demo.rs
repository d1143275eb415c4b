//! Procedural demo song
//!
//! Four synthesized instruments and four patterns in C minor. The drum and
//! bass parts are fixed; the lead melody is drawn from a seeded PCG so the
//! same seed always gives the same song.

use ft2_song::{
    AutoVibrato, AutoVibratoWaveform, Envelope, Instrument, InstrumentTable, LoopMode, NOTE_OFF,
    NoteEvent, Sample, Song, SongError,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Channel count of the demo song
pub const DEMO_CHANNELS: usize = 6;

pub const LEAD: u8 = 1;
pub const BASS: u8 = 2;
pub const HAT: u8 = 3;
pub const KICK: u8 = 4;

// Channel layout
const CH_KICK: usize = 0;
const CH_HAT: usize = 1;
const CH_BASS: usize = 2;
const CH_LEAD: usize = 3;
const CH_ECHO: usize = 4;
const CH_CHORD: usize = 5;

// Effect opcodes
const EFX_ARPEGGIO: u8 = 0;
const EFX_TONE_PORTA: u8 = 3;
const EFX_VIBRATO: u8 = 4;
const EFX_VOLUME_SLIDE: u8 = 10;
const EFX_BREAK: u8 = 13;
const EFX_EXTENDED: u8 = 14;

/// Rate at which a sample plays back at C-4
const C4_RATE: f32 = 8363.0;

/// Chord roots per 16-row quarter, in semitones above C
const PROGRESSION: [u8; 4] = [0, 8, 3, 10];

/// C minor pentatonic
const SCALE: [u8; 5] = [0, 3, 5, 7, 10];

/// Pattern note number (1 = C-0)
fn note(octave: u8, semitone: u8) -> u8 {
    octave * 12 + semitone + 1
}

/// Volume column "set volume"
fn vol(volume: u8) -> u8 {
    0x10 + volume.min(64)
}

/// Build the demo song and its instruments from a seed
pub fn build(seed: u64) -> Result<(Song, InstrumentTable), SongError> {
    let mut rng = Pcg32::seed_from_u64(seed);

    let mut table = InstrumentTable::new();
    table.insert(LEAD as usize, lead())?;
    table.insert(BASS as usize, bass())?;
    table.insert(HAT as usize, hat(&mut rng))?;
    table.insert(KICK as usize, kick())?;

    let mut song = Song::new(DEMO_CHANNELS)?;
    song.name = format!("ft2-render demo #{seed}");
    song.initial_speed = 6;
    song.initial_bpm = 125;
    song.set_orders(&[0, 1, 2, 1, 3])?;
    song.song_loop_start = 1;

    // Intro: rhythm section only
    write_drums(&mut song, 0, false);
    write_bass(&mut song, 0);

    for pattern in [1, 2] {
        write_drums(&mut song, pattern, false);
        write_bass(&mut song, pattern);
        write_melody(&mut song, pattern, &mut rng);
        write_chords(&mut song, pattern);
    }

    // Outro: shortened by a break, lead fades out
    write_drums(&mut song, 3, true);
    write_bass(&mut song, 3);
    write_melody(&mut song, 3, &mut rng);
    for row in 32..47 {
        let cell = song
            .note(3, row, CH_LEAD)
            .copied()
            .unwrap_or_default()
            .with_effect(EFX_VOLUME_SLIDE, 0x02);
        song.set_note(3, row, CH_LEAD, cell);
    }
    song.set_note(3, 47, CH_CHORD, NoteEvent::effect(EFX_BREAK, 0x00));

    Ok((song, table))
}

// =============================================================================
// Instruments
// =============================================================================

/// Square wave with a sustained envelope and delayed vibrato
fn lead() -> Instrument {
    // 32 samples per cycle puts C-4 on pitch
    let data: Vec<i8> = (0..32).map(|i| if i < 16 { 72 } else { -72 }).collect();
    let mut sample = Sample::from_i8(data).with_loop(LoopMode::Forward, 0, 32);
    sample.volume = 48;
    sample.panning = 96;
    sample.relative_note = 12;

    let mut instrument = Instrument::with_sample(sample);
    instrument.name = "lead".into();
    instrument.volume_envelope =
        Envelope::from_points(&[(0, 64), (4, 48), (16, 40), (48, 0)]).with_sustain(2);
    instrument.fadeout = 0x200;
    instrument.auto_vibrato = AutoVibrato {
        waveform: AutoVibratoWaveform::Sine,
        sweep: 32,
        depth: 3,
        rate: 24,
    };
    instrument
}

/// Ramp looped back and forth, which plays as a triangle
fn bass() -> Instrument {
    let data: Vec<i16> = (0..64).map(|i| (i * 1000 - 32_000) as i16).collect();
    let mut sample = Sample::from_i16(data).with_loop(LoopMode::PingPong, 0, 64);
    sample.volume = 56;
    // The bounce doubles the period; C-2 in the pattern sounds as C-2
    sample.relative_note = 24;

    let mut instrument = Instrument::with_sample(sample);
    instrument.name = "bass".into();
    instrument.volume_envelope =
        Envelope::from_points(&[(0, 64), (8, 52), (24, 44)]).with_sustain(2);
    instrument.fadeout = 0x400;
    instrument
}

/// Decaying white noise
fn hat(rng: &mut Pcg32) -> Instrument {
    let len = 1200;
    let data: Vec<i8> = (0..len)
        .map(|i| {
            let env = 1.0 - i as f32 / len as f32;
            (rng.random_range(-1.0f32..1.0) * 100.0 * env * env) as i8
        })
        .collect();
    let mut sample = Sample::from_i8(data);
    sample.volume = 40;
    sample.panning = 160;

    let mut instrument = Instrument::with_sample(sample);
    instrument.name = "hat".into();
    instrument
}

/// Sine with a falling pitch and exponential decay
fn kick() -> Instrument {
    let len = 3000;
    let mut phase = 0.0f32;
    let data: Vec<i16> = (0..len)
        .map(|i| {
            let t = i as f32 / len as f32;
            let freq = 50.0 + 110.0 * (1.0 - t).powi(3);
            phase += std::f32::consts::TAU * freq / C4_RATE;
            (phase.sin() * 30_000.0 * (-4.0 * t).exp()) as i16
        })
        .collect();

    let mut instrument = Instrument::with_sample(Sample::from_i16(data));
    instrument.name = "kick".into();
    instrument
}

// =============================================================================
// Patterns
// =============================================================================

fn write_drums(song: &mut Song, pattern: u8, fill: bool) {
    let rows = song.pattern_rows(pattern);
    for row in 0..rows {
        if row % 8 == 0 || (fill && row >= 40 && row % 2 == 0) {
            song.set_note(pattern, row, CH_KICK, NoteEvent::note(note(4, 0), KICK));
        }
        if row % 2 == 0 {
            let accent = if row % 4 == 2 { 48 } else { 24 };
            let cell = NoteEvent::note(note(5, 0), HAT)
                .with_volume(vol(accent))
                .with_effect(EFX_EXTENDED, 0xC3);
            song.set_note(pattern, row, CH_HAT, cell);
        }
    }
}

fn write_bass(song: &mut Song, pattern: u8) {
    let rows = song.pattern_rows(pattern);
    for row in (0..rows).step_by(4) {
        let root = PROGRESSION[(row / 16) as usize % PROGRESSION.len()];
        let cell = if row % 8 == 4 {
            // Slide up a fifth into the off-beat
            NoteEvent::note(note(2, root) + 7, BASS).with_effect(EFX_TONE_PORTA, 0x20)
        } else {
            NoteEvent::note(note(2, root), BASS)
        };
        song.set_note(pattern, row, CH_BASS, cell);
    }
}

/// Seeded lead line, doubled on the echo channel two ticks late
fn write_melody(song: &mut Song, pattern: u8, rng: &mut Pcg32) {
    let rows = song.pattern_rows(pattern);
    let mut holding = false;
    for row in (0..rows).step_by(2) {
        let roll: f32 = rng.random();
        let cell = if roll < 0.55 {
            let degree = SCALE[rng.random_range(0..SCALE.len())];
            let octave = if rng.random_bool(0.25) { 4 } else { 3 };
            holding = true;
            NoteEvent::note(note(octave, degree), LEAD)
        } else if roll < 0.65 && holding {
            holding = false;
            NoteEvent::note(NOTE_OFF, 0)
        } else if holding {
            NoteEvent::effect(EFX_VIBRATO, 0x46)
        } else {
            continue;
        };
        song.set_note(pattern, row, CH_LEAD, cell);

        let echo = if cell.note != 0 {
            NoteEvent { efx: EFX_EXTENDED, efx_data: 0xD2, ..cell }.with_volume(vol(20))
        } else {
            cell
        };
        song.set_note(pattern, row, CH_ECHO, echo);
    }
}

/// Minor-chord arpeggio on each root
fn write_chords(song: &mut Song, pattern: u8) {
    let rows = song.pattern_rows(pattern);
    for row in (0..rows).step_by(16) {
        let root = PROGRESSION[(row / 16) as usize % PROGRESSION.len()];
        let cell = NoteEvent::note(note(3, root), LEAD)
            .with_volume(vol(16))
            .with_effect(EFX_ARPEGGIO, 0x37);
        song.set_note(pattern, row, CH_CHORD, cell);
        for hold in row + 1..(row + 12).min(rows) {
            song.set_note(pattern, hold, CH_CHORD, NoteEvent::effect(EFX_ARPEGGIO, 0x37));
        }
        if row + 12 < rows {
            song.set_note(pattern, row + 12, CH_CHORD, NoteEvent::note(NOTE_OFF, 0));
        }
    }
}
