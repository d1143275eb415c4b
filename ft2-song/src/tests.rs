//! Tests for the song data model

use super::*;

#[test]
fn test_song_defaults() {
    let song = Song::default();
    assert_eq!(song.num_channels(), 8);
    assert_eq!(song.song_length(), 1);
    assert_eq!(song.initial_bpm, 125);
    assert_eq!(song.initial_speed, 6);
    assert_eq!(song.global_volume, 64);
    assert_eq!(song.pattern_rows(0), DEFAULT_PATTERN_ROWS);
    assert!(song.note(0, 0, 0).is_none(), "unallocated pattern has no cells");
}

#[test]
fn test_channel_count_must_be_even() {
    assert!(Song::new(3).is_err());
    assert!(Song::new(0).is_err());
    assert!(Song::new(34).is_err());
    assert!(Song::new(32).is_ok());
}

#[test]
fn test_set_note_allocates_lazily() {
    let mut song = Song::new(4).unwrap();
    assert!(!song.pattern(2).has_data());
    assert!(song.set_note(2, 5, 3, NoteEvent::note(49, 1)));
    assert!(song.pattern(2).has_data());
    assert_eq!(song.note(2, 5, 3).map(|n| n.note), Some(49));
    assert_eq!(song.note(2, 5, 2), Some(&NoteEvent::default()));
    assert!(!song.set_note(2, 64, 0, NoteEvent::note(1, 1)), "row out of range");
}

#[test]
fn test_channel_restride_keeps_columns() {
    let mut song = Song::new(2).unwrap();
    song.set_note(0, 1, 1, NoteEvent::note(10, 2));
    song.set_num_channels(6).unwrap();
    assert_eq!(song.note(0, 1, 1).map(|n| n.note), Some(10));
    assert_eq!(song.note(0, 1, 5), Some(&NoteEvent::default()));
}

#[test]
fn test_pattern_rows_clamped() {
    let mut pattern = Pattern::new(0);
    assert_eq!(pattern.num_rows(), 1);
    pattern.set_num_rows(300);
    assert_eq!(pattern.num_rows(), 256);
}

#[test]
fn test_effect_decoding() {
    assert_eq!(Effect::from_raw(0x0D, 0x32), Effect::PatternBreak(0x32));
    assert_eq!(
        Effect::from_raw(0x0E, 0xD3),
        Effect::Extended(ExtendedEffect::NoteDelay(3))
    );
    assert_eq!(Effect::from_raw(33, 0x15), Effect::ExtraFinePortaUp(5));
    assert_eq!(Effect::from_raw(33, 0x35), Effect::None);
    assert_eq!(Effect::from_raw(18, 0x10), Effect::None, "I is not an FT2 effect");
}

#[test]
fn test_volume_column_decoding() {
    assert_eq!(VolumeCommand::from_raw(0x00), VolumeCommand::None);
    assert_eq!(VolumeCommand::from_raw(0x10), VolumeCommand::SetVolume(0));
    assert_eq!(VolumeCommand::from_raw(0x50), VolumeCommand::SetVolume(64));
    assert_eq!(VolumeCommand::from_raw(0x5F), VolumeCommand::SetVolume(64));
    assert_eq!(VolumeCommand::from_raw(0xC8), VolumeCommand::SetPanning(8));
    assert_eq!(VolumeCommand::from_raw(0xF3), VolumeCommand::TonePortamento(3));
}

#[test]
fn test_loop_clamped_to_sample() {
    let sample = Sample::from_i16(vec![0; 100]).with_loop(LoopMode::Forward, 80, 50);
    assert_eq!(sample.loop_start(), 80);
    assert_eq!(sample.loop_length(), 20);
    assert_eq!(sample.end(), 100);

    let sample = Sample::from_i8(vec![0; 10]).with_loop(LoopMode::PingPong, 4, 0);
    assert_eq!(sample.loop_mode(), LoopMode::Off, "zero-length loop plays as no loop");
    assert_eq!(sample.end(), 10);
}

#[test]
fn test_guard_taps_forward_loop() {
    let data: Vec<i16> = (0..8).map(|i| i * 1000).collect();
    let sample = Sample::from_i16(data).with_loop(LoopMode::Forward, 4, 4);
    // Past the loop end the loop start repeats.
    assert_eq!(sample.tap(8, false), sample.value(4));
    assert_eq!(sample.tap(9, false), sample.value(5));
    assert_eq!(sample.tap(12, false), sample.value(4));
    // Before the first wrap the real pre-loop data is read.
    assert_eq!(sample.tap(3, false), sample.value(3));
    // After the wrap the taps left of the loop start are the loop end.
    assert_eq!(sample.tap(3, true), sample.value(7));
    assert_eq!(sample.tap(2, true), sample.value(6));
    assert_eq!(sample.tap(-1, false), 0.0);
}

#[test]
fn test_guard_taps_pingpong_loop() {
    let data: Vec<i8> = (0..8).map(|i| i * 10).collect();
    let sample = Sample::from_i8(data).with_loop(LoopMode::PingPong, 2, 6);
    assert_eq!(sample.tap(8, false), sample.value(7), "mirror at loop end");
    assert_eq!(sample.tap(9, false), sample.value(6));
    assert_eq!(sample.tap(1, true), sample.value(2), "mirror at loop start");
    assert_eq!(sample.tap(0, true), sample.value(3));
}

#[test]
fn test_guard_taps_no_loop_are_silent() {
    let sample = Sample::from_i16(vec![i16::MAX; 4]);
    assert!(sample.tap(3, false) > 0.99);
    assert_eq!(sample.tap(4, false), 0.0);
    assert_eq!(sample.tap(100, false), 0.0);
}

#[test]
fn test_instrument_handles_go_stale() {
    let mut table = InstrumentTable::new();
    let handle = table
        .insert(1, Instrument::with_sample(Sample::from_i8(vec![1; 16])))
        .unwrap();
    assert!(table.resolve(handle).is_some());

    table.free(1).unwrap();
    assert!(table.resolve(handle).is_none(), "freed slot must not resolve");

    let replaced = table.allocate(1).unwrap();
    assert!(table.resolve(handle).is_none(), "old handle stays stale after reuse");
    assert!(table.resolve(replaced).is_some());
    assert_eq!(table.get(1).map(|i| i.samples().len()), Some(16));
}

#[test]
fn test_instrument_slot_bounds() {
    let mut table = InstrumentTable::new();
    assert!(table.allocate(0).is_err(), "slot 0 is reserved");
    assert!(table.allocate(129).is_err());
    assert!(table.allocate(128).is_ok());
}

#[test]
fn test_placeholder_is_silent() {
    let table = InstrumentTable::new();
    let placeholder = table.resolve_or_placeholder(InstrumentHandle { index: 7, generation: 3 });
    assert_eq!(placeholder.samples().len(), 1);
    assert_eq!(placeholder.samples()[0].volume, 0);
    assert_eq!(placeholder.samples()[0].length(), 0);
}

#[test]
fn test_modify_bumps_generation() {
    let mut table = InstrumentTable::new();
    let handle = table.allocate(3).unwrap();
    let fadeout = table.modify(3, |ins| {
        ins.fadeout = 512;
        ins.fadeout
    });
    assert_eq!(fadeout.unwrap(), Some(512));
    assert!(table.resolve(handle).is_none());
    assert_eq!(table.get(3).map(|i| i.fadeout), Some(512));
}

#[test]
fn test_envelope_point_clamps_index() {
    let env = Envelope::from_points(&[(0, 64), (10, 0)]);
    assert_eq!(env.len(), 2);
    assert_eq!(env.point(7), EnvelopePoint { tick: 10, value: 0 });
}
