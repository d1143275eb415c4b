use super::*;
use crate::error::ReplayerError;
use ft2_song::{Instrument, NOTE_OFF, NoteEvent, Sample};

const EFX_JUMP: u8 = 11;
const EFX_BREAK: u8 = 13;
const EFX_EXTENDED: u8 = 14;
const EFX_SPEED: u8 = 15;
const EFX_GLOBAL_SLIDE: u8 = 17;

fn tone_table() -> InstrumentTable {
    let mut table = InstrumentTable::new();
    let data: Vec<i8> = (0..256).map(|i| if i < 128 { 64 } else { -64 }).collect();
    table
        .insert(1, Instrument::with_sample(Sample::from_i8(data)))
        .unwrap();
    table
}

fn song_with_orders(orders: &[u8]) -> Song {
    let mut song = Song::new(4).unwrap();
    song.set_orders(orders).unwrap();
    song
}

fn playing(song: Song) -> Replayer {
    let mut replayer = Replayer::new(song, tone_table());
    replayer.start_playing(PlayMode::Song, 0);
    replayer
}

/// Run `ticks` ticks and collect the (order, row) of every row read
fn row_reads(replayer: &mut Replayer, ticks: usize) -> Vec<(u16, u16)> {
    let mut reads = Vec::new();
    for _ in 0..ticks {
        let reads_row = replayer.tick == 1 && replayer.patt_del_time2 == 0;
        let at = (replayer.song_pos(), replayer.row());
        replayer.tick();
        if reads_row {
            reads.push(at);
        }
    }
    reads
}

// =============================================================================
// Sequencing
// =============================================================================

#[test]
fn test_first_tick_reads_row() {
    let mut song = song_with_orders(&[0]);
    song.set_note(0, 0, 0, NoteEvent::note(49, 1));
    let mut replayer = playing(song);

    replayer.tick();
    let ch = replayer.channel(0).unwrap();
    assert_eq!(ch.note(), 49);
    assert!(ch.status().contains(ChannelStatus::TRIGGER_VOICE));
    assert_eq!(replayer.synced_position().row, 0);
}

#[test]
fn test_speed_six_advances_row_every_six_ticks() {
    let mut replayer = playing(song_with_orders(&[0]));
    for _ in 0..5 {
        replayer.tick();
    }
    assert_eq!(replayer.row(), 0);
    replayer.tick();
    assert_eq!(replayer.row(), 1);
}

#[test]
fn test_idle_does_not_read_rows() {
    let mut replayer = Replayer::new(song_with_orders(&[0]), tone_table());
    for _ in 0..20 {
        replayer.tick();
    }
    assert_eq!(replayer.row(), 0);
    assert!(!replayer.is_playing());
}

#[test]
fn test_song_wraps_to_loop_start() {
    let mut song = song_with_orders(&[0, 1]);
    song.song_loop_start = 1;
    let mut replayer = playing(song);
    replayer.set_pos(1, 63, true);

    for _ in 0..6 {
        replayer.tick();
    }
    assert_eq!(replayer.song_pos(), 1, "wrapped to the loop start");
    assert_eq!(replayer.row(), 0);
    assert_eq!(replayer.song_loops(), 1);
}

#[test]
fn test_pattern_mode_stays_on_pattern() {
    let mut replayer = Replayer::new(song_with_orders(&[0, 1]), tone_table());
    replayer.start_playing(PlayMode::Pattern, 63);
    for _ in 0..6 {
        replayer.tick();
    }
    assert_eq!(replayer.song_pos(), 0);
    assert_eq!(replayer.row(), 0, "pattern mode loops the pattern");
}

// =============================================================================
// Flow effects
// =============================================================================

#[test]
fn test_break_then_jump_same_row() {
    let mut song = song_with_orders(&[0; 8]);
    song.set_note(0, 0, 0, NoteEvent::effect(EFX_BREAK, 0x32));
    song.set_note(0, 0, 1, NoteEvent::effect(EFX_JUMP, 5));
    let mut replayer = playing(song);

    for _ in 0..6 {
        replayer.tick();
    }
    assert_eq!((replayer.song_pos(), replayer.row()), (5, 32));
}

#[test]
fn test_jump_then_break_same_row() {
    let mut song = song_with_orders(&[0; 8]);
    song.set_note(0, 0, 0, NoteEvent::effect(EFX_JUMP, 5));
    song.set_note(0, 0, 1, NoteEvent::effect(EFX_BREAK, 0x32));
    let mut replayer = playing(song);

    for _ in 0..6 {
        replayer.tick();
    }
    assert_eq!(
        (replayer.song_pos(), replayer.row()),
        (5, 32),
        "B must not clear the row D latched"
    );
}

#[test]
fn test_break_row_is_bcd_and_capped() {
    let mut song = song_with_orders(&[0, 0]);
    song.set_note(0, 0, 0, NoteEvent::effect(EFX_BREAK, 0x70));
    let mut replayer = playing(song);
    for _ in 0..6 {
        replayer.tick();
    }
    assert_eq!(replayer.row(), 0, "rows above 63 break to row 0");
    assert_eq!(replayer.song_pos(), 1);
}

#[test]
fn test_jump_past_end_wraps_to_start() {
    let mut song = song_with_orders(&[0, 0, 0]);
    song.set_note(0, 0, 0, NoteEvent::effect(EFX_JUMP, 0x50));
    let mut replayer = playing(song);
    replayer.set_pos(1, 0, true);
    for _ in 0..6 {
        replayer.tick();
    }
    assert_eq!(replayer.song_pos(), 0, "not order 2");
}

#[test]
fn test_pattern_loop_repeats_rows() {
    let mut song = song_with_orders(&[0]);
    song.set_note(0, 0, 0, NoteEvent::effect(EFX_EXTENDED, 0x60));
    song.set_note(0, 1, 0, NoteEvent::effect(EFX_EXTENDED, 0x62));
    let mut replayer = playing(song);

    let rows: Vec<u16> = row_reads(&mut replayer, 7 * 6)
        .into_iter()
        .map(|(_, row)| row)
        .collect();
    assert_eq!(rows, vec![0, 1, 0, 1, 0, 1, 2], "E62 plays the loop three times");
}

#[test]
fn test_pattern_delay_holds_row() {
    let mut song = song_with_orders(&[0]);
    song.set_note(0, 0, 0, NoteEvent::effect(EFX_EXTENDED, 0xE2));
    let mut replayer = playing(song);

    let reads = row_reads(&mut replayer, 18);
    assert_eq!(reads, vec![(0, 0)], "row 0 lasts three rows");
    let reads = row_reads(&mut replayer, 1);
    assert_eq!(reads, vec![(0, 1)]);
}

#[test]
fn test_speed_and_bpm_commands() {
    let mut song = song_with_orders(&[0]);
    song.set_note(0, 0, 0, NoteEvent::effect(EFX_SPEED, 3));
    song.set_note(0, 0, 1, NoteEvent::effect(EFX_SPEED, 0x80));
    song.set_note(0, 1, 0, NoteEvent::effect(EFX_SPEED, 0));
    let mut replayer = playing(song);

    replayer.tick();
    assert_eq!(replayer.speed(), 3);
    assert_eq!(replayer.bpm(), 128);

    for _ in 0..3 {
        replayer.tick();
    }
    assert_eq!(replayer.row(), 1);
    assert_eq!(replayer.speed(), 3, "F00 is ignored");
}

#[test]
fn test_note_delay_triggers_late() {
    let mut song = song_with_orders(&[0]);
    song.set_note(0, 0, 0, NoteEvent::note(49, 1).with_effect(EFX_EXTENDED, 0xD2));
    let mut replayer = playing(song);

    replayer.tick();
    replayer.tick();
    assert!(
        !replayer.channel(0).unwrap().status().contains(ChannelStatus::TRIGGER_VOICE),
        "no trigger before tick 2"
    );
    replayer.tick();
    let ch = replayer.channel(0).unwrap();
    assert!(ch.status().contains(ChannelStatus::TRIGGER_VOICE));
    assert_eq!(ch.note(), 49);
}

#[test]
fn test_muted_channel_still_breaks() {
    let mut song = song_with_orders(&[0, 0]);
    song.set_note(0, 0, 0, NoteEvent::note(49, 1).with_effect(EFX_BREAK, 0x16));
    let mut replayer = playing(song);
    replayer.set_channel_muted(0, true).unwrap();

    for _ in 0..6 {
        replayer.tick();
    }
    assert_eq!((replayer.song_pos(), replayer.row()), (1, 16));
    assert_eq!(replayer.channel(0).unwrap().note(), 0, "muted notes are not played");
}

#[test]
fn test_global_volume_slide() {
    let mut song = song_with_orders(&[0]);
    song.set_note(0, 0, 0, NoteEvent::effect(EFX_GLOBAL_SLIDE, 0x01));
    let mut replayer = playing(song);
    for _ in 0..6 {
        replayer.tick();
    }
    assert_eq!(replayer.global_volume(), 59, "one step on each non-zero tick");
}

// =============================================================================
// Control surface
// =============================================================================

#[test]
fn test_set_pos_clamps() {
    let mut replayer = playing(song_with_orders(&[0, 0]));
    replayer.set_pos(100, 500, true);
    assert_eq!(replayer.song_pos(), 1);
    assert_eq!(replayer.row(), 63);

    replayer.set_pos(-1, 10, false);
    assert_eq!(replayer.song_pos(), 1, "negative keeps the order");
    assert_eq!(replayer.row(), 10);
}

#[test]
fn test_bpm_and_speed_setters() {
    let mut replayer = playing(song_with_orders(&[0]));
    replayer.set_bpm(999);
    assert_eq!(replayer.bpm(), crate::MAX_BPM);
    replayer.set_bpm(1);
    assert_eq!(replayer.bpm(), crate::MIN_BPM);
    replayer.set_speed(0);
    assert_eq!(replayer.speed(), 6, "speed 0 is ignored");
}

#[test]
fn test_play_tone_validation() {
    let mut replayer = Replayer::new(song_with_orders(&[0]), tone_table());
    assert!(matches!(
        replayer.play_tone(40, 1, 49, None),
        Err(ReplayerError::InvalidChannel(40))
    ));
    assert!(matches!(
        replayer.play_tone(0, 5, 49, None),
        Err(ReplayerError::InvalidInstrument(5))
    ));
    assert!(matches!(
        replayer.play_tone(0, 1, 0, None),
        Err(ReplayerError::InvalidNote(0))
    ));

    replayer
        .instruments_mut()
        .modify(1, |ins| ins.sample_mut(0).unwrap().relative_note = 30)
        .unwrap();
    assert!(
        matches!(replayer.play_tone(0, 1, 95, None), Err(ReplayerError::InvalidNote(95))),
        "final note past B-9 is rejected"
    );
}

#[test]
fn test_play_tone_volume_override() {
    let mut replayer = Replayer::new(song_with_orders(&[0]), tone_table());
    replayer.play_tone(0, 1, 49, Some(20)).unwrap();
    let ch = replayer.channel(0).unwrap();
    assert_eq!(ch.volume(), 20);
    assert!(ch.status().contains(ChannelStatus::TRIGGER_VOICE));

    replayer.play_tone(0, 1, NOTE_OFF, None).unwrap();
    assert!(replayer.channel(0).unwrap().is_key_off());
}

#[test]
fn test_stop_playing_releases_notes() {
    let mut replayer = playing(song_with_orders(&[0]));
    replayer.play_tone(0, 1, 49, None).unwrap();
    replayer.stop_playing();

    assert_eq!(replayer.mode(), PlayMode::Idle);
    assert_eq!(replayer.global_volume(), MAX_GLOBAL_VOLUME);
    let ch = replayer.channel(0).unwrap();
    assert!(ch.is_key_off());
    assert_eq!(ch.volume(), 0, "no volume envelope, so key off cuts");
}

#[test]
fn test_mute_resets_channel() {
    let mut replayer = Replayer::new(song_with_orders(&[0]), tone_table());
    replayer.play_tone(0, 1, 49, None).unwrap();
    replayer.set_channel_muted(0, true).unwrap();

    let ch = replayer.channel(0).unwrap();
    assert!(replayer.is_channel_muted(0));
    assert_eq!(ch.volume(), 0);
    assert_eq!(ch.panning(), 128);
    assert!(replayer.set_channel_muted(32, true).is_err());
}

#[test]
fn test_playback_seconds_count_ticks() {
    let mut replayer = playing(song_with_orders(&[0]));
    for _ in 0..49 {
        replayer.tick();
    }
    assert_eq!(replayer.playback_seconds(), 0);
    for _ in 0..2 {
        replayer.tick();
    }
    assert_eq!(replayer.playback_seconds(), 1, "fifty 20 ms ticks make a second");

    replayer.start_playing(PlayMode::Song, 0);
    assert_eq!(replayer.playback_seconds(), 0, "restart resets the clock");
}

#[test]
fn test_start_playing_restores_song_global_volume() {
    let mut song = song_with_orders(&[0]);
    song.global_volume = 40;
    let mut replayer = Replayer::new(song, tone_table());
    replayer.set_global_volume(10);
    replayer.start_playing(PlayMode::Song, 0);
    assert_eq!(replayer.global_volume(), 40);
}
