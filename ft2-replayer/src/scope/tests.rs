use super::*;
use crate::sync::ChannelSnapshot;

const UNITY: u64 = 1 << 32;

fn looped_state(mode: u8, start: u32, length: u32, sample_length: u32) -> ChannelState {
    ChannelState {
        voice_delta: UNITY,
        instrument: 1,
        sample_length,
        loop_start: start,
        loop_length: length,
        loop_mode: mode,
        final_volume: 1.0,
        status: ChannelStatus::TRIGGER_VOICE.bits(),
        ..Default::default()
    }
}

// =============================================================================
// Scope
// =============================================================================

#[test]
fn test_forward_loop_wraps_like_voice() {
    let mut scope = Scope::default();
    scope.trigger(&looped_state(1, 500, 500, 1000));
    assert_eq!(scope.position(), Some(0));

    scope.advance(1500);
    assert_eq!(scope.position(), Some(500), "one full loop past the end");
}

#[test]
fn test_ping_pong_runs_backwards_after_end() {
    let mut scope = Scope::default();
    scope.trigger(&looped_state(2, 0, 100, 100));
    scope.advance(150);
    assert_eq!(scope.position(), Some(49), "mirrored inside the loop");
}

#[test]
fn test_unlooped_scope_stops_at_end() {
    let mut scope = Scope::default();
    scope.trigger(&looped_state(0, 0, 0, 64));
    scope.advance(100);
    assert_eq!(scope.position(), None);
}

#[test]
fn test_start_past_end_stays_idle() {
    let mut scope = Scope::default();
    let mut state = looped_state(0, 0, 0, 64);
    state.start_pos = 64;
    scope.trigger(&state);
    assert!(!scope.is_active());
}

#[test]
fn test_update_retunes_without_restart() {
    let mut scope = Scope::default();
    scope.trigger(&looped_state(1, 0, 1000, 1000));
    scope.advance(10);

    let mut state = looped_state(1, 0, 1000, 1000);
    state.voice_delta = UNITY * 2;
    scope.update(&state);
    scope.advance(10);
    assert_eq!(scope.position(), Some(30));
}

// =============================================================================
// ScopeSet
// =============================================================================

fn snapshot_with(state: ChannelState, timestamp: u64, rate: u32) -> ChannelSnapshot {
    let mut snapshot = ChannelSnapshot {
        timestamp,
        rate,
        ..Default::default()
    };
    snapshot.channels[0] = state;
    snapshot
}

#[test]
fn test_set_triggers_from_due_snapshot() {
    let sync = SyncQueues::new();
    let mut scopes = ScopeSet::new();
    sync.channels
        .push(snapshot_with(looped_state(1, 0, 10_000, 10_000), 100, SCOPE_HZ * 100));

    scopes.update(&sync, 50);
    assert_eq!(scopes.scope(0).and_then(Scope::position), None, "not due yet");

    scopes.update(&sync, 100);
    assert_eq!(scopes.scope(0).and_then(Scope::position), Some(0));

    scopes.update(&sync, 200);
    assert_eq!(
        scopes.scope(0).and_then(Scope::position),
        Some(100),
        "rate / SCOPE_HZ samples per scope tick"
    );
}

#[test]
fn test_set_stops_on_stop_epoch() {
    let sync = SyncQueues::new();
    let mut scopes = ScopeSet::new();
    sync.channels
        .push(snapshot_with(looped_state(1, 0, 10_000, 10_000), 1, 48_000));
    scopes.update(&sync, 1);
    assert!(scopes.scope(0).is_some_and(Scope::is_active));

    sync.bump_stop_epoch();
    scopes.update(&sync, 2);
    assert!(!scopes.scope(0).is_some_and(Scope::is_active));
}

#[test]
fn test_thread_starts_and_stops() {
    let sync = Arc::new(SyncQueues::new());
    let thread = ScopeThread::spawn(sync, Clock::new()).unwrap();
    assert!(thread.is_alive());
    assert_eq!(thread.sample_position(0), None);
    assert_eq!(thread.sample_position(MAX_CHANNELS), None);
    drop(thread);
}
