use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use super::*;
use crate::channels::ChannelStatus;

fn pattern_at(timestamp: u64, row: u8) -> PatternSnapshot {
    PatternSnapshot {
        row,
        timestamp,
        ..Default::default()
    }
}

// =============================================================================
// SyncQueue
// =============================================================================

#[test]
fn test_push_pop_in_order() {
    let queue = SyncQueue::<PatternSnapshot>::new();
    for i in 1..=10u8 {
        queue.push(pattern_at(i as u64, i));
    }
    assert_eq!(queue.size(), 10);
    for i in 1..=10u8 {
        assert_eq!(queue.pop().map(|s| s.row), Some(i), "entries come out in push order");
    }
    assert!(queue.is_empty());
    assert_eq!(queue.pop(), None);
}

#[test]
fn test_peek_does_not_consume() {
    let queue = SyncQueue::<PatternSnapshot>::new();
    queue.push(pattern_at(5, 1));
    assert_eq!(queue.peek().map(|s| s.row), Some(1));
    assert_eq!(queue.size(), 1);
    assert_eq!(queue.timestamp_of_next(), Some(5));
}

#[test]
fn test_fill_to_capacity_without_reset() {
    let queue = SyncQueue::<PatternSnapshot>::new();
    for i in 0..queue.capacity() {
        queue.push(pattern_at(i as u64 + 1, 0));
    }
    assert_eq!(queue.size(), queue.capacity());
    assert_eq!(queue.reset_count(), 0);
    assert_eq!(queue.timestamp_of_next(), Some(1));
}

#[test]
fn test_overflow_resets_exactly_once() {
    let queue = SyncQueue::<PatternSnapshot>::new();
    for i in 0..queue.capacity() {
        queue.push(pattern_at(i as u64 + 1, 0));
    }
    queue.push(pattern_at(99_999, 7));

    assert_eq!(queue.reset_count(), 1, "one overflow, one reset");
    assert_eq!(queue.size(), 1, "older entries are dropped");
    let entry = queue.pop().unwrap();
    assert_eq!(entry.row, 7);
    assert_eq!(entry.timestamp, 99_999, "the new entry is intact");
}

#[test]
fn test_push_does_not_wait_for_reader() {
    let queue = Arc::new(SyncQueue::<PatternSnapshot>::new());
    let reader = queue.consumer();

    let (done_tx, done_rx) = mpsc::channel();
    let writer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            queue.push(pattern_at(1, 1));
            let _ = done_tx.send(());
        })
    };
    let finished = done_rx.recv_timeout(Duration::from_millis(500)).is_ok();
    drop(reader);
    writer.join().unwrap();

    assert!(finished, "push completes while the reader holds the ring");
    assert_eq!(queue.pop().map(|s| s.row), Some(1));
    assert_eq!(queue.dropped_count(), 0);
}

#[test]
fn test_overflow_while_reader_busy_drops_entry() {
    let queue = SyncQueue::<PatternSnapshot>::new();
    for i in 0..queue.capacity() {
        queue.push(pattern_at(i as u64 + 1, 0));
    }

    {
        let _reader = queue.consumer();
        queue.push(pattern_at(99_999, 7));
    }

    assert_eq!(queue.dropped_count(), 1, "the entry is counted, not waited on");
    assert_eq!(queue.reset_count(), 0);
    assert_eq!(queue.size(), queue.capacity());
    assert_eq!(queue.timestamp_of_next(), Some(1));
}

#[test]
fn test_wraps_around_ring() {
    let queue = SyncQueue::<PatternSnapshot>::new();
    for round in 0..3u64 {
        for i in 0..3000u64 {
            queue.push(pattern_at(round * 10_000 + i + 1, 0));
        }
        for i in 0..3000u64 {
            assert_eq!(queue.pop().map(|s| s.timestamp), Some(round * 10_000 + i + 1));
        }
    }
    assert_eq!(queue.reset_count(), 0, "draining keeps the ring from overflowing");
}

#[test]
fn test_reset_empties() {
    let queue = SyncQueue::<PatternSnapshot>::new();
    queue.push(pattern_at(1, 0));
    queue.push(pattern_at(2, 0));
    queue.reset();
    assert!(queue.is_empty());
    assert_eq!(queue.reset_count(), 0, "explicit resets are not overflows");
}

#[test]
fn test_drain_until_returns_latest_due() {
    let queue = SyncQueue::<PatternSnapshot>::new();
    queue.push(pattern_at(10, 1));
    queue.push(pattern_at(20, 2));
    queue.push(pattern_at(30, 3));

    assert_eq!(queue.drain_until(5), None, "nothing due yet");
    assert_eq!(queue.drain_until(25).map(|s| s.row), Some(2));
    assert_eq!(queue.size(), 1, "future entry stays queued");
    assert_eq!(queue.drain_until(30).map(|s| s.row), Some(3));
}

#[test]
fn test_drain_discards_zero_timestamp() {
    let queue = SyncQueue::<PatternSnapshot>::new();
    queue.push(pattern_at(0, 9));
    assert_eq!(queue.drain_until(100), None);
    assert!(queue.is_empty(), "the stale entry is still consumed");
}

// =============================================================================
// SyncQueues
// =============================================================================

fn channels_at(timestamp: u64, status: u8) -> ChannelSnapshot {
    let mut snapshot = ChannelSnapshot {
        timestamp,
        ..Default::default()
    };
    snapshot.channels[0].status = status;
    snapshot
}

#[test]
fn test_channel_drain_merges_status() {
    let queues = SyncQueues::new();
    queues.channels.push(channels_at(10, ChannelStatus::TRIGGER_VOICE.bits()));
    queues.channels.push(channels_at(20, ChannelStatus::UPDATE_VOL.bits()));

    let snapshot = queues.drain_channels_until(20).unwrap();
    assert_eq!(snapshot.timestamp, 20);
    let status = snapshot.channels[0].status();
    assert!(
        status.contains(ChannelStatus::TRIGGER_VOICE),
        "a trigger on a skipped tick is kept"
    );
    assert!(status.contains(ChannelStatus::UPDATE_VOL));
}

#[test]
fn test_disabled_queues_do_not_drain() {
    let queues = SyncQueues::new();
    queues.pattern.push(pattern_at(1, 1));
    queues.set_enabled(false);
    assert_eq!(queues.drain_patterns_until(u64::MAX), None);
    assert_eq!(queues.pattern.size(), 1);

    queues.set_enabled(true);
    assert_eq!(queues.drain_patterns_until(u64::MAX).map(|s| s.row), Some(1));
}

#[test]
fn test_stop_epoch_increments() {
    let queues = SyncQueues::new();
    let before = queues.stop_epoch();
    queues.bump_stop_epoch();
    assert_eq!(queues.stop_epoch(), before + 1);
}

#[test]
fn test_piano_key_requires_instrument() {
    let state = ChannelState {
        final_period: 4608,
        ..Default::default()
    };
    assert_eq!(state.piano_key(true), None, "no instrument, no key");
}

#[test]
fn test_snapshot_serializes() {
    let json = serde_json::to_string(&pattern_at(42, 3)).unwrap();
    assert!(json.contains("\"row\":3"));
    assert!(json.contains("\"timestamp\":42"));
}
