//! Audio → display sync queues
//!
//! The audio thread pushes one pattern snapshot and one channel snapshot per
//! tick, stamped with the time the tick will actually be heard. The display
//! side pops everything that is due and shows the newest entry.
//!
//! Each queue is a `ringbuf` SPSC ring of [`SYNC_QUEUE_LEN`] - 1 entries.
//! The producer and consumer halves sit behind separate locks, so a push
//! never waits on a reader. A push into a full ring resets it once (dropping
//! what was queued) and then writes. The audio thread only ever `try_lock`s;
//! if a lock is busy the snapshot is dropped and counted instead.

mod snapshot;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

use ft2_song::MAX_CHANNELS;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::warn;

pub use snapshot::{ChannelSnapshot, ChannelState, PatternSnapshot, Timestamped};

/// Ring size in slots; one stays unused, as in FT2
pub const SYNC_QUEUE_LEN: usize = 4096;

/// `try_lock` that treats a poisoned lock as held-and-recovered
fn try_lock<T>(lock: &Mutex<T>) -> Option<MutexGuard<'_, T>> {
    match lock.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(e)) => Some(e.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}

/// Fixed-capacity single-writer/single-reader snapshot ring
pub struct SyncQueue<T> {
    producer: Mutex<HeapProd<T>>,
    consumer: Mutex<HeapCons<T>>,
    resets: AtomicU64,
    dropped: AtomicU64,
}

impl<T> fmt::Debug for SyncQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncQueue")
            .field("resets", &self.resets.load(Ordering::Relaxed))
            .field("dropped", &self.dropped.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T: Copy + Default> Default for SyncQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default> SyncQueue<T> {
    pub fn new() -> Self {
        let (producer, consumer) = HeapRb::<T>::new(SYNC_QUEUE_LEN - 1).split();
        Self {
            producer: Mutex::new(producer),
            consumer: Mutex::new(consumer),
            resets: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Usable entries
    pub fn capacity(&self) -> usize {
        SYNC_QUEUE_LEN - 1
    }

    fn consumer(&self) -> MutexGuard<'_, HeapCons<T>> {
        self.consumer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Entries waiting to be read
    pub fn size(&self) -> usize {
        self.consumer().occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn count_dropped(&self) {
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(dropped, "sync queue busy, snapshot dropped");
    }

    /// Append an entry; a full ring is reset first, dropping what was queued
    ///
    /// Never blocks. When the reader holds the ring at the moment a reset is
    /// needed, the entry is dropped and counted instead.
    pub fn push(&self, value: T) {
        let Some(mut producer) = try_lock(&self.producer) else {
            self.count_dropped();
            return;
        };
        let Err(value) = producer.try_push(value) else {
            return;
        };

        let Some(mut consumer) = try_lock(&self.consumer) else {
            self.count_dropped();
            return;
        };
        consumer.clear();
        drop(consumer);
        let resets = self.resets.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(resets, "sync queue full, resetting");

        if producer.try_push(value).is_err() {
            self.count_dropped();
        }
    }

    /// Oldest entry without removing it
    pub fn peek(&self) -> Option<T> {
        self.consumer().try_peek().copied()
    }

    /// Remove and return the oldest entry
    pub fn pop(&self) -> Option<T> {
        self.consumer().try_pop()
    }

    /// Drop everything queued
    pub fn reset(&self) {
        self.consumer().clear();
    }

    /// Number of overflow resets so far
    pub fn reset_count(&self) -> u64 {
        self.resets.load(Ordering::Relaxed)
    }

    /// Entries dropped because a lock was busy
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T: Copy + Default + Timestamped> SyncQueue<T> {
    /// Timestamp of the oldest entry
    pub fn timestamp_of_next(&self) -> Option<u64> {
        self.peek().map(|entry| entry.timestamp())
    }

    /// Pop every entry due at `now` and return the newest of them
    pub fn drain_until(&self, now: u64) -> Option<T> {
        self.drain_until_with(now, |_| {})
    }

    /// [`drain_until`](Self::drain_until), showing every consumed entry to
    /// `visit` first
    pub fn drain_until_with(&self, now: u64, mut visit: impl FnMut(&T)) -> Option<T> {
        let mut consumer = self.consumer();
        let mut latest = None;
        while let Some(entry) = consumer.try_peek().copied() {
            if entry.timestamp() > now {
                break;
            }
            visit(&entry);
            latest = consumer.try_pop();
        }
        // Zero timestamps are never reported
        latest.filter(|entry| entry.timestamp() != 0)
    }
}

/// Both sync queues plus the flag the pause guard clears
#[derive(Debug)]
pub struct SyncQueues {
    pub pattern: SyncQueue<PatternSnapshot>,
    pub channels: SyncQueue<ChannelSnapshot>,
    enabled: AtomicBool,
    /// Bumped whenever voices are stopped, so consumers drop their state
    stop_epoch: AtomicU64,
}

impl Default for SyncQueues {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncQueues {
    pub fn new() -> Self {
        Self {
            pattern: SyncQueue::new(),
            channels: SyncQueue::new(),
            enabled: AtomicBool::new(true),
            stop_epoch: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn reset(&self) {
        self.pattern.reset();
        self.channels.reset();
    }

    pub(crate) fn bump_stop_epoch(&self) {
        self.stop_epoch.fetch_add(1, Ordering::AcqRel);
    }

    pub fn stop_epoch(&self) -> u64 {
        self.stop_epoch.load(Ordering::Acquire)
    }

    /// Newest pattern snapshot due at `now`
    pub fn drain_patterns_until(&self, now: u64) -> Option<PatternSnapshot> {
        if !self.is_enabled() {
            return None;
        }
        self.pattern.drain_until(now)
    }

    /// Newest channel snapshot due at `now`
    ///
    /// The returned snapshot's status bits are the union over every consumed
    /// entry, so a trigger is never lost when several ticks are due at once.
    pub fn drain_channels_until(&self, now: u64) -> Option<ChannelSnapshot> {
        if !self.is_enabled() {
            return None;
        }

        let mut status = [0u8; MAX_CHANNELS];
        let latest = self.channels.drain_until_with(now, |entry| {
            for (acc, ch) in status.iter_mut().zip(&entry.channels) {
                *acc |= ch.status;
            }
        });

        let mut latest = latest?;
        for (ch, acc) in latest.channels.iter_mut().zip(status) {
            ch.status = acc;
        }
        Some(latest)
    }
}
