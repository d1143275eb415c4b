//! Timestamp clock shared by the audio callback and the display side

use std::time::Instant;

/// Monotonic nanoseconds since the clock was created
///
/// Copies share the same epoch, so a timestamp taken on the audio thread can
/// be compared with one taken on the scope thread.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    epoch: Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Never 0, which the sync queues treat as "no timestamp"
    pub fn now(&self) -> u64 {
        (self.epoch.elapsed().as_nanos() as u64).max(1)
    }
}
