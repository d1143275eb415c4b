//! FT2 replayer: effect engine, voice mixer and audio/visual sync
//!
//! This crate plays [`ft2_song`] compositions the way FastTracker II does,
//! tick for tick, and produces interleaved PCM for an output device or a
//! file writer.
//!
//! # Architecture
//!
//! ```text
//!   main thread                 audio callback                 scope thread
//!  ┌─────────────┐   pause    ┌──────────────────────┐       ┌──────────────┐
//!  │ EngineHandle│──────────▶ │ AudioEngine          │       │ ScopeThread  │
//!  │  control    │   lock     │  Replayer::tick()    │       │  64 Hz       │
//!  └──────┬──────┘            │  Mixer::update/mix   │       └──────▲───────┘
//!         │                   └──────────┬───────────┘              │
//!         │  drain_until(now)            │ push (timestamped)       │
//!         │                   ┌──────────▼───────────┐              │
//!         └─────────────────▶ │ SyncQueues           │ ─────────────┘
//!                             │  pattern / channels  │
//!                             └──────────────────────┘
//! ```
//!
//! The engine never raises errors from the audio path. Missing instruments,
//! empty samples and out-of-range start offsets simply leave a voice silent.

pub mod channels;
pub mod clock;
pub mod config;
pub mod device;
mod error;
pub mod mixer;
pub mod pitch;
pub mod replayer;
pub mod scheduler;
pub mod scope;
pub mod sync;
pub mod tables;
pub mod timing;
pub mod voice;

pub use channels::{Channel, ChannelStatus};
pub use clock::Clock;
pub use config::{BitDepth, ReplayerConfig};
#[cfg(feature = "device")]
pub use device::AudioDevice;
pub use device::{EngineHandle, PauseGuard};
pub use error::ReplayerError;
pub use mixer::Mixer;
pub use replayer::{PlayMode, Replayer};
pub use scheduler::AudioEngine;
pub use scope::{ScopeSet, ScopeThread};
pub use sync::{ChannelSnapshot, ChannelState, PatternSnapshot, SyncQueue, SyncQueues};
pub use voice::{Interpolation, Voice};

// =============================================================================
// Limits
// =============================================================================

/// Lowest supported BPM
pub const MIN_BPM: u8 = 32;

/// Highest supported BPM
pub const MAX_BPM: u8 = 255;

/// Lowest supported output rate in Hz
pub const MIN_AUDIO_FREQ: u32 = 8_000;

/// Highest supported output rate in Hz
pub const MAX_AUDIO_FREQ: u32 = 192_000;

/// Amplification ceiling
pub const MAX_AMPLIFICATION: u32 = 32;

/// Master volume ceiling
pub const MAX_MASTER_VOLUME: u32 = 256;

/// Live voice plus fade-out voice for every channel
pub const MAX_VOICES: usize = ft2_song::MAX_CHANNELS * 2;

/// Scope thread rate in Hz
pub const SCOPE_HZ: u32 = 64;

/// Timestamp clock units per second (nanoseconds)
pub const CLOCK_HZ: f64 = 1_000_000_000.0;
