//! Error types for the replayer crate

use ft2_song::SongError;

/// Errors surfaced to callers of the control surface
///
/// Faults inside the audio path never show up here: a voice with a missing
/// or empty sample is simply deactivated.
#[derive(Debug, thiserror::Error)]
pub enum ReplayerError {
    #[error("audio device error: {0}")]
    Device(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("channel {0} is out of range")]
    InvalidChannel(usize),
    #[error("instrument {0} is not loaded")]
    InvalidInstrument(usize),
    #[error("invalid note {0}")]
    InvalidNote(u8),
    #[error("unsupported sample rate {0} Hz")]
    SampleRate(u32),
    #[error(transparent)]
    Song(#[from] SongError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
