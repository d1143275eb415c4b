//! Engine handle and audio device
//!
//! [`EngineHandle`] is the thread-safe face of an [`AudioEngine`]: the
//! device callback renders through it and the main thread calls the control
//! surface through it. Mutations that could leave a voice pointing at freed
//! sample data go through [`EngineHandle::pause`], which stops every voice
//! before handing out the engine.
//!
//! [`AudioEngine`]: crate::AudioEngine

mod handle;
#[cfg(feature = "device")]
mod output;


pub use handle::{EngineHandle, PauseGuard};
#[cfg(feature = "device")]
pub use output::AudioDevice;
