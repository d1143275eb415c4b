//! Real-time output on the default cpal device

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, info};

use super::EngineHandle;
use crate::config::AudioSettings;
use crate::error::ReplayerError;

/// Scratch samples reserved up front for formats that need conversion;
/// larger callbacks are rendered in chunks of this size
const SCRATCH_SAMPLES: usize = 16_384;

/// An open output stream driving an [`EngineHandle`]
pub struct AudioDevice {
    /// The cpal stream (kept alive for the duration)
    _stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
    format: cpal::SampleFormat,
}

impl std::fmt::Debug for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDevice")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("format", &self.format)
            .finish()
    }
}

fn device_error(context: &str, e: impl std::fmt::Display) -> ReplayerError {
    ReplayerError::Device(format!("{context}: {e}"))
}

impl AudioDevice {
    /// Open the default output device and start rendering
    ///
    /// The engine is switched to the device's native rate and its latency is
    /// set from `settings` before the stream starts.
    pub fn open(handle: &EngineHandle, settings: &AudioSettings) -> Result<Self, ReplayerError> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| ReplayerError::Device("no audio output device available".into()))?;

        let supported = device
            .default_output_config()
            .map_err(|e| device_error("failed to get default output config", e))?;

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        let format = supported.sample_format();

        {
            let mut engine = handle.pause();
            engine.set_audio_freq(sample_rate)?;
            let latency = if settings.latency_ms > 0 {
                settings.latency_ms as f64 / 1000.0
            } else {
                settings.buffer_size as f64 / sample_rate as f64
            };
            engine.set_latency(latency);
        }

        let config: cpal::StreamConfig = supported.into();
        let frame_channels = channels as usize;

        let stream = match format {
            cpal::SampleFormat::F32 => {
                let handle = handle.clone();
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            handle.render_f32(data, frame_channels);
                        },
                        |err| error!("Audio stream error: {}", err),
                        None,
                    )
                    .map_err(|e| device_error("failed to build audio stream", e))?
            }
            cpal::SampleFormat::I16 => {
                let handle = handle.clone();
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                            handle.render_i16(data, frame_channels);
                        },
                        |err| error!("Audio stream error: {}", err),
                        None,
                    )
                    .map_err(|e| device_error("failed to build audio stream", e))?
            }
            cpal::SampleFormat::U16 => {
                let handle = handle.clone();
                let mut scratch: Vec<i16> = vec![0; SCRATCH_SAMPLES];
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                            handle.render_u16(data, frame_channels, &mut scratch);
                        },
                        |err| error!("Audio stream error: {}", err),
                        None,
                    )
                    .map_err(|e| device_error("failed to build audio stream", e))?
            }
            other => {
                return Err(ReplayerError::Device(format!(
                    "unsupported sample format: {other:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| device_error("failed to play audio stream", e))?;

        info!(sample_rate, channels, ?format, "audio stream started");
        debug!(preferred = ?settings.bit_depth, "device format overrides bit depth");

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
            format,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}
