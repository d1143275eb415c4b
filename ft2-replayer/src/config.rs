//! Replayer configuration (config.toml)
//!
//! Handles loading, saving, and providing defaults for engine settings.
//! Settings are stored in TOML format in the platform-specific config
//! directory, or at an explicit path chosen by the caller.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::ReplayerError;
use crate::voice::Interpolation;
use crate::{MAX_AMPLIFICATION, MAX_AUDIO_FREQ, MAX_MASTER_VOLUME, MIN_AUDIO_FREQ};

/// File name inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Engine configuration.
///
/// Contains all user-configurable settings organized into sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReplayerConfig {
    /// Output device settings
    #[serde(default)]
    pub audio: AudioSettings,
    /// Mixer quality and gain
    #[serde(default)]
    pub mixer: MixerSettings,
    /// Replayer behaviour
    #[serde(default)]
    pub playback: PlaybackSettings,
}

/// Output bit depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BitDepth {
    /// Signed 16-bit with triangular dither
    #[default]
    I16,
    /// 32-bit float, no dither
    F32,
}

/// Audio output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Output rate in Hz (default: 48000, range: 8000-192000)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Device buffer size in frames (default: 1024)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: u32,
    /// Output latency in milliseconds used to project snapshot timestamps
    /// (default: 0 = derive from the buffer size)
    #[serde(default)]
    pub latency_ms: u32,
    /// Output sample format (default: i16)
    #[serde(default)]
    pub bit_depth: BitDepth,
}

/// Mixer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerSettings {
    /// Resampling kernel (default: sinc8)
    #[serde(default = "default_interpolation")]
    pub interpolation: Interpolation,
    /// Amplification factor (default: 4, range: 1-32)
    #[serde(default = "default_amplification")]
    pub amplification: u32,
    /// Master volume (default: 256, range: 0-256)
    #[serde(default = "default_master_volume")]
    pub master_volume: u32,
    /// Ramp volume changes over a tick instead of stepping (default: true)
    #[serde(default = "default_true")]
    pub volume_ramping: bool,
}

/// Playback configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Linear frequency table instead of Amiga periods (default: true)
    #[serde(default = "default_true")]
    pub linear_periods: bool,
    /// Cut voices immediately on stop instead of sending key-off (default: false)
    #[serde(default)]
    pub kill_notes_on_stop: bool,
}

fn default_sample_rate() -> u32 {
    48_000
}
fn default_buffer_size() -> u32 {
    1024
}
fn default_interpolation() -> Interpolation {
    Interpolation::Sinc8
}
fn default_amplification() -> u32 {
    4
}
fn default_master_volume() -> u32 {
    MAX_MASTER_VOLUME
}
fn default_true() -> bool {
    true
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            latency_ms: 0,
            bit_depth: BitDepth::default(),
        }
    }
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            interpolation: default_interpolation(),
            amplification: default_amplification(),
            master_volume: default_master_volume(),
            volume_ramping: default_true(),
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            linear_periods: default_true(),
            kill_notes_on_stop: false,
        }
    }
}

impl AudioSettings {
    /// Latency used for timestamp projection, in seconds
    pub fn latency_secs(&self) -> f64 {
        if self.latency_ms > 0 {
            self.latency_ms as f64 / 1000.0
        } else {
            self.buffer_size as f64 / self.sample_rate.max(1) as f64
        }
    }
}

impl ReplayerConfig {
    /// Clamp every numeric setting into its supported range
    pub fn sanitized(mut self) -> Self {
        let rate = self.audio.sample_rate.clamp(MIN_AUDIO_FREQ, MAX_AUDIO_FREQ);
        if rate != self.audio.sample_rate {
            warn!(
                requested = self.audio.sample_rate,
                clamped = rate,
                "sample rate out of range"
            );
            self.audio.sample_rate = rate;
        }
        self.audio.buffer_size = self.audio.buffer_size.clamp(64, 16384);
        self.mixer.amplification = self.mixer.amplification.clamp(1, MAX_AMPLIFICATION);
        self.mixer.master_volume = self.mixer.master_volume.min(MAX_MASTER_VOLUME);
        self
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self, ReplayerError> {
        toml::from_str::<Self>(content)
            .map(Self::sanitized)
            .map_err(|e| ReplayerError::Config(e.to_string()))
    }

    /// Load `config.toml` from the platform config directory.
    ///
    /// Returns default values if the file doesn't exist or cannot be parsed.
    pub fn load() -> Self {
        config_dir()
            .map(|dir| Self::load_from(&dir.join(CONFIG_FILE)))
            .unwrap_or_default()
    }

    /// Load from an explicit path; missing or invalid files give defaults
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            debug!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        };
        match Self::from_toml(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), "invalid config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Save to the platform config directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self) -> Result<(), ReplayerError> {
        match config_dir() {
            Some(dir) => self.save_to(&dir.join(CONFIG_FILE)),
            None => Err(ReplayerError::Config(
                "no home directory to store the config in".to_string(),
            )),
        }
    }

    /// Save to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<(), ReplayerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ReplayerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Linux: `~/.config/ft2-replayer`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "ft2-replayer", "ft2-replayer")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ReplayerConfig::default();
        assert_eq!(config.audio.sample_rate, 48_000);
        assert_eq!(config.audio.bit_depth, BitDepth::I16);
        assert_eq!(config.mixer.interpolation, Interpolation::Sinc8);
        assert_eq!(config.mixer.amplification, 4);
        assert_eq!(config.mixer.master_volume, 256);
        assert!(config.playback.linear_periods);
        assert!(!config.playback.kill_notes_on_stop);
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config = ReplayerConfig::from_toml("").unwrap();
        assert_eq!(config, ReplayerConfig::default());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml_str = r#"
[mixer]
interpolation = "linear"

[playback]
linear_periods = false
"#;
        let config = ReplayerConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.mixer.interpolation, Interpolation::Linear);
        assert_eq!(config.mixer.amplification, 4); // default
        assert!(!config.playback.linear_periods);
        assert_eq!(config.audio.sample_rate, 48_000); // default
    }

    #[test]
    fn test_config_clamps_ranges() {
        let toml_str = r#"
[audio]
sample_rate = 1000

[mixer]
amplification = 99
master_volume = 1000
"#;
        let config = ReplayerConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.audio.sample_rate, MIN_AUDIO_FREQ);
        assert_eq!(config.mixer.amplification, MAX_AMPLIFICATION);
        assert_eq!(config.mixer.master_volume, MAX_MASTER_VOLUME);
    }

    #[test]
    fn test_config_invalid_is_error() {
        assert!(ReplayerConfig::from_toml("[audio]\nsample_rate = \"fast\"").is_err());
    }

    #[test]
    fn test_latency_derived_from_buffer() {
        let mut audio = AudioSettings::default();
        assert!((audio.latency_secs() - 1024.0 / 48_000.0).abs() < 1e-12);
        audio.latency_ms = 20;
        assert!((audio.latency_secs() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_config_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = ReplayerConfig::default();
        config.audio.bit_depth = BitDepth::F32;
        config.mixer.interpolation = Interpolation::Sinc16;
        config.playback.kill_notes_on_stop = true;
        config.save_to(&path).unwrap();

        let loaded = ReplayerConfig::load_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ReplayerConfig::load_from(&dir.path().join("missing.toml"));
        assert_eq!(loaded, ReplayerConfig::default());
    }
}
