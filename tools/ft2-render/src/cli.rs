//! CLI command definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ft2-render")]
#[command(about = "Render or play procedurally generated FT2 songs")]
pub struct Cli {
    /// Engine config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the demo song to a WAV file
    Render {
        /// Output WAV path
        output: PathBuf,

        /// Seconds to render; stops earlier when the song loops
        #[arg(long, short, default_value_t = 60.0)]
        seconds: f64,

        /// Seed for the generated melody
        #[arg(long, default_value_t = 1)]
        seed: u64,

        /// Write one JSON line per row to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Play the demo song on the default output device
    #[cfg(feature = "playback")]
    Play {
        /// Seconds to play before stopping
        #[arg(long, short, default_value_t = 30.0)]
        seconds: f64,

        /// Seed for the generated melody
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },

    /// Print the effective engine config as TOML
    Config {
        /// Also save it to the platform config directory
        #[arg(long)]
        write: bool,
    },
}
