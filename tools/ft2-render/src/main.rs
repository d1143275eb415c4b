//! ft2-render
//!
//! Builds a small procedural song, then either renders it to a WAV file with
//! the offline engine or plays it live on the default audio device.

mod cli;
mod demo;
#[cfg(feature = "playback")]
mod play;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use ft2_replayer::ReplayerConfig;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ReplayerConfig::load_from(path),
        None => ReplayerConfig::load(),
    };

    match cli.command {
        Commands::Render {
            output,
            seconds,
            seed,
            json,
        } => {
            let summary = render::render_to_wav(&config, seed, seconds, &output, json.as_deref())?;
            tracing::info!(
                path = %output.display(),
                frames = summary.frames,
                rows = summary.rows,
                looped = summary.looped,
                "render finished"
            );
        }
        #[cfg(feature = "playback")]
        Commands::Play { seconds, seed } => {
            play::run(&config, seed, seconds)?;
        }
        Commands::Config { write } => {
            let text = toml::to_string_pretty(&config).context("failed to serialize config")?;
            println!("{text}");
            if write {
                match &cli.config {
                    Some(path) => config.save_to(path)?,
                    None => config.save()?,
                }
            }
        }
    }

    Ok(())
}
