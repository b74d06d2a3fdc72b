//! Cadenza CLI - headless driver for animation scenes
//!
//! - `cadenza check <scene>` compiles every animation of a scene
//! - `cadenza play <scene>` plays a scene with a manual clock and prints the
//!   animated state of every target after each frame

mod player;
mod scene;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use cadenza_animation::InterpolationRegistry;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::player::{PlayOptions, Player};
use crate::scene::SceneConfig;

/// Headless driver for Cadenza animation scenes
#[derive(Parser, Debug)]
#[command(name = "cadenza")]
#[command(about = "Compile and play keyframe animation scenes headlessly")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a scene and compile every animation in it
    Check {
        /// Scene file (TOML)
        scene: PathBuf,
    },
    /// Play a scene until it goes idle
    Play {
        /// Scene file (TOML)
        scene: PathBuf,

        /// Frames per second of the simulated display
        #[arg(long, default_value = "60")]
        fps: u32,

        /// Stop after this many frames
        #[arg(long, default_value = "600")]
        max_frames: u64,

        /// Print one JSON object per frame
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Check { scene } => check(&scene),
        Command::Play {
            scene,
            fps,
            max_frames,
            json,
        } => play(
            &scene,
            PlayOptions {
                fps,
                max_frames,
                json,
            },
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn check(path: &Path) -> Result<()> {
    let scene = SceneConfig::load(path)?;
    let registry = InterpolationRegistry::new();

    let mut out = io::stdout().lock();
    for (i, animation) in scene.compile(&registry)?.iter().enumerate() {
        writeln!(
            out,
            "animation #{i} -> {}: {} properties, {} segments, {}ms",
            animation.target,
            animation.sampler.properties().len(),
            animation.sampler.segments().len(),
            animation.timing.end_time(),
        )?;
    }
    tracing::info!(animations = scene.animations.len(), "scene ok");
    Ok(())
}

fn play(path: &Path, options: PlayOptions) -> Result<()> {
    let scene = SceneConfig::load(path)?;
    let mut player = Player::new(&scene)?;
    let mut out = io::stdout().lock();
    let summary = player.run(options, &mut out)?;
    out.flush()?;

    tracing::info!(
        frames = summary.frames,
        end_time = summary.end_time,
        live_animations = summary.live_animations,
        truncated = summary.truncated,
        "playback finished"
    );
    Ok(())
}
