//! CLI Module
//!
//! Command-line interface for rendering sweepers.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sweeper - radio sweeper voice processing and mixing
#[derive(Parser, Debug)]
#[command(name = "sweeper-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a voice take into a finished sweeper
    #[command(name = "render")]
    Render(RenderArgs),

    /// List effect, track and sound-effect presets
    #[command(name = "presets")]
    Presets,

    /// Write a preset's audio as WAV for auditioning
    #[command(name = "render-preset")]
    RenderPreset {
        /// Preset id, e.g. EnergeticBeat or laser-zap
        id: String,

        /// Output WAV path (default: <id>.wav)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct RenderArgs {
    /// Voice audio (WAV, MP3, OGG or FLAC)
    #[arg(required_unless_present = "job")]
    pub voice: Option<PathBuf>,

    /// JSON render job instead of flags
    #[arg(long, conflicts_with = "voice")]
    pub job: Option<PathBuf>,

    /// Script text, used for the artifact name
    #[arg(short, long, default_value = "")]
    pub script: String,

    /// Effect preset
    #[arg(short, long, default_value = "None")]
    pub effect: String,

    /// Background track preset
    #[arg(short, long)]
    pub track: Option<String>,

    /// Custom background audio, replaces --track
    #[arg(long, conflicts_with = "track")]
    pub track_file: Option<PathBuf>,

    /// Background volume, 0.0 to 1.0
    #[arg(long, default_value_t = 0.5)]
    pub volume: f32,

    /// Sound effect as PRESET[:GAIN[:PLACEMENT]], repeatable
    #[arg(long = "sfx")]
    pub sfx: Vec<String>,

    /// Vocal drop as FILE[:GAIN[:PLACEMENT]], repeatable
    #[arg(long = "drop")]
    pub drops: Vec<String>,

    /// Output WAV path (default: <output_dir>/<script slug>_take1.wav)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
