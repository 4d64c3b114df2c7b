//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::RenderArgs;
use crate::assets::{BundledPresets, DirectoryPresets, PresetAssetStore, PresetId};
use crate::config::SweeperConfig;
use crate::dsp::EffectPreset;
use crate::engine::{linear_to_db, write_wav_file};
use crate::error::{Result, SweeperError};
use crate::mix::Placement;
use crate::studio::{
    BackgroundConfig, DropPlacement, RenderReport, SfxPlacement, Studio, TakeConfig, TrackChoice,
};

/// A vocal drop read from disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropFile {
    pub path: PathBuf,
    #[serde(default)]
    pub script: String,
    #[serde(default = "default_gain")]
    pub gain: f32,
    #[serde(default = "default_drop_placement")]
    pub placement: Placement,
}

fn default_gain() -> f32 {
    1.0
}

fn default_drop_placement() -> Placement {
    Placement::End
}

/// A whole render described in JSON
///
/// `config.vocal_drops` is filled from `vocal_drops`; a custom background
/// comes from `background_file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    pub voice: PathBuf,
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub config: TakeConfig,
    #[serde(default)]
    pub background_file: Option<PathBuf>,
    #[serde(default = "default_background_volume")]
    pub background_volume: f32,
    #[serde(default)]
    pub vocal_drops: Vec<DropFile>,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_background_volume() -> f32 {
    0.5
}

impl RenderJob {
    /// Load a job file; relative paths resolve against the file's directory
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut job: RenderJob = serde_json::from_str(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        job.voice = base.join(&job.voice);
        job.background_file = job.background_file.map(|p| base.join(p));
        for drop in &mut job.vocal_drops {
            drop.path = base.join(&drop.path);
        }
        job.output = job.output.map(|p| base.join(p));
        Ok(job)
    }

    /// Build a job from command-line flags
    pub fn from_args(args: &RenderArgs) -> Result<Self> {
        let voice = args.voice.clone().ok_or_else(|| SweeperError::InvalidConfig {
            reason: "a voice file or --job is required".to_string(),
        })?;

        let mut config = TakeConfig::with_effect(args.effect.parse::<EffectPreset>()?);
        if let Some(track) = &args.track {
            config.background = Some(BackgroundConfig {
                track: TrackChoice::Preset(track.parse()?),
                volume: args.volume,
            });
        }
        for spec in &args.sfx {
            let (name, gain, placement) = parse_layer_spec(spec, Placement::Start)?;
            config.sfx.push(SfxPlacement {
                preset: name.parse()?,
                gain,
                placement,
            });
        }

        let vocal_drops = args
            .drops
            .iter()
            .map(|spec| {
                let (name, gain, placement) = parse_layer_spec(spec, Placement::End)?;
                Ok(DropFile {
                    path: PathBuf::from(name),
                    script: String::new(),
                    gain,
                    placement,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            voice,
            script: args.script.clone(),
            config,
            background_file: args.track_file.clone(),
            background_volume: args.volume,
            vocal_drops,
            output: args.output.clone(),
        })
    }
}

/// Split `NAME[:GAIN[:PLACEMENT]]`
pub fn parse_layer_spec(spec: &str, default_placement: Placement) -> Result<(String, f32, Placement)> {
    let mut name = spec;
    let mut gain = 1.0;
    let mut placement = default_placement;

    if let Some((head, tail)) = name.rsplit_once(':') {
        if let Ok(parsed) = tail.parse::<Placement>() {
            placement = parsed;
            name = head;
        }
    }
    if let Some((head, tail)) = name.rsplit_once(':') {
        if let Ok(parsed) = tail.parse::<f32>() {
            gain = parsed;
            name = head;
        }
    }
    if name.is_empty() {
        return Err(SweeperError::InvalidConfig {
            reason: format!("layer '{}' has no name", spec),
        });
    }
    Ok((name.to_string(), gain, placement))
}

/// Build the preset store the configuration asks for
pub fn open_store(config: &SweeperConfig) -> Result<PresetAssetStore> {
    let bundled = BundledPresets::new(config.render.default_sample_rate);
    match &config.asset_dir {
        Some(dir) => Ok(PresetAssetStore::new(Arc::new(DirectoryPresets::open(
            dir, bundled,
        )?))),
        None => Ok(PresetAssetStore::new(Arc::new(bundled))),
    }
}

/// Render a job and write the artifact; returns the written path and report.
pub async fn render(config: &SweeperConfig, job: RenderJob) -> Result<(PathBuf, RenderReport)> {
    info!("Rendering: {}", job.voice.display());

    let studio = Studio::new(Arc::new(open_store(config)?), config.render.clone());
    let take_id = studio.add_take(job.script.clone(), fs::read(&job.voice)?);

    let mut take_config = job.config;
    if let Some(path) = &job.background_file {
        take_config.background = Some(BackgroundConfig {
            track: TrackChoice::Custom(fs::read(path)?),
            volume: job.background_volume,
        });
    }
    for drop in &job.vocal_drops {
        let drop_id = studio.add_vocal_drop(drop.script.clone());
        match fs::read(&drop.path) {
            Ok(bytes) => {
                if let Err(e) = studio.fulfill_vocal_drop(drop_id, bytes).await {
                    warn!("Vocal drop {} unusable: {}", drop.path.display(), e);
                }
            }
            Err(e) => warn!("Vocal drop {} unreadable: {}", drop.path.display(), e),
        }
        take_config.vocal_drops.push(DropPlacement {
            drop_id,
            gain: drop.gain,
            placement: drop.placement,
        });
    }

    studio.configure(take_id, take_config)?;
    let rendered = studio.render(take_id).await?;
    let artifact = studio
        .artifact(take_id)?
        .ok_or_else(|| SweeperError::TakeNotFound {
            id: take_id.to_string(),
        })?;

    let path = job
        .output
        .unwrap_or_else(|| config.output_dir.join(&artifact.file_name));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, &artifact.wav)?;
    info!("Wrote {}", path.display());

    Ok((path, rendered.report.clone()))
}

/// `render` subcommand
pub async fn render_command(config: &SweeperConfig, args: &RenderArgs) -> Result<()> {
    let job = match &args.job {
        Some(path) => RenderJob::load(path)?,
        None => RenderJob::from_args(args)?,
    };
    let (path, report) = render(config, job).await?;

    println!("Output: {}", path.display());
    println!(
        "Duration: {:.2}s ({} Hz, {} ch)",
        report.duration_secs, report.sample_rate, report.channels
    );
    println!("Peak: {:.1} dBFS", linear_to_db(report.peak));
    if report.peak > 1.0 {
        println!("Note: the mix exceeds full scale and was clipped on export");
    }
    for skipped in &report.skipped {
        println!("Skipped {} #{}: {}", skipped.kind, skipped.index, skipped.reason);
    }
    println!("SHA-256: {}", report.checksum);
    Ok(())
}

/// `presets` subcommand
pub fn list_presets() -> Result<()> {
    println!("Effects:");
    for effect in EffectPreset::ALL {
        println!("  {:<16} {}", effect.id(), effect.display_name());
    }
    println!();
    println!("Background tracks:");
    for track in PresetId::tracks() {
        println!("  {}", track);
    }
    println!();
    println!("Sound effects:");
    for sfx in PresetId::sound_effects() {
        println!("  {}", sfx);
    }
    Ok(())
}

/// `render-preset` subcommand
pub async fn render_preset(config: &SweeperConfig, id: &str, output: Option<&Path>) -> Result<PathBuf> {
    let store = open_store(config)?;
    let preset: PresetId = id.parse()?;
    let clip = store.resolve_id(preset).await?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{}.wav", preset.id())));
    write_wav_file(&clip, &path)?;

    println!(
        "{}: {:.2}s written to {}",
        preset,
        clip.duration_secs(),
        path.display()
    );
    Ok(path)
}
