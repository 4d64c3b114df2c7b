//! Preset byte providers
//!
//! A [`PresetSource`] hands out the encoded bytes behind each preset id. The
//! store decodes them, so every source goes through the same codec path as an
//! uploaded file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::catalog::PresetId;
use super::synth::render_preset;
use crate::engine::{encode, DEFAULT_SAMPLE_RATE};
use crate::error::{Result, SweeperError};
use crate::ident::normalize_key;

/// File extensions picked up by [`DirectoryPresets`]
pub const PRESET_EXTENSIONS: [&str; 4] = ["wav", "mp3", "ogg", "flac"];

/// Provider of encoded preset audio
pub trait PresetSource: Send + Sync {
    /// Encoded bytes for `id`. `None` yields an empty payload.
    fn load(&self, id: PresetId) -> Result<Vec<u8>>;

    /// Short name for logs
    fn name(&self) -> &str;
}

// ============================================================================
// Bundled presets
// ============================================================================

/// Presets synthesized in-process and encoded as canonical WAV
#[derive(Debug, Clone)]
pub struct BundledPresets {
    sample_rate: u32,
}

impl BundledPresets {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Default for BundledPresets {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl PresetSource for BundledPresets {
    fn load(&self, id: PresetId) -> Result<Vec<u8>> {
        if id.is_none() {
            return Ok(Vec::new());
        }
        encode(&render_preset(id, self.sample_rate))
    }

    fn name(&self) -> &str {
        "bundled"
    }
}

// ============================================================================
// Directory presets
// ============================================================================

/// Presets read from `<dir>/<id>.{wav,mp3,ogg,flac}`
///
/// File stems match preset ids the same way CLI names do, so
/// `energetic-beat.mp3` serves `EnergeticBeat`. Ids without a file fall back
/// to the bundled audio.
#[derive(Debug, Clone)]
pub struct DirectoryPresets {
    root: PathBuf,
    files: HashMap<PresetId, PathBuf>,
    fallback: BundledPresets,
}

impl DirectoryPresets {
    /// Index `root` recursively
    ///
    /// # Errors
    /// * `Io` - `root` is not a readable directory
    pub fn open(root: &Path, fallback: BundledPresets) -> Result<Self> {
        if !root.is_dir() {
            return Err(SweeperError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("asset directory {} does not exist", root.display()),
            )));
        }

        let mut files = HashMap::new();
        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !PRESET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match stem.parse::<PresetId>() {
                Ok(id) if !id.is_none() => {
                    if let Some(previous) = files.insert(id, path.to_path_buf()) {
                        warn!(
                            preset = %id,
                            kept = %path.display(),
                            ignored = %previous.display(),
                            "duplicate preset file"
                        );
                    }
                }
                _ => debug!(file = %path.display(), key = %normalize_key(stem), "ignoring non-preset file"),
            }
        }

        debug!(root = %root.display(), presets = files.len(), "indexed preset directory");
        Ok(Self {
            root: root.to_path_buf(),
            files,
            fallback,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File serving `id`, if the directory has one
    pub fn file_for(&self, id: PresetId) -> Option<&Path> {
        self.files.get(&id).map(PathBuf::as_path)
    }
}

impl PresetSource for DirectoryPresets {
    fn load(&self, id: PresetId) -> Result<Vec<u8>> {
        match self.files.get(&id) {
            Some(path) => Ok(std::fs::read(path)?),
            None => self.fallback.load(id),
        }
    }

    fn name(&self) -> &str {
        "directory"
    }
}
