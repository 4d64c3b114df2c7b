//! Configuration
//!
//! Loaded from JSON. Every field has a default, so an empty object `{}` is a
//! valid configuration file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::DEFAULT_SAMPLE_RATE;
use crate::error::{Result, SweeperError};

/// Knobs that make effect rendering deterministic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Seed for the reverb impulse noise
    pub impulse_seed: u64,
    /// Delay periods of tail appended by the feedback delay
    pub delay_tail_repeats: u32,
    /// Sample rate of the bundled preset synthesis. Empty payloads always
    /// decode at [`DEFAULT_SAMPLE_RATE`].
    pub default_sample_rate: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            impulse_seed: 0x5eed_cafe,
            delay_tail_repeats: 6,
            default_sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    /// Where rendered artifacts are written
    pub output_dir: PathBuf,
    /// Directory of preset audio files overriding the bundled presets
    pub asset_dir: Option<PathBuf>,
    /// Effect rendering settings
    pub render: RenderSettings,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("renders"),
            asset_dir: None,
            render: RenderSettings::default(),
        }
    }
}

impl SweeperConfig {
    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: SweeperConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.render.default_sample_rate == 0 {
            return Err(SweeperError::InvalidConfig {
                reason: "render.default_sample_rate must be positive".to_string(),
            });
        }
        if self.render.delay_tail_repeats > 64 {
            return Err(SweeperError::InvalidConfig {
                reason: format!(
                    "render.delay_tail_repeats {} is above the limit of 64",
                    self.render.delay_tail_repeats
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_empty_object_is_default() {
        let config: SweeperConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SweeperConfig::default());
    }

    #[test]
    fn test_partial_render_section() {
        let config: SweeperConfig =
            serde_json::from_str(r#"{"render": {"impulse_seed": 42}}"#).unwrap();
        assert_eq!(config.render.impulse_seed, 42);
        assert_eq!(config.render.delay_tail_repeats, 6);
    }

    #[test]
    fn test_load_rejects_zero_rate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sweeper.json");
        std::fs::write(&path, r#"{"render": {"default_sample_rate": 0}}"#).unwrap();

        let err = SweeperConfig::load(&path).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_load_reports_bad_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sweeper.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            SweeperConfig::load(&path),
            Err(SweeperError::Serialization(_))
        ));
    }
}
