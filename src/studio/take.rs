//! Takes and their render configuration

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::drops::DropId;
use super::pipeline::RenderedTake;
use crate::assets::{PresetCategory, PresetId};
use crate::dsp::EffectPreset;
use crate::error::{Result, SweeperError};
use crate::mix::Placement;

/// Identifier of a take within a studio session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TakeId(Uuid);

impl TakeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TakeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Audio for the background slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackChoice {
    /// A catalogue track (`None` disables the background)
    Preset(PresetId),
    /// User-uploaded encoded audio
    Custom(Vec<u8>),
}

impl Default for TrackChoice {
    fn default() -> Self {
        TrackChoice::Preset(PresetId::None)
    }
}

/// Looping background bed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundConfig {
    pub track: TrackChoice,
    #[serde(default = "default_background_volume")]
    pub volume: f32,
}

fn default_background_volume() -> f32 {
    0.5
}

/// A sound effect placed once over the voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SfxPlacement {
    pub preset: PresetId,
    #[serde(default = "default_layer_gain")]
    pub gain: f32,
    #[serde(default)]
    pub placement: Placement,
}

/// A vocal drop placed once over the voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropPlacement {
    pub drop_id: DropId,
    #[serde(default = "default_layer_gain")]
    pub gain: f32,
    #[serde(default)]
    pub placement: Placement,
}

fn default_layer_gain() -> f32 {
    1.0
}

/// Everything that shapes a take's render besides its voice audio
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TakeConfig {
    pub effect: EffectPreset,
    pub background: Option<BackgroundConfig>,
    pub sfx: Vec<SfxPlacement>,
    pub vocal_drops: Vec<DropPlacement>,
}

impl TakeConfig {
    /// Dry voice with the given effect and no layers
    pub fn with_effect(effect: EffectPreset) -> Self {
        Self {
            effect,
            ..Self::default()
        }
    }

    /// Check gains, placements and preset slots
    ///
    /// # Errors
    /// * `InvalidConfig` - a gain is outside 0.0..=1.0, a one-shot layer asks
    ///   to loop, or a preset sits in the wrong slot
    pub fn validate(&self) -> Result<()> {
        if let Some(background) = &self.background {
            check_gain("background volume", background.volume)?;
            if let TrackChoice::Preset(id) = background.track {
                if id.category() == PresetCategory::Sfx {
                    return Err(invalid(format!("{} is a sound effect, not a track", id)));
                }
            }
        }

        for (i, sfx) in self.sfx.iter().enumerate() {
            check_gain(&format!("sfx[{}] gain", i), sfx.gain)?;
            if !sfx.placement.is_transient() {
                return Err(invalid(format!("sfx[{}] cannot loop", i)));
            }
            if sfx.preset.category() == PresetCategory::Track {
                return Err(invalid(format!(
                    "sfx[{}]: {} is a track, not a sound effect",
                    i, sfx.preset
                )));
            }
        }

        for (i, drop) in self.vocal_drops.iter().enumerate() {
            check_gain(&format!("vocal_drops[{}] gain", i), drop.gain)?;
            if !drop.placement.is_transient() {
                return Err(invalid(format!("vocal_drops[{}] cannot loop", i)));
            }
        }
        Ok(())
    }
}

fn check_gain(what: &str, gain: f32) -> Result<()> {
    if gain.is_finite() && (0.0..=1.0).contains(&gain) {
        Ok(())
    } else {
        Err(invalid(format!("{} {} is outside 0.0..=1.0", what, gain)))
    }
}

fn invalid(reason: String) -> SweeperError {
    SweeperError::InvalidConfig { reason }
}

// ============================================================================
// Take
// ============================================================================

/// Snapshot of one take
#[derive(Debug, Clone)]
pub struct Take {
    pub id: TakeId,
    /// 1-based position in the session
    pub index: usize,
    pub script: String,
    /// Compressed voice payload from speech generation
    pub source: Arc<[u8]>,
    pub config: TakeConfig,
    /// Bumped on every configuration change
    pub generation: u64,
    /// Latest committed render
    pub output: Option<Arc<RenderedTake>>,
}
