//! Preset catalogue
//!
//! Background tracks and sound effects share one identifier space. Each
//! enumeration has a `None` entry, which resolves to an empty clip.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweeperError};
use crate::ident::normalize_key;

/// Which slot a preset may fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresetCategory {
    /// The no-op entry, valid in every slot
    Empty,
    /// Looping background bed
    Track,
    /// One-shot sound effect
    Sfx,
}

/// Identifier of a bundled audio preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PresetId {
    #[default]
    None,
    // Tracks
    EnergeticBeat,
    ChillLofi,
    NewsroomPulse,
    // Sound effects
    LaserZap,
    AirHorn,
    Whoosh,
    Impact,
}

impl PresetId {
    /// Every preset id
    pub const ALL: [PresetId; 8] = [
        PresetId::None,
        PresetId::EnergeticBeat,
        PresetId::ChillLofi,
        PresetId::NewsroomPulse,
        PresetId::LaserZap,
        PresetId::AirHorn,
        PresetId::Whoosh,
        PresetId::Impact,
    ];

    /// Stable identifier
    pub fn id(&self) -> &'static str {
        match self {
            PresetId::None => "None",
            PresetId::EnergeticBeat => "EnergeticBeat",
            PresetId::ChillLofi => "ChillLofi",
            PresetId::NewsroomPulse => "NewsroomPulse",
            PresetId::LaserZap => "LaserZap",
            PresetId::AirHorn => "AirHorn",
            PresetId::Whoosh => "Whoosh",
            PresetId::Impact => "Impact",
        }
    }

    pub fn category(&self) -> PresetCategory {
        match self {
            PresetId::None => PresetCategory::Empty,
            PresetId::EnergeticBeat | PresetId::ChillLofi | PresetId::NewsroomPulse => {
                PresetCategory::Track
            }
            PresetId::LaserZap | PresetId::AirHorn | PresetId::Whoosh | PresetId::Impact => {
                PresetCategory::Sfx
            }
        }
    }

    /// True for the no-op entry
    pub fn is_none(&self) -> bool {
        *self == PresetId::None
    }

    /// Presets valid in the background slot, `None` first
    pub fn tracks() -> impl Iterator<Item = PresetId> {
        Self::ALL
            .into_iter()
            .filter(|p| p.category() != PresetCategory::Sfx)
    }

    /// Presets valid in an SFX slot, `None` first
    pub fn sound_effects() -> impl Iterator<Item = PresetId> {
        Self::ALL
            .into_iter()
            .filter(|p| p.category() != PresetCategory::Track)
    }
}

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PresetId {
    type Err = SweeperError;

    fn from_str(s: &str) -> Result<Self> {
        let key = normalize_key(s);
        PresetId::ALL
            .into_iter()
            .find(|p| normalize_key(p.id()) == key)
            .ok_or_else(|| SweeperError::UnknownPreset { id: s.to_string() })
    }
}
