//! Mix layers and their placement rules

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::{decode, AudioClip};
use crate::error::{Result, SweeperError};
use crate::ident::normalize_key;

/// Where a layer starts relative to the voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Placement {
    /// Repeat from offset 0 until the voice ends
    Loop,
    /// Once, from offset 0
    #[default]
    Start,
    /// Once, centered on the voice
    Middle,
    /// Once, ending with the voice
    End,
}

impl Placement {
    /// True for placements that play the layer a single time
    pub fn is_transient(&self) -> bool {
        !matches!(self, Placement::Loop)
    }
}

impl FromStr for Placement {
    type Err = SweeperError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_key(s).as_str() {
            "loop" => Ok(Placement::Loop),
            "start" => Ok(Placement::Start),
            "middle" => Ok(Placement::Middle),
            "end" => Ok(Placement::End),
            _ => Err(SweeperError::InvalidConfig {
                reason: format!("unknown placement '{}' (loop, start, middle, end)", s),
            }),
        }
    }
}

/// Start frame of a layer of `layer_len` frames over a voice of `voice_len`
///
/// Never negative: a layer longer than the voice starts at 0 for every
/// placement.
pub fn start_offset(placement: Placement, voice_len: usize, layer_len: usize) -> usize {
    match placement {
        Placement::Loop | Placement::Start => 0,
        Placement::Middle => voice_len.saturating_sub(layer_len) / 2,
        Placement::End => voice_len.saturating_sub(layer_len),
    }
}

/// Role of a layer in the mix, used when reporting skipped layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    Background,
    Sfx,
    VocalDrop,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Background => f.write_str("background"),
            LayerKind::Sfx => f.write_str("sfx"),
            LayerKind::VocalDrop => f.write_str("vocal drop"),
        }
    }
}

/// Audio behind a layer: already decoded, or bytes still to decode
#[derive(Debug, Clone)]
pub enum LayerSource {
    Clip(Arc<AudioClip>),
    Encoded(Arc<[u8]>),
}

impl LayerSource {
    /// Decoded clip for this source
    pub fn clip(&self) -> Result<Arc<AudioClip>> {
        match self {
            LayerSource::Clip(clip) => Ok(Arc::clone(clip)),
            LayerSource::Encoded(bytes) => decode(bytes).map(Arc::new),
        }
    }
}

impl From<Arc<AudioClip>> for LayerSource {
    fn from(clip: Arc<AudioClip>) -> Self {
        LayerSource::Clip(clip)
    }
}

impl From<AudioClip> for LayerSource {
    fn from(clip: AudioClip) -> Self {
        LayerSource::Clip(Arc::new(clip))
    }
}

impl From<Vec<u8>> for LayerSource {
    fn from(bytes: Vec<u8>) -> Self {
        LayerSource::Encoded(bytes.into())
    }
}

/// One secondary signal summed into the voice
#[derive(Debug, Clone)]
pub struct MixLayer {
    pub source: LayerSource,
    /// Linear gain, 0.0 to 1.0
    pub gain: f32,
    pub placement: Placement,
}

impl MixLayer {
    /// Create a layer; gain is clamped to 0.0..=1.0 (NaN becomes 0.0)
    pub fn new(source: impl Into<LayerSource>, gain: f32, placement: Placement) -> Self {
        let gain = if gain.is_nan() { 0.0 } else { gain.clamp(0.0, 1.0) };
        Self {
            source: source.into(),
            gain,
            placement,
        }
    }

    /// Looping background layer
    pub fn background(source: impl Into<LayerSource>, gain: f32) -> Self {
        Self::new(source, gain, Placement::Loop)
    }
}
