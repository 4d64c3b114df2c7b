//! Mix Engine
//!
//! Layers a background bed, sound effects and vocal drops over a voice.

pub mod layer;
pub mod mixer;

pub use layer::{start_offset, LayerKind, LayerSource, MixLayer, Placement};
pub use mixer::{mix, MixOutcome, SkippedLayer};
