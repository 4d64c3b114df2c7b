//! Preset Asset Store
//!
//! Catalogue of background tracks and sound effects, the providers of their
//! encoded bytes, and the shared cache of decoded clips.

pub mod catalog;
pub mod source;
pub mod store;
pub mod synth;

pub use catalog::{PresetCategory, PresetId};
pub use source::{BundledPresets, DirectoryPresets, PresetSource, PRESET_EXTENSIONS};
pub use store::PresetAssetStore;
pub use synth::render_preset;
