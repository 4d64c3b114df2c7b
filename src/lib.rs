//! Sweeper - Radio Sweeper Voice Processing
//!
//! Turns a generated voice take into a finished radio sweeper:
//! 1. Effect Engine - one fixed voice effect preset per take
//! 2. Mix Engine - looping background bed, sound effects and vocal drops
//!
//! # Architecture
//!
//! Each take flows through decode → effect → layer resolution → mix →
//! encode. Preset audio is decoded once into a shared
//! [`assets::PresetAssetStore`]; takes live in a [`studio::Studio`] session
//! that only commits a render if the take was not reconfigured meanwhile.

pub mod assets;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod ident;
pub mod mix;
pub mod studio;

pub use error::{Result, SweeperError};
