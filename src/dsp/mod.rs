//! Effect Engine
//!
//! Fixed voice effect presets built from a handful of primitives:
//! convolution, feedback delay, biquad filtering, ring modulation and
//! resampling.

pub mod convolution;
pub mod delay;
pub mod filter;
pub mod modulation;
pub mod preset;
pub mod resample;

pub use convolution::{convolve_reverb, fft_convolve, ImpulseResponse};
pub use delay::FeedbackDelay;
pub use filter::{biquad_cascade, BiquadCoeffs, FilterType};
pub use modulation::ring_modulate;
pub use preset::{apply_effect, EffectPreset, PITCH_DOWN_RATE, PITCH_UP_RATE};
pub use resample::{playback_rate, resample_linear};
