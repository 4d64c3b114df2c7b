//! Ring modulation

use std::f64::consts::PI;

/// Multiply a channel by a sine oscillator at `frequency` Hz
///
/// The oscillator starts at phase zero on the first sample.
pub fn ring_modulate(samples: &[f32], sample_rate: u32, frequency: f64) -> Vec<f32> {
    let step = 2.0 * PI * frequency / sample_rate as f64;
    samples
        .iter()
        .enumerate()
        .map(|(i, &s)| s * (step * i as f64).sin() as f32)
        .collect()
}
