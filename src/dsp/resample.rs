//! Linear-interpolation resampling
//!
//! Used two ways: replaying a clip at a different rate (pitch and duration
//! change together) and converting layer assets to the voice's sample rate.

/// Replay `samples` at `rate`× speed
///
/// Output length is `ceil(len / rate)`; output sample `i` reads source
/// position `i * rate`.
pub fn playback_rate(samples: &[f32], rate: f64) -> Vec<f32> {
    if samples.is_empty() || rate <= 0.0 {
        return Vec::new();
    }
    let target_len = (samples.len() as f64 / rate).ceil() as usize;
    (0..target_len)
        .map(|i| interpolate(samples, i as f64 * rate))
        .collect()
}

/// Convert `samples` from `source_rate` to `target_rate`
///
/// Output length is `ceil(len * target / source)`.
pub fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate {
        return samples.to_vec();
    }
    playback_rate(samples, source_rate as f64 / target_rate as f64)
}

/// Linear interpolation between adjacent samples; zero past the end
#[inline]
fn interpolate(samples: &[f32], position: f64) -> f32 {
    let idx = position.floor() as usize;
    let frac = (position - idx as f64) as f32;
    match (samples.get(idx), samples.get(idx + 1)) {
        (Some(&a), Some(&b)) => a * (1.0 - frac) + b * frac,
        (Some(&a), None) => a,
        _ => 0.0,
    }
}
