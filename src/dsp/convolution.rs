//! Convolution reverb
//!
//! Synthetic decaying-noise impulse responses and FFT convolution.
//!
//! Impulses are always stereo. A mono signal convolves with the average of
//! the two impulse channels; a stereo signal pairs channel `k` with impulse
//! channel `k`; wider layouts use impulse channel `k % 2`.

use rand::Rng;
use rand_pcg::Pcg32;
use rustfft::{num_complex::Complex, FftPlanner};

use crate::engine::AudioClip;

/// Impulse normalization constants, matching what browser convolvers apply
const GAIN_CALIBRATION: f32 = 0.00125;
const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44100.0;
const MIN_POWER: f32 = 0.000125;

/// Two-channel impulse response
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    channels: [Vec<f32>; 2],
    sample_rate: u32,
}

impl ImpulseResponse {
    /// Synthesize uniform noise shaped by `(1 - i/length)^decay`
    pub fn synthesize(sample_rate: u32, duration_secs: f32, decay: f32, rng: &mut Pcg32) -> Self {
        let length = ((sample_rate as f32 * duration_secs).round() as usize).max(1);
        let mut channel = || -> Vec<f32> {
            (0..length)
                .map(|i| {
                    let noise: f32 = rng.gen_range(-1.0..1.0);
                    noise * (1.0 - i as f32 / length as f32).powf(decay)
                })
                .collect()
        };
        let left = channel();
        let right = channel();
        Self {
            channels: [left, right],
            sample_rate,
        }
    }

    /// Impulse length in samples
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// True if the impulse has no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One impulse channel (0 or 1)
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index % 2]
    }

    /// Equal-power scale so the wet level does not depend on impulse energy
    pub fn normalization_scale(&self) -> f32 {
        let total = (2 * self.len()) as f32;
        let sum_squares: f32 = self.channels.iter().flatten().map(|s| s * s).sum();
        let mut power = (sum_squares / total).sqrt();
        if !power.is_finite() || power < MIN_POWER {
            power = MIN_POWER;
        }
        (1.0 / power) * GAIN_CALIBRATION * (GAIN_CALIBRATION_SAMPLE_RATE / self.sample_rate as f32)
    }

    /// Kernel for a signal channel given the signal's channel count
    fn kernel_for(&self, channel: usize, signal_channels: usize) -> Vec<f32> {
        if signal_channels == 1 {
            self.channels[0]
                .iter()
                .zip(&self.channels[1])
                .map(|(l, r)| 0.5 * (l + r))
                .collect()
        } else {
            self.channel(channel).to_vec()
        }
    }
}

/// Linear convolution via FFT. Output length is `signal + kernel - 1`.
pub fn fft_convolve(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }

    let out_len = signal.len() + kernel.len() - 1;
    let fft_len = out_len.next_power_of_two();

    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let to_complex = |data: &[f32]| -> Vec<Complex<f32>> {
        let mut buf = vec![Complex::new(0.0, 0.0); fft_len];
        for (slot, &s) in buf.iter_mut().zip(data) {
            slot.re = s;
        }
        buf
    };

    let mut a = to_complex(signal);
    let mut b = to_complex(kernel);
    forward.process(&mut a);
    forward.process(&mut b);

    for (x, y) in a.iter_mut().zip(&b) {
        *x *= *y;
    }
    inverse.process(&mut a);

    let scale = 1.0 / fft_len as f32;
    a.iter().take(out_len).map(|c| c.re * scale).collect()
}

/// Dry signal plus the normalized convolution of every channel with `impulse`
///
/// The output carries the full tail: `len + impulse.len() - 1` frames.
pub fn convolve_reverb(clip: &AudioClip, impulse: &ImpulseResponse) -> AudioClip {
    if clip.is_empty() || impulse.is_empty() {
        return clip.clone();
    }

    let scale = impulse.normalization_scale();
    let channels = clip.channels();

    let rendered = clip
        .channel_data()
        .iter()
        .enumerate()
        .map(|(ch, dry)| {
            let mut wet = fft_convolve(dry, &impulse.kernel_for(ch, channels));
            for (i, sample) in wet.iter_mut().enumerate() {
                *sample *= scale;
                if let Some(&d) = dry.get(i) {
                    *sample += d;
                }
            }
            wet
        })
        .collect();

    AudioClip::from_channels(rendered, clip.sample_rate())
        .unwrap_or_else(|_| AudioClip::silent(channels, 0, clip.sample_rate()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(7)
    }

    #[test]
    fn test_fft_convolve_matches_direct() {
        let signal = [1.0, 2.0, 3.0];
        let kernel = [0.5, -1.0];
        let out = fft_convolve(&signal, &kernel);
        let expected = [0.5, 0.0, -0.5, -3.0];
        assert_eq!(out.len(), expected.len());
        for (a, b) in out.iter().zip(expected.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_fft_convolve_empty() {
        assert!(fft_convolve(&[], &[1.0]).is_empty());
        assert!(fft_convolve(&[1.0], &[]).is_empty());
    }

    #[test]
    fn test_impulse_shape_decays() {
        let ir = ImpulseResponse::synthesize(24000, 0.4, 1.5, &mut rng());
        assert_eq!(ir.len(), 9600);

        let head: f32 = ir.channel(0)[..960].iter().map(|s| s.abs()).sum();
        let tail: f32 = ir.channel(0)[8640..].iter().map(|s| s.abs()).sum();
        assert!(head > tail * 10.0);
        assert!(ir.channel(0).iter().all(|s| s.abs() <= 1.0));
        assert_ne!(ir.channel(0), ir.channel(1));
    }

    #[test]
    fn test_impulse_is_deterministic_per_seed() {
        let a = ImpulseResponse::synthesize(8000, 0.1, 2.0, &mut rng());
        let b = ImpulseResponse::synthesize(8000, 0.1, 2.0, &mut rng());
        assert_eq!(a, b);
    }

    #[test]
    fn test_mono_uses_averaged_impulse() {
        let ir = ImpulseResponse::synthesize(8000, 0.05, 1.0, &mut rng());
        let kernel = ir.kernel_for(0, 1);
        assert_relative_eq!(kernel[3], 0.5 * (ir.channel(0)[3] + ir.channel(1)[3]));
        assert_eq!(ir.kernel_for(1, 2), ir.channel(1).to_vec());
        assert_eq!(ir.kernel_for(2, 3), ir.channel(0).to_vec());
    }

    #[test]
    fn test_reverb_keeps_layout_and_adds_tail() {
        let clip = AudioClip::mono(vec![0.0, 1.0, 0.0, 0.0], 8000);
        let ir = ImpulseResponse::synthesize(8000, 0.01, 1.0, &mut rng());
        let out = convolve_reverb(&clip, &ir);
        assert_eq!(out.channels(), 1);
        assert_eq!(out.sample_rate(), 8000);
        assert_eq!(out.len(), 4 + ir.len() - 1);
    }
}
