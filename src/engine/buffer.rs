//! Audio Clip
//!
//! The immutable decoded-audio value every stage of the pipeline passes
//! around. Samples are stored non-interleaved, one `Vec<f32>` per channel.

use crate::error::{Result, SweeperError};

// ============================================================================
// Constants
// ============================================================================

/// Sample rate used when nothing else determines one (speech output rate)
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Number of frames covering `secs` seconds at `sample_rate`, rounded to nearest
#[inline]
pub fn secs_to_frames(secs: f64, sample_rate: u32) -> usize {
    (secs * sample_rate as f64).round().max(0.0) as usize
}

/// Linear RMS level across all channels. Returns 0.0 for an empty clip.
pub fn calculate_rms(clip: &AudioClip) -> f32 {
    let total = clip.channels() * clip.len();
    if total == 0 {
        return 0.0;
    }

    let sum_squares: f64 = clip
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();

    (sum_squares / total as f64).sqrt() as f32
}

/// Linear peak level across all channels
pub fn calculate_peak(clip: &AudioClip) -> f32 {
    clip.samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| s.abs())
        .fold(0.0_f32, f32::max)
}

// ============================================================================
// Audio Clip
// ============================================================================

/// Decoded audio with a known sample rate and channel count
///
/// # Invariants
/// - `sample_rate > 0`
/// - at least one channel
/// - every channel has the same length
///
/// Amplitudes are not clamped; the encoder clamps on output.
///
/// # Example
/// ```
/// use sweeper::engine::AudioClip;
///
/// let clip = AudioClip::silent(2, 24000, 24000);
/// assert_eq!(clip.channels(), 2);
/// assert_eq!(clip.len(), 24000);
/// assert_eq!(clip.duration_secs(), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    samples: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioClip {
    /// Build a clip from per-channel sample vectors
    ///
    /// # Errors
    /// * `Decode` - zero channels, zero sample rate, or ragged channel lengths
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if samples.is_empty() {
            return Err(SweeperError::decode("audio has no channels"));
        }
        if sample_rate == 0 {
            return Err(SweeperError::decode("sample rate must be positive"));
        }
        let len = samples[0].len();
        if let Some((ch, bad)) = samples.iter().enumerate().find(|(_, c)| c.len() != len) {
            return Err(SweeperError::decode(format!(
                "channel {} has {} samples, expected {}",
                ch,
                bad.len(),
                len
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create a silent clip
    ///
    /// `channels` and `sample_rate` are raised to 1 if zero.
    pub fn silent(channels: usize, num_samples: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; channels.max(1)],
            sample_rate: sample_rate.max(1),
        }
    }

    /// Zero-length mono clip, the decode result of an empty payload
    pub fn empty(sample_rate: u32) -> Self {
        Self::silent(1, 0, sample_rate)
    }

    /// Build a mono clip from a single sample vector
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: vec![samples],
            sample_rate: sample_rate.max(1),
        }
    }

    /// Create a clip from interleaved sample data
    ///
    /// # Errors
    /// * `Decode` - if the data length is not a multiple of `channels`
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(SweeperError::decode("audio has no channels"));
        }
        if interleaved.len() % channels != 0 {
            return Err(SweeperError::decode(format!(
                "interleaved data length {} is not divisible by channel count {}",
                interleaved.len(),
                channels
            )));
        }

        let frames = interleaved.len() / channels;
        let mut samples = vec![Vec::with_capacity(frames); channels];
        for frame in interleaved.chunks_exact(channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Self::from_channels(samples, sample_rate)
    }

    /// Samples in interleaved order (frame 0 ch 0, frame 0 ch 1, ...)
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut interleaved = Vec::with_capacity(self.channels() * self.len());
        for frame in 0..self.len() {
            for channel in &self.samples {
                interleaved.push(channel[frame]);
            }
        }
        interleaved
    }

    /// Number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Number of frames (samples per channel)
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// True when the clip has no frames
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Immutable access to one channel
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// All channels
    #[inline]
    pub fn channel_data(&self) -> &[Vec<f32>] {
        &self.samples
    }

    /// Consume the clip and return its channel vectors
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.samples
    }

    /// Bit-exact comparison of rate, layout and every sample
    pub fn is_identical_to(&self, other: &AudioClip) -> bool {
        self.sample_rate == other.sample_rate
            && self.samples.len() == other.samples.len()
            && self
                .samples
                .iter()
                .zip(&other.samples)
                .all(|(a, b)| a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits()))
    }

    /// True if every sample is finite
    pub fn is_finite(&self) -> bool {
        self.samples.iter().flatten().all(|s| s.is_finite())
    }

    /// Average all channels into one
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels() == 1 {
            return self.samples[0].clone();
        }
        let scale = 1.0 / self.channels() as f32;
        (0..self.len())
            .map(|i| self.samples.iter().map(|ch| ch[i]).sum::<f32>() * scale)
            .collect()
    }

    /// Reconcile this clip's channels to `target` channels
    ///
    /// Equal counts copy through, mono up-mixes by duplication, anything
    /// going down to mono averages, and other combinations map channel `k`
    /// to source channel `k % channels`.
    pub fn remap_channels(&self, target: usize) -> Vec<Vec<f32>> {
        let target = target.max(1);
        if target == self.channels() {
            self.samples.clone()
        } else if target == 1 {
            vec![self.to_mono()]
        } else {
            (0..target)
                .map(|k| self.samples[k % self.channels()].clone())
                .collect()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_channels_rejects_ragged() {
        let result = AudioClip::from_channels(vec![vec![0.0; 4], vec![0.0; 3]], 24000);
        assert!(matches!(result, Err(SweeperError::Decode { .. })));
    }

    #[test]
    fn test_from_channels_rejects_no_channels() {
        assert!(AudioClip::from_channels(Vec::new(), 24000).is_err());
        assert!(AudioClip::from_channels(vec![vec![0.0]], 0).is_err());
    }

    #[test]
    fn test_interleave_roundtrip() {
        let clip = AudioClip::from_channels(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]], 8000)
            .unwrap();
        let interleaved = clip.to_interleaved();
        assert_eq!(interleaved, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);

        let back = AudioClip::from_interleaved(&interleaved, 2, 8000).unwrap();
        assert!(back.is_identical_to(&clip));
    }

    #[test]
    fn test_from_interleaved_bad_length() {
        assert!(AudioClip::from_interleaved(&[0.0, 0.0, 0.0], 2, 8000).is_err());
    }

    #[test]
    fn test_empty_clip() {
        let clip = AudioClip::empty(DEFAULT_SAMPLE_RATE);
        assert!(clip.is_empty());
        assert_eq!(clip.channels(), 1);
        assert_eq!(clip.sample_rate(), DEFAULT_SAMPLE_RATE);
        assert_eq!(clip.duration_secs(), 0.0);
    }

    #[test]
    fn test_levels() {
        let clip = AudioClip::mono(vec![0.5, -0.5, 0.5, -0.5], 8000);
        assert_relative_eq!(calculate_rms(&clip), 0.5, epsilon = 1e-6);
        assert_relative_eq!(calculate_peak(&clip), 0.5);
        assert_relative_eq!(linear_to_db(0.5), -6.0206, epsilon = 1e-3);
        assert_eq!(linear_to_db(0.0), f32::NEG_INFINITY);
    }

    #[test]
    fn test_remap_channels() {
        let stereo =
            AudioClip::from_channels(vec![vec![1.0, 0.0], vec![0.0, 1.0]], 8000).unwrap();
        assert_eq!(stereo.remap_channels(1), vec![vec![0.5, 0.5]]);

        let mono = AudioClip::mono(vec![0.25, 0.75], 8000);
        assert_eq!(
            mono.remap_channels(2),
            vec![vec![0.25, 0.75], vec![0.25, 0.75]]
        );
    }

    #[test]
    fn test_is_identical_to_detects_rate() {
        let a = AudioClip::mono(vec![0.1, 0.2], 8000);
        let b = AudioClip::mono(vec![0.1, 0.2], 16000);
        assert!(!a.is_identical_to(&b));
        assert!(a.is_identical_to(&a.clone()));
    }

    #[test]
    fn test_secs_to_frames() {
        assert_eq!(secs_to_frames(2.0, 24000), 48000);
        assert_eq!(secs_to_frames(0.5, 24000), 12000);
        assert_eq!(secs_to_frames(-1.0, 24000), 0);
    }
}
