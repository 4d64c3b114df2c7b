//! Multi-layer mixer
//!
//! Sums a voice clip with a background bed, sound effects and vocal drops.
//! The output always has the voice's length, rate and channel layout.
//! Summation is linear with no limiting; the encoder clamps.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::layer::{start_offset, LayerKind, MixLayer, Placement};
use crate::dsp::resample_linear;
use crate::engine::AudioClip;
use crate::error::{Result, SweeperError};

/// An optional layer that was dropped from the mix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedLayer {
    pub kind: LayerKind,
    /// Position within its list (always 0 for the background)
    pub index: usize,
    pub reason: String,
}

/// Mixed clip plus the layers that could not be used
#[derive(Debug, Clone)]
pub struct MixOutcome {
    pub clip: AudioClip,
    pub skipped: Vec<SkippedLayer>,
}

/// Mix `voice` with its optional layers
///
/// Layers that fail to decode or carry non-finite samples are skipped and
/// listed in the outcome; the rest of the mix proceeds. Empty layers
/// contribute nothing.
///
/// # Errors
/// * `MixRender` - the voice itself is not finite
pub fn mix(
    voice: &AudioClip,
    background: Option<&MixLayer>,
    sfx: &[MixLayer],
    vocal_drops: &[MixLayer],
) -> Result<MixOutcome> {
    let mut bus = Bus::new(voice);
    let mut skipped = Vec::new();

    let layers = background
        .map(|layer| (LayerKind::Background, 0, layer))
        .into_iter()
        .chain(sfx.iter().enumerate().map(|(i, l)| (LayerKind::Sfx, i, l)))
        .chain(
            vocal_drops
                .iter()
                .enumerate()
                .map(|(i, l)| (LayerKind::VocalDrop, i, l)),
        );

    for (kind, index, layer) in layers {
        if let Err(e) = bus.add(layer) {
            warn!(kind = %kind, index, error = %e, "skipping layer");
            skipped.push(SkippedLayer {
                kind,
                index,
                reason: e.to_string(),
            });
        }
    }

    let clip = bus.finish()?;
    debug!(
        frames = clip.len(),
        layers = sfx.len() + vocal_drops.len() + usize::from(background.is_some()),
        skipped = skipped.len(),
        "mixed take"
    );
    Ok(MixOutcome { clip, skipped })
}

/// Accumulation buffer shaped like the voice
struct Bus {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl Bus {
    fn new(voice: &AudioClip) -> Self {
        Self {
            channels: voice.channel_data().to_vec(),
            sample_rate: voice.sample_rate(),
        }
    }

    fn len(&self) -> usize {
        self.channels.first().map(|ch| ch.len()).unwrap_or(0)
    }

    fn add(&mut self, layer: &MixLayer) -> Result<()> {
        let clip = layer.source.clip()?;
        if clip.is_empty() || layer.gain == 0.0 {
            return Ok(());
        }

        let source = conform(&clip, self.channels.len(), self.sample_rate);
        let layer_len = source.first().map(|ch| ch.len()).unwrap_or(0);
        if layer_len == 0 {
            return Ok(());
        }
        if source.iter().flatten().any(|s| !s.is_finite()) {
            return Err(SweeperError::MixRender {
                reason: "layer contains NaN or infinite samples".to_string(),
            });
        }

        let out_len = self.len();
        let gain = layer.gain;
        match layer.placement {
            Placement::Loop => {
                for (out, src) in self.channels.iter_mut().zip(&source) {
                    for (i, sample) in out.iter_mut().enumerate() {
                        *sample += gain * src[i % layer_len];
                    }
                }
            }
            placement => {
                let offset = start_offset(placement, out_len, layer_len);
                for (out, src) in self.channels.iter_mut().zip(&source) {
                    for (sample, &s) in out.iter_mut().skip(offset).zip(src) {
                        *sample += gain * s;
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<AudioClip> {
        if self.channels.iter().flatten().any(|s| !s.is_finite()) {
            return Err(SweeperError::MixRender {
                reason: "mix produced NaN or infinite samples".to_string(),
            });
        }
        AudioClip::from_channels(self.channels, self.sample_rate).map_err(|e| {
            SweeperError::MixRender {
                reason: e.to_string(),
            }
        })
    }
}

/// Bring a layer to the bus's channel count and sample rate
fn conform(clip: &AudioClip, channels: usize, sample_rate: u32) -> Vec<Vec<f32>> {
    clip.remap_channels(channels)
        .into_iter()
        .map(|ch| resample_linear(&ch, clip.sample_rate(), sample_rate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::generate_test_tone;
    use approx::assert_relative_eq;

    fn ramp(len: usize, rate: u32) -> AudioClip {
        AudioClip::mono((0..len).map(|i| i as f32 / len as f32).collect(), rate)
    }

    #[test]
    fn test_no_layers_is_passthrough() {
        let voice = generate_test_tone(440.0, 0.5, 8000);
        let outcome = mix(&voice, None, &[], &[]).unwrap();
        assert!(outcome.clip.is_identical_to(&voice));
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_output_matches_voice_shape() {
        let voice = AudioClip::silent(2, 1000, 8000);
        let long_sfx = MixLayer::new(AudioClip::mono(vec![0.5; 5000], 8000), 1.0, Placement::Start);
        let outcome = mix(&voice, None, &[long_sfx], &[]).unwrap();
        assert_eq!(outcome.clip.len(), 1000);
        assert_eq!(outcome.clip.channels(), 2);
        assert_relative_eq!(outcome.clip.channel(1)[999], 0.5);
    }

    #[test]
    fn test_loop_repeats_background() {
        let voice = AudioClip::silent(1, 100, 8000);
        let bed = MixLayer::background(ramp(30, 8000), 0.5);
        let outcome = mix(&voice, Some(&bed), &[], &[]).unwrap();
        let out = outcome.clip.channel(0);
        for i in 30..100 {
            assert_relative_eq!(out[i], out[i - 30]);
        }
        assert_relative_eq!(out[31], 0.5 * (1.0 / 30.0));
    }

    #[test]
    fn test_end_placement() {
        let voice = AudioClip::silent(1, 100, 8000);
        let drop = MixLayer::new(AudioClip::mono(vec![1.0; 10], 8000), 0.8, Placement::End);
        let out = mix(&voice, None, &[], &[drop]).unwrap().clip;
        assert_relative_eq!(out.channel(0)[89], 0.0);
        assert_relative_eq!(out.channel(0)[90], 0.8);
        assert_relative_eq!(out.channel(0)[99], 0.8);
    }

    #[test]
    fn test_middle_placement() {
        let voice = AudioClip::silent(1, 100, 8000);
        let sting = MixLayer::new(AudioClip::mono(vec![1.0; 20], 8000), 1.0, Placement::Middle);
        let out = mix(&voice, None, &[sting], &[]).unwrap().clip;
        assert_relative_eq!(out.channel(0)[39], 0.0);
        assert_relative_eq!(out.channel(0)[40], 1.0);
        assert_relative_eq!(out.channel(0)[59], 1.0);
        assert_relative_eq!(out.channel(0)[60], 0.0);
    }

    #[test]
    fn test_bad_layer_is_skipped() {
        let voice = AudioClip::mono(vec![0.25; 50], 8000);
        let bad = MixLayer::new(b"nope".to_vec(), 1.0, Placement::Start);
        let good = MixLayer::new(AudioClip::mono(vec![0.25; 50], 8000), 1.0, Placement::Start);
        let outcome = mix(&voice, Some(&MixLayer::background(b"??".to_vec(), 0.5)), &[bad, good], &[])
            .unwrap();

        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(outcome.skipped[0].kind, LayerKind::Background);
        assert_eq!(outcome.skipped[1].kind, LayerKind::Sfx);
        assert_eq!(outcome.skipped[1].index, 0);
        assert_relative_eq!(outcome.clip.channel(0)[10], 0.5);
    }

    #[test]
    fn test_no_limiting() {
        let voice = AudioClip::mono(vec![0.9; 10], 8000);
        let sfx = MixLayer::new(AudioClip::mono(vec![0.9; 10], 8000), 1.0, Placement::Start);
        let out = mix(&voice, None, &[sfx], &[]).unwrap().clip;
        assert_relative_eq!(out.channel(0)[0], 1.8);
    }

    #[test]
    fn test_layer_resampled_to_voice_rate() {
        let voice = AudioClip::silent(1, 100, 8000);
        let sfx = MixLayer::new(AudioClip::mono(vec![1.0; 20], 16000), 1.0, Placement::Start);
        let out = mix(&voice, None, &[sfx], &[]).unwrap().clip;
        assert_relative_eq!(out.channel(0)[9], 1.0);
        assert_relative_eq!(out.channel(0)[10], 0.0);
    }

    #[test]
    fn test_nan_layer_is_skipped() {
        let voice = AudioClip::mono(vec![0.1, 0.2, 0.3, 0.4], 8000);
        let mut samples = vec![0.5; 4];
        samples[2] = f32::NAN;
        let sfx = MixLayer::new(AudioClip::mono(samples, 8000), 1.0, Placement::Start);
        let bed = MixLayer::background(AudioClip::mono(vec![f32::INFINITY; 2], 8000), 0.5);

        let outcome = mix(&voice, Some(&bed), &[sfx], &[]).unwrap();
        assert!(outcome.clip.is_identical_to(&voice));
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(outcome.skipped[0].kind, LayerKind::Background);
        assert_eq!(outcome.skipped[1].kind, LayerKind::Sfx);
        assert_eq!(outcome.skipped[1].index, 0);
    }

    #[test]
    fn test_nan_voice_is_mix_error() {
        let voice = AudioClip::mono(vec![0.0, f32::NAN, 0.0, 0.0], 8000);
        let sfx = MixLayer::new(AudioClip::mono(vec![0.5; 4], 8000), 1.0, Placement::Start);
        assert!(matches!(
            mix(&voice, None, &[sfx], &[]),
            Err(SweeperError::MixRender { .. })
        ));
    }
}
