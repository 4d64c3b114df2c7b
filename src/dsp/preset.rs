//! Effect presets
//!
//! Each preset is a fixed, hand-built signal graph over one clip. Dispatch is
//! a plain `match`; the graphs are assembled from the primitives in the
//! sibling modules.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::convolution::{convolve_reverb, ImpulseResponse};
use super::delay::FeedbackDelay;
use super::filter::{biquad_cascade, BiquadCoeffs, FilterType, BUTTERWORTH_Q};
use super::modulation::ring_modulate;
use super::resample::playback_rate;
use crate::config::RenderSettings;
use crate::engine::{secs_to_frames, AudioClip};
use crate::error::{Result, SweeperError};
use crate::ident::normalize_key;

// ============================================================================
// Preset constants
// ============================================================================

const RADIO_BOOTH_SECS: f32 = 0.4;
const RADIO_BOOTH_DECAY: f32 = 1.5;

const CONCERT_HALL_SECS: f32 = 2.0;
const CONCERT_HALL_DECAY: f32 = 2.0;

const COSMIC_DELAY_SECS: f64 = 0.5;
const COSMIC_DELAY_FEEDBACK: f32 = 0.4;

const TELEPHONE_LOW_CUT_HZ: f64 = 300.0;
const TELEPHONE_HIGH_CUT_HZ: f64 = 3500.0;

const ROBOT_CARRIER_HZ: f64 = 50.0;

/// Replay rate of [`EffectPreset::PitchShiftUp`]
pub const PITCH_UP_RATE: f64 = 1.25;
/// Replay rate of [`EffectPreset::PitchShiftDown`]
pub const PITCH_DOWN_RATE: f64 = 0.8;

// ============================================================================
// Effect Preset
// ============================================================================

/// The closed set of voice effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EffectPreset {
    /// Dry voice, returned untouched
    #[default]
    None,
    /// Short, tight room
    RadioBooth,
    /// Long diffuse hall
    ConcertHall,
    /// Half-second echo with feedback
    CosmicDelay,
    /// Narrow-band phone line
    Telephone,
    /// 50 Hz ring modulation
    RobotVoice,
    /// Faster and higher
    PitchShiftUp,
    /// Slower and lower
    PitchShiftDown,
}

impl EffectPreset {
    /// Every preset, in display order
    pub const ALL: [EffectPreset; 8] = [
        EffectPreset::None,
        EffectPreset::RadioBooth,
        EffectPreset::ConcertHall,
        EffectPreset::CosmicDelay,
        EffectPreset::Telephone,
        EffectPreset::RobotVoice,
        EffectPreset::PitchShiftUp,
        EffectPreset::PitchShiftDown,
    ];

    /// Stable identifier
    pub fn id(&self) -> &'static str {
        match self {
            EffectPreset::None => "None",
            EffectPreset::RadioBooth => "RadioBooth",
            EffectPreset::ConcertHall => "ConcertHall",
            EffectPreset::CosmicDelay => "CosmicDelay",
            EffectPreset::Telephone => "Telephone",
            EffectPreset::RobotVoice => "RobotVoice",
            EffectPreset::PitchShiftUp => "PitchShiftUp",
            EffectPreset::PitchShiftDown => "PitchShiftDown",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            EffectPreset::None => "No Effect",
            EffectPreset::RadioBooth => "Radio Booth",
            EffectPreset::ConcertHall => "Concert Hall",
            EffectPreset::CosmicDelay => "Cosmic Delay",
            EffectPreset::Telephone => "Telephone",
            EffectPreset::RobotVoice => "Robot Voice",
            EffectPreset::PitchShiftUp => "Pitch Shift Up",
            EffectPreset::PitchShiftDown => "Pitch Shift Down",
        }
    }

    /// Replay rate for the pitch-shift presets
    pub fn playback_rate(&self) -> Option<f64> {
        match self {
            EffectPreset::PitchShiftUp => Some(PITCH_UP_RATE),
            EffectPreset::PitchShiftDown => Some(PITCH_DOWN_RATE),
            _ => None,
        }
    }
}

impl fmt::Display for EffectPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for EffectPreset {
    type Err = SweeperError;

    fn from_str(s: &str) -> Result<Self> {
        let key = normalize_key(s);
        EffectPreset::ALL
            .into_iter()
            .find(|p| normalize_key(p.id()) == key)
            .ok_or_else(|| SweeperError::UnknownPreset { id: s.to_string() })
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Apply `preset` to `clip`
///
/// `None` hands back the same allocation. Every other preset keeps the
/// sample rate and channel count. Reverbs and the delay append their tail;
/// pitch shifts change length to `ceil(len / rate)`.
///
/// # Errors
/// * `EffectRender` - the graph produced non-finite samples
pub fn apply_effect(
    clip: &Arc<AudioClip>,
    preset: EffectPreset,
    settings: &RenderSettings,
) -> Result<Arc<AudioClip>> {
    let sample_rate = clip.sample_rate();
    let rendered = match preset {
        EffectPreset::None => return Ok(Arc::clone(clip)),
        EffectPreset::RadioBooth => reverb(clip, settings, RADIO_BOOTH_SECS, RADIO_BOOTH_DECAY),
        EffectPreset::ConcertHall => {
            reverb(clip, settings, CONCERT_HALL_SECS, CONCERT_HALL_DECAY)
        }
        EffectPreset::CosmicDelay => {
            let delay_samples = secs_to_frames(COSMIC_DELAY_SECS, sample_rate).max(1);
            let tail = delay_samples * settings.delay_tail_repeats as usize;
            map_channels(clip, |samples| {
                FeedbackDelay::new(delay_samples, COSMIC_DELAY_FEEDBACK).render(samples, tail)
            })
        }
        EffectPreset::Telephone => {
            let sections = [
                BiquadCoeffs::calculate(
                    FilterType::HighPass,
                    sample_rate as f64,
                    TELEPHONE_LOW_CUT_HZ,
                    BUTTERWORTH_Q,
                ),
                BiquadCoeffs::calculate(
                    FilterType::LowPass,
                    sample_rate as f64,
                    TELEPHONE_HIGH_CUT_HZ,
                    BUTTERWORTH_Q,
                ),
            ];
            map_channels(clip, |samples| biquad_cascade(samples, &sections))
        }
        EffectPreset::RobotVoice => map_channels(clip, |samples| {
            ring_modulate(samples, sample_rate, ROBOT_CARRIER_HZ)
        }),
        EffectPreset::PitchShiftUp | EffectPreset::PitchShiftDown => {
            let rate = preset.playback_rate().unwrap_or(1.0);
            map_channels(clip, |samples| playback_rate(samples, rate))
        }
    };

    let rendered = rendered.map_err(|e| SweeperError::EffectRender {
        effect: preset.id().to_string(),
        reason: e.to_string(),
    })?;

    if !rendered.is_finite() {
        return Err(SweeperError::EffectRender {
            effect: preset.id().to_string(),
            reason: "graph produced NaN or infinite samples".to_string(),
        });
    }

    debug!(
        effect = preset.id(),
        input_frames = clip.len(),
        output_frames = rendered.len(),
        "applied effect"
    );
    Ok(Arc::new(rendered))
}

fn reverb(
    clip: &AudioClip,
    settings: &RenderSettings,
    duration_secs: f32,
    decay: f32,
) -> Result<AudioClip> {
    let mut rng = Pcg32::seed_from_u64(settings.impulse_seed);
    let impulse = ImpulseResponse::synthesize(clip.sample_rate(), duration_secs, decay, &mut rng);
    Ok(convolve_reverb(clip, &impulse))
}

fn map_channels<F>(clip: &AudioClip, mut f: F) -> Result<AudioClip>
where
    F: FnMut(&[f32]) -> Vec<f32>,
{
    let channels = clip.channel_data().iter().map(|ch| f(ch)).collect();
    AudioClip::from_channels(channels, clip.sample_rate())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{calculate_rms, generate_stereo_test_tone, generate_test_tone};
    use approx::assert_relative_eq;
    use test_case::test_case;

    fn tone() -> Arc<AudioClip> {
        Arc::new(generate_test_tone(440.0, 0.25, 8000))
    }

    #[test]
    fn test_none_is_same_allocation() {
        let clip = tone();
        let out = apply_effect(&clip, EffectPreset::None, &RenderSettings::default()).unwrap();
        assert!(Arc::ptr_eq(&clip, &out));
    }

    #[test_case(EffectPreset::RadioBooth)]
    #[test_case(EffectPreset::ConcertHall)]
    #[test_case(EffectPreset::CosmicDelay)]
    #[test_case(EffectPreset::Telephone)]
    #[test_case(EffectPreset::RobotVoice)]
    #[test_case(EffectPreset::PitchShiftUp)]
    #[test_case(EffectPreset::PitchShiftDown)]
    fn test_preserves_rate_and_channels(preset: EffectPreset) {
        let clip = Arc::new(generate_stereo_test_tone(330.0, 550.0, 0.2, 8000));
        let out = apply_effect(&clip, preset, &RenderSettings::default()).unwrap();
        assert_eq!(out.sample_rate(), 8000);
        assert_eq!(out.channels(), 2);
        assert!(calculate_rms(&out) > 0.0);
    }

    #[test]
    fn test_delay_tail_length() {
        let clip = tone();
        let settings = RenderSettings::default();
        let out = apply_effect(&clip, EffectPreset::CosmicDelay, &settings).unwrap();
        let delay = secs_to_frames(COSMIC_DELAY_SECS, 8000);
        assert_eq!(
            out.len(),
            clip.len() + delay * settings.delay_tail_repeats as usize
        );
    }

    #[test]
    fn test_cosmic_delay_echo_timing() {
        let mut impulse = vec![0.0; 100];
        impulse[0] = 1.0;
        let clip = Arc::new(AudioClip::mono(impulse, 8000));
        let out = apply_effect(&clip, EffectPreset::CosmicDelay, &RenderSettings::default())
            .unwrap();
        let samples = out.channel(0);

        assert_relative_eq!(samples[0], 1.0);
        assert_relative_eq!(samples[3999], 0.0);
        assert_relative_eq!(samples[4000], 1.0);
        assert_relative_eq!(samples[4001], 0.0);
        assert_relative_eq!(samples[8000], 0.4, epsilon = 1e-6);
        assert_relative_eq!(samples[12000], 0.16, epsilon = 1e-6);
    }

    /// Steady-state gain of the telephone band at `freq`, measured at 24 kHz
    fn telephone_gain(freq: f32) -> f32 {
        let clip = Arc::new(generate_test_tone(freq, 0.5, 24000));
        let out = apply_effect(&clip, EffectPreset::Telephone, &RenderSettings::default())
            .unwrap();
        assert_eq!(out.len(), clip.len());

        let rms = |s: &[f32]| (s.iter().map(|v| v * v).sum::<f32>() / s.len() as f32).sqrt();
        let settled = clip.len() / 2;
        rms(&out.channel(0)[settled..]) / rms(&clip.channel(0)[settled..])
    }

    #[test]
    fn test_telephone_band() {
        assert!(telephone_gain(1000.0) > 0.9);
        assert!(telephone_gain(80.0) < 0.1);
        assert!(telephone_gain(9000.0) < 0.1);
    }

    #[test]
    fn test_reverb_is_deterministic() {
        let clip = tone();
        let settings = RenderSettings::default();
        let a = apply_effect(&clip, EffectPreset::RadioBooth, &settings).unwrap();
        let b = apply_effect(&clip, EffectPreset::RadioBooth, &settings).unwrap();
        assert!(a.is_identical_to(&b));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("RadioBooth".parse::<EffectPreset>().unwrap(), EffectPreset::RadioBooth);
        assert_eq!("pitch-shift-up".parse::<EffectPreset>().unwrap(), EffectPreset::PitchShiftUp);
        assert_eq!("none".parse::<EffectPreset>().unwrap(), EffectPreset::None);
        assert!(matches!(
            "Flanger".parse::<EffectPreset>(),
            Err(SweeperError::UnknownPreset { .. })
        ));
    }

    #[test]
    fn test_serde_uses_ids() {
        let json = serde_json::to_string(&EffectPreset::CosmicDelay).unwrap();
        assert_eq!(json, "\"CosmicDelay\"");
    }
}
