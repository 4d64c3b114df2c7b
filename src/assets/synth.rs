//! Procedural preset audio
//!
//! Short beds and stings synthesized from oscillators, envelopes and seeded
//! noise. Output is deterministic for a given sample rate.

use std::f32::consts::PI;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::catalog::PresetId;
use crate::engine::AudioClip;

/// Peak level every preset is normalized to
const PRESET_PEAK: f32 = 0.8;

const NOISE_SEED: u64 = 0x0dd_ba11;

/// Render a preset clip. `None` renders an empty clip.
pub fn render_preset(id: PresetId, sample_rate: u32) -> AudioClip {
    let sr = sample_rate.max(1) as f32;
    let samples = match id {
        PresetId::None => Vec::new(),
        PresetId::EnergeticBeat => energetic_beat(sr),
        PresetId::ChillLofi => chill_lofi(sr),
        PresetId::NewsroomPulse => newsroom_pulse(sr),
        PresetId::LaserZap => laser_zap(sr),
        PresetId::AirHorn => air_horn(sr),
        PresetId::Whoosh => whoosh(sr),
        PresetId::Impact => impact(sr),
    };
    AudioClip::mono(normalize(samples), sample_rate)
}

// ============================================================================
// Tracks
// ============================================================================

/// 120 BPM, two beats: kicks on the beat, hats on the eighths
fn energetic_beat(sr: f32) -> Vec<f32> {
    let mut out = silence(1.0, sr);
    let mut rng = Pcg32::seed_from_u64(NOISE_SEED);
    for beat in 0..2 {
        mix_at(&mut out, beat as f32 * 0.5, sr, &kick(sr, 0.18, 1.0));
    }
    for eighth in 0..4 {
        let hat = noise_burst(sr, 0.04, 0.35, &mut rng);
        mix_at(&mut out, eighth as f32 * 0.25 + 0.125, sr, &hat);
    }
    // bass pulse under each beat
    for beat in 0..2 {
        let bass = tone(55.0, 0.3, sr, |t| envelope(t, 0.005, 0.3) * 0.4);
        mix_at(&mut out, beat as f32 * 0.5, sr, &bass);
    }
    out
}

/// Slow minor chord with tremolo over soft kicks
fn chill_lofi(sr: f32) -> Vec<f32> {
    let mut out = silence(2.0, sr);
    for freq in [220.0, 261.63, 329.63] {
        let chord = tone(freq, 2.0, sr, |t| 0.25 * (0.8 + 0.2 * (2.0 * PI * 4.0 * t).sin()));
        mix_at(&mut out, 0.0, sr, &chord);
    }
    for beat in 0..2 {
        mix_at(&mut out, beat as f32, sr, &kick(sr, 0.25, 0.6));
    }
    out
}

/// Ticking blips over a low drone
fn newsroom_pulse(sr: f32) -> Vec<f32> {
    let mut out = tone(110.0, 1.5, sr, |_| 0.2);
    for tick in 0..6 {
        let level = if tick % 2 == 0 { 0.6 } else { 0.35 };
        let blip = tone(1000.0, 0.05, sr, |t| envelope(t, 0.002, 0.05) * level);
        mix_at(&mut out, tick as f32 * 0.25, sr, &blip);
    }
    out
}

// ============================================================================
// Sound effects
// ============================================================================

/// Exponential pitch dive from 2 kHz to 200 Hz
fn laser_zap(sr: f32) -> Vec<f32> {
    let duration = 0.35;
    sweep(sr, duration, |t| 2000.0 * (0.1_f32).powf(t / duration))
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.signum() * 0.6 * envelope(i as f32 / sr, 0.003, duration))
        .collect()
}

/// Two detuned saw voices with a hard attack
fn air_horn(sr: f32) -> Vec<f32> {
    let duration = 0.8;
    let len = (duration * sr) as usize;
    (0..len)
        .map(|i| {
            let t = i as f32 / sr;
            let env = envelope(t, 0.02, duration);
            [466.16_f32, 587.33, 470.0]
                .iter()
                .map(|f| saw(f * t))
                .sum::<f32>()
                * env
                / 3.0
        })
        .collect()
}

/// Filtered noise swelling up and back down
fn whoosh(sr: f32) -> Vec<f32> {
    let duration = 0.6;
    let len = (duration * sr) as usize;
    let mut rng = Pcg32::seed_from_u64(NOISE_SEED ^ 0x77);
    let mut state = 0.0_f32;
    (0..len)
        .map(|i| {
            let t = i as f32 / duration / sr;
            let swell = (PI * t).sin().powi(2);
            let cutoff = 300.0 + 4000.0 * swell;
            let coeff = 1.0 - (-2.0 * PI * cutoff / sr).exp();
            let noise: f32 = rng.gen_range(-1.0..1.0);
            state += coeff * (noise - state);
            state * swell
        })
        .collect()
}

/// Low thump plus a noise crack
fn impact(sr: f32) -> Vec<f32> {
    let mut rng = Pcg32::seed_from_u64(NOISE_SEED ^ 0x1a);
    let mut out = kick(sr, 0.5, 1.0);
    let crack = noise_burst(sr, 0.08, 0.5, &mut rng);
    mix_at(&mut out, 0.0, sr, &crack);
    out
}

// ============================================================================
// Building blocks
// ============================================================================

fn silence(duration: f32, sr: f32) -> Vec<f32> {
    vec![0.0; (duration * sr).round() as usize]
}

/// Linear attack, exponential-ish release reaching zero at `duration`
fn envelope(t: f32, attack: f32, duration: f32) -> f32 {
    if t < attack {
        t / attack
    } else if t >= duration {
        0.0
    } else {
        (1.0 - (t - attack) / (duration - attack).max(f32::EPSILON)).powi(2)
    }
}

fn tone<F: Fn(f32) -> f32>(freq: f32, duration: f32, sr: f32, level: F) -> Vec<f32> {
    let len = (duration * sr).round() as usize;
    (0..len)
        .map(|i| {
            let t = i as f32 / sr;
            (2.0 * PI * freq * t).sin() * level(t)
        })
        .collect()
}

/// Sine with time-varying frequency, phase accumulated per sample
fn sweep<F: Fn(f32) -> f32>(sr: f32, duration: f32, freq_at: F) -> Vec<f32> {
    let len = (duration * sr).round() as usize;
    let mut phase = 0.0_f32;
    (0..len)
        .map(|i| {
            let s = phase.sin();
            phase = (phase + 2.0 * PI * freq_at(i as f32 / sr) / sr) % (2.0 * PI);
            s
        })
        .collect()
}

fn kick(sr: f32, duration: f32, level: f32) -> Vec<f32> {
    sweep(sr, duration, |t| 45.0 + 75.0 * (-t * 30.0).exp())
        .into_iter()
        .enumerate()
        .map(|(i, s)| s * level * envelope(i as f32 / sr, 0.002, duration))
        .collect()
}

fn noise_burst(sr: f32, duration: f32, level: f32, rng: &mut Pcg32) -> Vec<f32> {
    let len = (duration * sr).round() as usize;
    (0..len)
        .map(|i| {
            let noise: f32 = rng.gen_range(-1.0..1.0);
            noise * level * envelope(i as f32 / sr, 0.001, duration)
        })
        .collect()
}

fn saw(phase_cycles: f32) -> f32 {
    2.0 * (phase_cycles - phase_cycles.floor()) - 1.0
}

/// Add `src` into `dst` starting at `start_secs`, cutting at the end of `dst`
fn mix_at(dst: &mut [f32], start_secs: f32, sr: f32, src: &[f32]) {
    let offset = (start_secs * sr).round() as usize;
    for (d, s) in dst.iter_mut().skip(offset).zip(src) {
        *d += s;
    }
}

fn normalize(mut samples: Vec<f32>) -> Vec<f32> {
    let peak = samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
    if peak > 0.0 {
        let scale = PRESET_PEAK / peak;
        samples.iter_mut().for_each(|s| *s *= scale);
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::calculate_peak;
    use approx::assert_relative_eq;

    #[test]
    fn test_every_preset_renders() {
        for id in PresetId::ALL {
            let clip = render_preset(id, 24000);
            assert_eq!(clip.sample_rate(), 24000);
            if id.is_none() {
                assert!(clip.is_empty());
            } else {
                assert!(!clip.is_empty(), "{} rendered empty", id);
                assert_relative_eq!(calculate_peak(&clip), PRESET_PEAK, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_beat_is_shorter_than_a_sweeper() {
        let beat = render_preset(PresetId::EnergeticBeat, 24000);
        assert_eq!(beat.len(), 24000);
    }

    #[test]
    fn test_deterministic() {
        let a = render_preset(PresetId::Whoosh, 16000);
        let b = render_preset(PresetId::Whoosh, 16000);
        assert!(a.is_identical_to(&b));
    }
}
