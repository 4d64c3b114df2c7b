//! Take render pipeline
//!
//! decode → effect → layer resolution → mix → encode, as one async unit.
//! CPU-bound stages run on the blocking pool; preset resolution suspends on
//! the shared asset store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::task::spawn_blocking;
use tracing::{debug, warn};

use super::take::{TakeConfig, TrackChoice};
use crate::assets::{PresetAssetStore, PresetId};
use crate::config::RenderSettings;
use crate::dsp::apply_effect;
use crate::engine::{calculate_peak, decode, encode, AudioClip};
use crate::error::Result;
use crate::mix::{mix, LayerKind, MixLayer, SkippedLayer};

/// Inputs of one render, detached from the session
#[derive(Debug, Clone)]
pub struct TakeJob {
    /// Compressed voice payload
    pub source: Arc<[u8]>,
    pub config: TakeConfig,
    /// One entry per `config.vocal_drops`; `None` for pending or removed drops
    pub vocal_drops: Vec<Option<Arc<AudioClip>>>,
}

/// Summary of a finished render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderReport {
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: usize,
    pub duration_secs: f64,
    /// Linear sample peak before the encoder clamps
    pub peak: f32,
    /// Optional layers left out, indexed by their position in the configuration
    pub skipped: Vec<SkippedLayer>,
    /// Lowercase hex SHA-256 of the encoded artifact
    pub checksum: String,
}

/// Output of a render
#[derive(Debug, Clone)]
pub struct RenderedTake {
    /// Voice after the effect, before mixing
    pub processed: Arc<AudioClip>,
    /// Final mix
    pub clip: Arc<AudioClip>,
    /// Canonical WAV bytes of the final mix
    pub wav: Arc<[u8]>,
    pub report: RenderReport,
}

/// Render a take end to end
///
/// # Errors
/// * `Decode` - the voice payload is not audio
/// * `EffectRender` / `MixRender` / `Encode` - a mandatory stage failed
///
/// Optional layers that cannot be resolved or decoded are listed in the
/// report instead.
pub async fn render_take(
    job: TakeJob,
    store: &PresetAssetStore,
    settings: &RenderSettings,
) -> Result<RenderedTake> {
    let TakeJob {
        source,
        config,
        vocal_drops,
    } = job;

    let voice = spawn_blocking(move || decode(&source)).await??;
    debug!(
        frames = voice.len(),
        channels = voice.channels(),
        sample_rate = voice.sample_rate(),
        "decoded voice"
    );

    let effect = config.effect;
    let effect_settings = settings.clone();
    let processed =
        spawn_blocking(move || apply_effect(&Arc::new(voice), effect, &effect_settings)).await??;

    let mut skipped = Vec::new();
    let background = resolve_background(&config, store, &mut skipped).await;
    let sfx = resolve_sfx(&config, store, &mut skipped).await;
    let drops = resolve_drops(&config, vocal_drops, &mut skipped);

    let voice_for_mix = Arc::clone(&processed);
    let mut outcome = spawn_blocking(move || {
        let sfx_layers: Vec<MixLayer> = sfx.iter().map(|(_, l)| l.clone()).collect();
        let drop_layers: Vec<MixLayer> = drops.iter().map(|(_, l)| l.clone()).collect();
        mix(
            &voice_for_mix,
            background.as_ref(),
            &sfx_layers,
            &drop_layers,
        )
        .map(|mut outcome| {
            // back to configuration indices
            for entry in &mut outcome.skipped {
                let positions = match entry.kind {
                    LayerKind::Sfx => &sfx,
                    LayerKind::VocalDrop => &drops,
                    LayerKind::Background => continue,
                };
                if let Some((index, _)) = positions.get(entry.index) {
                    entry.index = *index;
                }
            }
            outcome
        })
    })
    .await??;
    skipped.append(&mut outcome.skipped);
    skipped.sort_by_key(|s| (kind_order(s.kind), s.index));

    let clip = Arc::new(outcome.clip);
    let to_encode = Arc::clone(&clip);
    let wav = spawn_blocking(move || encode(&to_encode)).await??;
    let checksum = format!("{:x}", Sha256::digest(&wav));

    let report = RenderReport {
        sample_rate: clip.sample_rate(),
        channels: clip.channels(),
        frames: clip.len(),
        duration_secs: clip.duration_secs(),
        peak: calculate_peak(&clip),
        skipped,
        checksum,
    };
    debug!(
        frames = report.frames,
        skipped = report.skipped.len(),
        checksum = %report.checksum,
        "rendered take"
    );

    Ok(RenderedTake {
        processed,
        clip,
        wav: wav.into(),
        report,
    })
}

async fn resolve_background(
    config: &TakeConfig,
    store: &PresetAssetStore,
    skipped: &mut Vec<SkippedLayer>,
) -> Option<MixLayer> {
    let background = config.background.as_ref()?;
    match &background.track {
        TrackChoice::Preset(id) if id.is_none() => None,
        TrackChoice::Preset(id) => match store.resolve_id(*id).await {
            Ok(clip) => Some(MixLayer::background(clip, background.volume)),
            Err(e) => {
                skip(skipped, LayerKind::Background, 0, e.to_string());
                None
            }
        },
        TrackChoice::Custom(bytes) => {
            Some(MixLayer::background(bytes.clone(), background.volume))
        }
    }
}

async fn resolve_sfx(
    config: &TakeConfig,
    store: &PresetAssetStore,
    skipped: &mut Vec<SkippedLayer>,
) -> Vec<(usize, MixLayer)> {
    let mut layers = Vec::with_capacity(config.sfx.len());
    for (index, sfx) in config.sfx.iter().enumerate() {
        if sfx.preset == PresetId::None {
            continue;
        }
        match store.resolve_id(sfx.preset).await {
            Ok(clip) => layers.push((index, MixLayer::new(clip, sfx.gain, sfx.placement))),
            Err(e) => skip(skipped, LayerKind::Sfx, index, e.to_string()),
        }
    }
    layers
}

fn resolve_drops(
    config: &TakeConfig,
    clips: Vec<Option<Arc<AudioClip>>>,
    skipped: &mut Vec<SkippedLayer>,
) -> Vec<(usize, MixLayer)> {
    let mut clips = clips.into_iter();
    let mut layers = Vec::with_capacity(config.vocal_drops.len());
    for (index, drop) in config.vocal_drops.iter().enumerate() {
        match clips.next().flatten() {
            Some(clip) => layers.push((index, MixLayer::new(clip, drop.gain, drop.placement))),
            None => skip(
                skipped,
                LayerKind::VocalDrop,
                index,
                format!("vocal drop {} is pending or removed", drop.drop_id),
            ),
        }
    }
    layers
}

fn skip(skipped: &mut Vec<SkippedLayer>, kind: LayerKind, index: usize, reason: String) {
    warn!(kind = %kind, index, reason = %reason, "skipping layer");
    skipped.push(SkippedLayer {
        kind,
        index,
        reason,
    });
}

fn kind_order(kind: LayerKind) -> u8 {
    match kind {
        LayerKind::Background => 0,
        LayerKind::Sfx => 1,
        LayerKind::VocalDrop => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::PresetSource;
    use crate::dsp::EffectPreset;
    use crate::engine::generate_test_tone;
    use crate::error::SweeperError;
    use crate::mix::Placement;
    use crate::studio::drops::DropId;
    use crate::studio::take::{BackgroundConfig, DropPlacement, SfxPlacement};

    fn voice_bytes(secs: f32) -> Arc<[u8]> {
        encode(&generate_test_tone(300.0, secs, 8000)).unwrap().into()
    }

    fn job(config: TakeConfig) -> TakeJob {
        TakeJob {
            source: voice_bytes(0.5),
            config,
            vocal_drops: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_dry_render_matches_voice() {
        let store = PresetAssetStore::bundled(8000);
        let rendered = render_take(job(TakeConfig::default()), &store, &RenderSettings::default())
            .await
            .unwrap();
        assert!(rendered.clip.is_identical_to(&rendered.processed));
        assert_eq!(rendered.report.frames, 4000);
        assert_eq!(rendered.report.checksum.len(), 64);
        assert!(rendered.report.skipped.is_empty());
        assert_eq!(rendered.wav.len(), 44 + 4000 * 2);
    }

    #[tokio::test]
    async fn test_bad_voice_aborts() {
        let store = PresetAssetStore::bundled(8000);
        let bad = TakeJob {
            source: Arc::from(&b"not audio at all"[..]),
            config: TakeConfig::default(),
            vocal_drops: Vec::new(),
        };
        assert!(matches!(
            render_take(bad, &store, &RenderSettings::default()).await,
            Err(SweeperError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_skipped_layers_keep_configuration_indices() {
        let store = PresetAssetStore::bundled(8000);
        let config = TakeConfig {
            effect: EffectPreset::Telephone,
            background: Some(BackgroundConfig {
                track: TrackChoice::Custom(b"broken upload".to_vec()),
                volume: 0.4,
            }),
            sfx: vec![
                SfxPlacement {
                    preset: PresetId::None,
                    gain: 1.0,
                    placement: Placement::Start,
                },
                SfxPlacement {
                    preset: PresetId::Whoosh,
                    gain: 0.5,
                    placement: Placement::Middle,
                },
            ],
            vocal_drops: vec![
                DropPlacement {
                    drop_id: DropId::new(),
                    gain: 0.8,
                    placement: Placement::End,
                },
                DropPlacement {
                    drop_id: DropId::new(),
                    gain: 0.8,
                    placement: Placement::Start,
                },
            ],
        };
        let job = TakeJob {
            source: voice_bytes(0.5),
            config,
            vocal_drops: vec![None, Some(Arc::new(AudioClip::mono(vec![0.2; 100], 8000)))],
        };

        let rendered = render_take(job, &store, &RenderSettings::default()).await.unwrap();
        let skipped: Vec<_> = rendered
            .report
            .skipped
            .iter()
            .map(|s| (s.kind, s.index))
            .collect();
        assert_eq!(
            skipped,
            vec![(LayerKind::Background, 0), (LayerKind::VocalDrop, 0)]
        );
        assert_eq!(rendered.report.frames, 4000);
    }

    struct FailingSource;

    impl PresetSource for FailingSource {
        fn load(&self, _id: PresetId) -> Result<Vec<u8>> {
            Err(SweeperError::decode("asset missing"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_unresolvable_sfx_is_skipped() {
        let store = PresetAssetStore::new(Arc::new(FailingSource));
        let config = TakeConfig {
            sfx: vec![SfxPlacement {
                preset: PresetId::AirHorn,
                gain: 1.0,
                placement: Placement::Start,
            }],
            ..TakeConfig::default()
        };
        let rendered = render_take(job(config), &store, &RenderSettings::default())
            .await
            .unwrap();
        assert_eq!(rendered.report.skipped.len(), 1);
        assert_eq!(rendered.report.skipped[0].kind, LayerKind::Sfx);
    }
}
