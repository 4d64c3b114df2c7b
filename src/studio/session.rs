//! Studio session
//!
//! Owns the takes of one session, the vocal-drop library and a handle on the
//! shared asset store. Every configuration change bumps the take's
//! generation; a render commits only if its generation is still current.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use super::drops::{DropId, VocalDropLibrary};
use super::naming::artifact_file_name;
use super::pipeline::{render_take, RenderedTake, TakeJob};
use super::take::{Take, TakeConfig, TakeId};
use crate::assets::PresetAssetStore;
use crate::config::RenderSettings;
use crate::engine::decode;
use crate::error::{Result, SweeperError};

/// Final artifact of a take
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub wav: Arc<[u8]>,
}

/// Snapshot taken when a render starts
#[derive(Debug, Clone)]
pub struct RenderTicket {
    pub take_id: TakeId,
    pub generation: u64,
    job: TakeJob,
}

#[derive(Debug)]
struct TakeTable {
    takes: HashMap<TakeId, Take>,
    next_index: usize,
}

/// One user session of sweeper takes
pub struct Studio {
    store: Arc<PresetAssetStore>,
    settings: RenderSettings,
    takes: Mutex<TakeTable>,
    drops: Mutex<VocalDropLibrary>,
}

impl Studio {
    pub fn new(store: Arc<PresetAssetStore>, settings: RenderSettings) -> Self {
        Self {
            store,
            settings,
            takes: Mutex::new(TakeTable {
                takes: HashMap::new(),
                next_index: 1,
            }),
            drops: Mutex::new(VocalDropLibrary::new()),
        }
    }

    pub fn store(&self) -> &Arc<PresetAssetStore> {
        &self.store
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    // ========================================================================
    // Takes
    // ========================================================================

    /// Register a generated voice payload as a new take (generation 1)
    pub fn add_take(&self, script: impl Into<String>, source: Vec<u8>) -> TakeId {
        let mut table = self.lock_takes();
        let id = TakeId::new();
        let index = table.next_index;
        table.next_index += 1;
        table.takes.insert(
            id,
            Take {
                id,
                index,
                script: script.into(),
                source: source.into(),
                config: TakeConfig::default(),
                generation: 1,
                output: None,
            },
        );
        debug!(take = %id, index, "added take");
        id
    }

    /// Replace a take's configuration; returns the new generation
    ///
    /// # Errors
    /// * `InvalidConfig` - the configuration does not validate; nothing changes
    /// * `TakeNotFound`
    pub fn configure(&self, take_id: TakeId, config: TakeConfig) -> Result<u64> {
        config.validate()?;
        let mut table = self.lock_takes();
        let take = table
            .takes
            .get_mut(&take_id)
            .ok_or_else(|| not_found(take_id))?;
        take.config = config;
        take.generation += 1;
        debug!(take = %take_id, generation = take.generation, "configured take");
        Ok(take.generation)
    }

    /// Render the take's current configuration and commit the result
    ///
    /// # Errors
    /// * `Superseded` - the take was reconfigured while rendering
    /// * `TakeNotFound` - the take was discarded
    /// * any mandatory-stage render error
    pub async fn render(&self, take_id: TakeId) -> Result<Arc<RenderedTake>> {
        let ticket = self.prepare_render(take_id)?;
        self.finish_render(ticket).await
    }

    /// Capture everything a render needs at the current generation
    pub fn prepare_render(&self, take_id: TakeId) -> Result<RenderTicket> {
        let (generation, source, config) = {
            let table = self.lock_takes();
            let take = table.takes.get(&take_id).ok_or_else(|| not_found(take_id))?;
            (take.generation, Arc::clone(&take.source), take.config.clone())
        };
        let vocal_drops = {
            let library = self.lock_drops();
            config
                .vocal_drops
                .iter()
                .map(|d| library.resolve(d.drop_id))
                .collect()
        };
        Ok(RenderTicket {
            take_id,
            generation,
            job: TakeJob {
                source,
                config,
                vocal_drops,
            },
        })
    }

    /// Run a prepared render and commit it if its generation is still current
    pub async fn finish_render(&self, ticket: RenderTicket) -> Result<Arc<RenderedTake>> {
        let RenderTicket {
            take_id,
            generation,
            job,
        } = ticket;
        let rendered = Arc::new(render_take(job, &self.store, &self.settings).await?);

        let mut table = self.lock_takes();
        let take = table
            .takes
            .get_mut(&take_id)
            .ok_or_else(|| not_found(take_id))?;
        if take.generation != generation {
            warn!(
                take = %take_id,
                rendered = generation,
                latest = take.generation,
                "discarding stale render"
            );
            return Err(SweeperError::Superseded {
                id: take_id.to_string(),
                latest: take.generation,
            });
        }
        take.output = Some(Arc::clone(&rendered));
        info!(
            take = %take_id,
            generation,
            frames = rendered.report.frames,
            skipped = rendered.report.skipped.len(),
            "committed render"
        );
        Ok(rendered)
    }

    /// Snapshot of a take
    pub fn take(&self, take_id: TakeId) -> Result<Take> {
        self.lock_takes()
            .takes
            .get(&take_id)
            .cloned()
            .ok_or_else(|| not_found(take_id))
    }

    /// Ids of all takes in creation order
    pub fn take_ids(&self) -> Vec<TakeId> {
        let table = self.lock_takes();
        let mut takes: Vec<_> = table.takes.values().map(|t| (t.index, t.id)).collect();
        takes.sort_unstable_by_key(|(index, _)| *index);
        takes.into_iter().map(|(_, id)| id).collect()
    }

    /// Final artifact of the latest committed render, if any
    pub fn artifact(&self, take_id: TakeId) -> Result<Option<Artifact>> {
        let take = self.take(take_id)?;
        Ok(take.output.map(|output| Artifact {
            file_name: artifact_file_name(&take.script, take.index),
            wav: Arc::clone(&output.wav),
        }))
    }

    /// Drop every take and vocal drop; the asset cache is kept
    pub fn discard_all(&self) {
        let mut table = self.lock_takes();
        let discarded = table.takes.len();
        table.takes.clear();
        table.next_index = 1;
        self.lock_drops().clear();
        info!(discarded, "discarded session");
    }

    // ========================================================================
    // Vocal drops
    // ========================================================================

    pub fn add_vocal_drop(&self, script: impl Into<String>) -> DropId {
        self.lock_drops().add_pending(script)
    }

    /// Decode generated drop audio on the blocking pool and attach it
    ///
    /// # Errors
    /// * `UnknownVocalDrop` - the drop does not exist (or was removed meanwhile)
    /// * `Decode`
    pub async fn fulfill_vocal_drop(&self, id: DropId, bytes: Vec<u8>) -> Result<()> {
        if !self.lock_drops().contains(id) {
            return Err(SweeperError::UnknownVocalDrop { id: id.to_string() });
        }
        let clip = tokio::task::spawn_blocking(move || decode(&bytes)).await??;
        self.lock_drops().attach(id, Arc::new(clip))
    }

    pub fn remove_vocal_drop(&self, id: DropId) -> bool {
        self.lock_drops().remove(id)
    }

    /// True once the drop has audio
    pub fn vocal_drop_ready(&self, id: DropId) -> bool {
        self.lock_drops().resolve(id).is_some()
    }

    fn lock_takes(&self) -> MutexGuard<'_, TakeTable> {
        self.takes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_drops(&self) -> MutexGuard<'_, VocalDropLibrary> {
        self.drops.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn not_found(id: TakeId) -> SweeperError {
    SweeperError::TakeNotFound { id: id.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::EffectPreset;
    use crate::engine::{encode, generate_test_tone};
    use crate::studio::take::{BackgroundConfig, TrackChoice};

    fn studio() -> Studio {
        Studio::new(
            Arc::new(PresetAssetStore::bundled(8000)),
            RenderSettings::default(),
        )
    }

    fn voice() -> Vec<u8> {
        encode(&generate_test_tone(220.0, 0.25, 8000)).unwrap()
    }

    #[tokio::test]
    async fn test_render_commits_output() {
        let studio = studio();
        let id = studio.add_take("Hello world", voice());
        assert!(studio.artifact(id).unwrap().is_none());

        studio.render(id).await.unwrap();
        let artifact = studio.artifact(id).unwrap().unwrap();
        assert_eq!(artifact.file_name, "hello_world_take1.wav");
        assert_eq!(&artifact.wav[..4], b"RIFF");
    }

    #[tokio::test]
    async fn test_stale_render_is_superseded() {
        let studio = studio();
        let id = studio.add_take("stale", voice());
        let ticket = studio.prepare_render(id).unwrap();
        let generation = studio
            .configure(id, TakeConfig::with_effect(EffectPreset::Telephone))
            .unwrap();
        assert_eq!(generation, 2);

        let err = studio.finish_render(ticket).await.unwrap_err();
        assert!(matches!(err, SweeperError::Superseded { latest: 2, .. }));
        assert!(studio.take(id).unwrap().output.is_none());

        studio.render(id).await.unwrap();
        assert!(studio.take(id).unwrap().output.is_some());
    }

    #[tokio::test]
    async fn test_invalid_config_keeps_generation() {
        let studio = studio();
        let id = studio.add_take("x", voice());
        let mut config = TakeConfig::default();
        config.background = Some(BackgroundConfig {
            track: TrackChoice::Custom(Vec::new()),
            volume: 2.0,
        });
        assert!(studio.configure(id, config).is_err());
        assert_eq!(studio.take(id).unwrap().generation, 1);
    }

    #[tokio::test]
    async fn test_discard_all() {
        let studio = studio();
        let first = studio.add_take("one", voice());
        studio.add_vocal_drop("drop");
        studio.discard_all();
        assert!(matches!(
            studio.take(first),
            Err(SweeperError::TakeNotFound { .. })
        ));
        let again = studio.add_take("two", voice());
        assert_eq!(studio.take(again).unwrap().index, 1);
    }

    #[tokio::test]
    async fn test_fulfill_unknown_drop() {
        let studio = studio();
        let id = studio.add_vocal_drop("drop");
        studio.remove_vocal_drop(id);
        assert!(matches!(
            studio.fulfill_vocal_drop(id, voice()).await,
            Err(SweeperError::UnknownVocalDrop { .. })
        ));
    }
}
