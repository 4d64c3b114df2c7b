//! Preset asset store
//!
//! Lazily decoded preset clips, memoized per id for the store's lifetime.
//! Each id owns a `OnceCell`, so concurrent first requests for the same
//! preset decode it once while other ids proceed independently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::debug;

use super::catalog::PresetId;
use super::source::{BundledPresets, PresetSource};
use crate::engine::{decode, AudioClip};
use crate::error::Result;

type Slot = Arc<OnceCell<Arc<AudioClip>>>;

/// Shared cache of decoded preset clips
///
/// Construct once and share by `Arc`.
pub struct PresetAssetStore {
    source: Arc<dyn PresetSource>,
    slots: Mutex<HashMap<PresetId, Slot>>,
    decodes: AtomicUsize,
}

impl PresetAssetStore {
    pub fn new(source: Arc<dyn PresetSource>) -> Self {
        Self {
            source,
            slots: Mutex::new(HashMap::new()),
            decodes: AtomicUsize::new(0),
        }
    }

    /// Store backed by the synthesized presets at `sample_rate`
    pub fn bundled(sample_rate: u32) -> Self {
        Self::new(Arc::new(BundledPresets::new(sample_rate)))
    }

    /// Resolve a preset by name
    ///
    /// # Errors
    /// * `UnknownPreset` - `name` is not in the catalogue; the cache is not
    ///   touched
    /// * `Decode` - the source bytes are not audio
    pub async fn resolve(&self, name: &str) -> Result<Arc<AudioClip>> {
        let id: PresetId = name.parse()?;
        self.resolve_id(id).await
    }

    /// Resolve a known preset id, decoding on first use
    ///
    /// A failed load leaves the slot empty so a later call retries.
    pub async fn resolve_id(&self, id: PresetId) -> Result<Arc<AudioClip>> {
        let slot = self.slot(id);
        let clip = slot
            .get_or_try_init(|| async {
                let source = Arc::clone(&self.source);
                let clip = tokio::task::spawn_blocking(move || -> Result<AudioClip> {
                    let bytes = source.load(id)?;
                    decode(&bytes)
                })
                .await??;
                self.decodes.fetch_add(1, Ordering::Relaxed);
                debug!(
                    preset = %id,
                    source = self.source.name(),
                    frames = clip.len(),
                    "decoded preset"
                );
                Ok::<_, crate::error::SweeperError>(Arc::new(clip))
            })
            .await?;
        Ok(Arc::clone(clip))
    }

    /// True once `id` has a decoded clip
    pub fn is_cached(&self, id: PresetId) -> bool {
        self.lock_slots()
            .get(&id)
            .map(|slot| slot.initialized())
            .unwrap_or(false)
    }

    /// Number of decoded presets held
    pub fn cached_count(&self) -> usize {
        self.lock_slots()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Total decodes performed since construction
    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::Relaxed)
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    fn slot(&self, id: PresetId) -> Slot {
        Arc::clone(self.lock_slots().entry(id).or_default())
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<PresetId, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for PresetAssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresetAssetStore")
            .field("source", &self.source.name())
            .field("cached", &self.cached_count())
            .finish()
    }
}
