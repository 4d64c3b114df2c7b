//! Vocal-drop library
//!
//! Short generated voice clips referenced by id from take configurations.
//! An entry is pending until its audio arrives; pending and removed entries
//! resolve to nothing and the layers using them are skipped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::engine::{decode, AudioClip};
use crate::error::{Result, SweeperError};

/// Identifier of a vocal drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DropId(Uuid);

impl DropId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DropId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DropId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One library entry
#[derive(Debug, Clone)]
pub struct VocalDrop {
    pub id: DropId,
    pub script: String,
    /// `None` while generation is pending
    pub clip: Option<Arc<AudioClip>>,
}

impl VocalDrop {
    pub fn is_pending(&self) -> bool {
        self.clip.is_none()
    }
}

#[derive(Debug, Default)]
pub struct VocalDropLibrary {
    entries: HashMap<DropId, VocalDrop>,
}

impl VocalDropLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a drop whose audio is still being generated
    pub fn add_pending(&mut self, script: impl Into<String>) -> DropId {
        let id = DropId::new();
        self.entries.insert(
            id,
            VocalDrop {
                id,
                script: script.into(),
                clip: None,
            },
        );
        id
    }

    /// Decode and attach the generated audio
    ///
    /// # Errors
    /// * `UnknownVocalDrop` - `id` was never added or has been removed
    /// * `Decode` - the bytes are not audio; the entry stays pending
    pub fn fulfill(&mut self, id: DropId, bytes: &[u8]) -> Result<()> {
        if !self.entries.contains_key(&id) {
            return Err(unknown(id));
        }
        let clip = decode(bytes)?;
        self.attach(id, Arc::new(clip))
    }

    /// Attach an already decoded clip
    pub fn attach(&mut self, id: DropId, clip: Arc<AudioClip>) -> Result<()> {
        let entry = self.entries.get_mut(&id).ok_or_else(|| unknown(id))?;
        debug!(drop = %id, frames = clip.len(), "vocal drop ready");
        entry.clip = Some(clip);
        Ok(())
    }

    /// Remove an entry; returns whether it existed
    pub fn remove(&mut self, id: DropId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Clip for `id`, if the entry exists and is fulfilled
    pub fn resolve(&self, id: DropId) -> Option<Arc<AudioClip>> {
        self.entries.get(&id).and_then(|entry| entry.clip.clone())
    }

    pub fn get(&self, id: DropId) -> Option<&VocalDrop> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: DropId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn unknown(id: DropId) -> SweeperError {
    SweeperError::UnknownVocalDrop { id: id.to_string() }
}
