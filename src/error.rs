//! Error handling for Sweeper
//!
//! Mandatory-path failures (voice decode, effect render, mix render, encode)
//! abort a take. Optional-layer failures are reported through
//! [`crate::mix::SkippedLayer`] instead of this type.

use thiserror::Error;

/// Result type alias for Sweeper operations
pub type Result<T> = std::result::Result<T, SweeperError>;

/// Main error type for Sweeper operations
#[derive(Error, Debug)]
pub enum SweeperError {
    // Codec Errors
    #[error("Could not decode audio: {reason}")]
    Decode {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Could not encode audio: {reason}")]
    Encode { reason: String },

    // Asset Errors
    #[error("Unknown preset: {id}")]
    UnknownPreset { id: String },

    #[error("Unknown vocal drop: {id}")]
    UnknownVocalDrop { id: String },

    // Render Errors
    #[error("Effect '{effect}' failed to render: {reason}")]
    EffectRender { effect: String, reason: String },

    #[error("Mix failed to render: {reason}")]
    MixRender { reason: String },

    // Session Errors
    #[error("Take not found: {id}")]
    TakeNotFound { id: String },

    #[error("Render of take {id} was superseded by generation {latest}")]
    Superseded { id: String, latest: u64 },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SweeperError {
    /// Shorthand for a decode failure without an underlying cause
    pub fn decode(reason: impl Into<String>) -> Self {
        SweeperError::Decode {
            reason: reason.into(),
            source: None,
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SweeperError::Decode { .. } => "DECODE_ERROR",
            SweeperError::Encode { .. } => "ENCODE_ERROR",
            SweeperError::UnknownPreset { .. } => "UNKNOWN_PRESET",
            SweeperError::UnknownVocalDrop { .. } => "UNKNOWN_VOCAL_DROP",
            SweeperError::EffectRender { .. } => "EFFECT_RENDER_ERROR",
            SweeperError::MixRender { .. } => "MIX_RENDER_ERROR",
            SweeperError::TakeNotFound { .. } => "TAKE_NOT_FOUND",
            SweeperError::Superseded { .. } => "SUPERSEDED",
            SweeperError::InvalidConfig { .. } => "INVALID_CONFIG",
            SweeperError::Join(_) => "TASK_ERROR",
            SweeperError::Io(_) => "IO_ERROR",
            SweeperError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the user can fix this error by changing input and re-triggering
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SweeperError::Decode { .. }
                | SweeperError::UnknownPreset { .. }
                | SweeperError::UnknownVocalDrop { .. }
                | SweeperError::EffectRender { .. }
                | SweeperError::Superseded { .. }
                | SweeperError::InvalidConfig { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            SweeperError::Decode { .. } => vec![
                "Regenerate the voice take",
                "Upload the file as WAV, MP3, OGG or FLAC",
                "The file may be truncated - try downloading it again",
            ],
            SweeperError::UnknownPreset { .. } => vec![
                "Run 'sweeper-cli presets' to list available presets",
                "Preset names are case-insensitive, e.g. 'EnergeticBeat' or 'energetic-beat'",
            ],
            SweeperError::EffectRender { .. } => vec![
                "Try a different effect preset",
                "Select 'None' to export the dry voice",
            ],
            SweeperError::MixRender { .. } => vec![
                "Remove overlay layers and render again",
                "Regenerate the voice take",
            ],
            SweeperError::Superseded { .. } => {
                vec!["A newer configuration is rendering; wait for it to finish"]
            }
            SweeperError::InvalidConfig { .. } => vec![
                "Check gains are between 0.0 and 1.0",
                "Check the sample rate is a positive integer",
            ],
            _ => vec![],
        }
    }

    /// Get a user-friendly message for this error
    pub fn friendly_message(&self) -> String {
        match self {
            SweeperError::Decode { reason, .. } => {
                format!("That audio couldn't be read ({}). Try generating the take again.", reason)
            }
            SweeperError::UnknownPreset { id } => {
                format!("There's no preset called '{}'.", id)
            }
            SweeperError::EffectRender { effect, .. } => {
                format!("The '{}' effect didn't render this time. Pick another effect or try again.", effect)
            }
            _ => self.to_string(),
        }
    }
}
