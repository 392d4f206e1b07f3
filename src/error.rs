use std::time::Duration;

use thiserror::Error;

use crate::asset::AssetKind;

/// Failures raised while loading or playing a single media asset.
///
/// None of these are fatal: the batch loader turns every one of them into a
/// settled probe and the lazy media controller turns them into a poster
/// fallback or a silently skipped play request.
#[derive(Debug, Clone, Error)]
pub enum MediaError {
    #[error("{kind} did not settle within {budget:?}: {locator}")]
    LoadTimeout {
        locator: String,
        kind: AssetKind,
        budget: Duration,
    },
    #[error("failed to load {kind} {locator}: {reason}")]
    LoadError {
        locator: String,
        kind: AssetKind,
        reason: String,
    },
    #[error("playback blocked for {locator}: {reason}")]
    PlaybackBlocked { locator: String, reason: String },
}

impl MediaError {
    pub fn load(locator: impl Into<String>, kind: AssetKind, reason: impl ToString) -> Self {
        MediaError::LoadError {
            locator: locator.into(),
            kind,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}
