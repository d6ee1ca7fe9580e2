//! Engine error taxonomy.
//!
//! Read paths report a missing key as `Ok(None)`; write paths report it as
//! [`EngineError::UnknownAssetKey`].

use thiserror::Error;

/// Errors raised by the registry, the playhead table and the scheduler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Asset data rejected at load time; nothing was registered
    #[error("Invalid asset data: {0}")]
    InvalidAssetData(String),

    /// Key is not in the live key list
    #[error("Unknown asset key: {0}")]
    UnknownAssetKey(String),

    /// Playhead and store disagree on valid bounds
    #[error("Cue index {index} out of range for asset {key} (timeline length {len})")]
    IndexOutOfRange { key: String, index: usize, len: usize },

    /// Key was in the manifest but its state could not be resolved
    #[error("Manifest key {0} could not be resolved")]
    ManifestResolutionFailure(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
