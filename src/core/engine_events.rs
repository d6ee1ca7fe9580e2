//! Engine lifecycle and diagnostic events.

use super::keys::AssetKey;
use super::playhead::{EndPolicy, PlayState};

// === Registry ===

#[derive(Clone, Debug)]
pub struct AssetLoadedEvent {
    pub key: AssetKey,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct AssetDumpedEvent {
    pub key: AssetKey,
}

// === Playback ===

#[derive(Clone, Debug)]
pub struct PlaybackStateChangedEvent {
    pub key: AssetKey,
    pub from: PlayState,
    pub to: PlayState,
}

/// A playhead ran past its last cue
#[derive(Clone, Debug)]
pub struct TimelineEndedEvent {
    pub key: AssetKey,
    pub policy: EndPolicy,
}

// === Tick diagnostics ===

/// Key was in the manifest but `get_state` found nothing
#[derive(Clone, Debug)]
pub struct ManifestResolutionFailureEvent {
    pub key: AssetKey,
    pub tick: u64,
}

/// Playhead index and stored timeline disagree
#[derive(Clone, Debug)]
pub struct CueIndexOutOfRangeEvent {
    pub key: AssetKey,
    pub index: usize,
    pub len: usize,
    pub tick: u64,
}
