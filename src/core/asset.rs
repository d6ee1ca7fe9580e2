//! Asset data model: cue values, timelines and the inbound load payload.
//!
//! `AssetData` is what callers hand to `AssetRegistry::load_asset`. It is
//! deserializable from JSON so hosts can feed assets straight from files:
//!
//! ```json
//! {
//!   "name": "strobe",
//!   "timeline": [{"red": 0, "green": 0, "blue": 0}, {"red": 255, "green": 255, "blue": 255}],
//!   "track": [0, 1],
//!   "meta": {"author": "lx"},
//!   "target": "group:front",
//!   "cue_duration_ms": 50
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

use super::keys::AssetKey;
use super::target::TargetDescriptor;

/// Three-channel color payload of a cue.
///
/// `Rgb::default()` is the zero-value sentinel returned as the previous cue
/// when there is none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const ZERO: Rgb = Rgb { red: 0, green: 0, blue: 0 };

    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// One keyframe at a 0-based ordinal position in a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedCue {
    pub position: usize,
    pub value: Rgb,
}

impl TimedCue {
    /// Sentinel cue used when there is no previous cue
    pub fn zero() -> Self {
        Self { position: 0, value: Rgb::ZERO }
    }
}

/// Inbound load payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetData {
    pub name: String,
    pub timeline: Vec<Rgb>,
    pub track: Vec<serde_json::Value>,
    pub meta: serde_json::Value,
    pub target: String,
    /// Per-asset cue duration; falls back to the engine default
    #[serde(default)]
    pub cue_duration_ms: Option<u64>,
}

impl AssetData {
    pub fn new(name: impl Into<String>, timeline: Vec<Rgb>) -> Self {
        Self {
            name: name.into(),
            timeline,
            track: Vec::new(),
            meta: serde_json::Value::Null,
            target: String::new(),
            cue_duration_ms: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_track(mut self, track: Vec<serde_json::Value>) -> Self {
        self.track = track;
        self
    }

    pub fn with_cue_duration_ms(mut self, ms: u64) -> Self {
        self.cue_duration_ms = Some(ms);
        self
    }

    /// Parse asset data from JSON. Malformed input is `InvalidAssetData`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::InvalidAssetData(e.to_string()))
    }

    /// Minimal load-time checks. Content itself is not validated.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::InvalidAssetData("missing asset name".into()));
        }
        if self.timeline.is_empty() {
            return Err(EngineError::InvalidAssetData(format!(
                "asset '{}' has an empty timeline",
                self.name
            )));
        }
        if self.cue_duration_ms == Some(0) {
            return Err(EngineError::InvalidAssetData(format!(
                "asset '{}' has a zero cue duration",
                self.name
            )));
        }
        Ok(())
    }

    /// Canonical signature of `meta` used in key generation
    pub fn meta_signature(&self) -> String {
        serde_json::to_string(&self.meta).unwrap_or_default()
    }
}

/// A loaded asset. Never mutated after load.
#[derive(Debug, Clone)]
pub struct Asset {
    pub key: AssetKey,
    pub name: String,
    pub timeline: Vec<TimedCue>,
    pub track: Vec<serde_json::Value>,
    pub meta: serde_json::Value,
    pub target: TargetDescriptor,
}

impl Asset {
    pub fn from_data(key: AssetKey, data: AssetData, target: TargetDescriptor) -> Self {
        let timeline = data
            .timeline
            .into_iter()
            .enumerate()
            .map(|(position, value)| TimedCue { position, value })
            .collect();

        Self {
            key,
            name: data.name,
            timeline,
            track: data.track,
            meta: data.meta,
            target,
        }
    }

    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }
}
