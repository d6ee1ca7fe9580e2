//! Asset registry: the single entry point for load/dump/play/pause/query
//!
//! **Architecture**: three parallel tables share one key space and live
//! behind this type's `&mut self` boundary:
//! - `keys`: ordered live key list (the index)
//! - `store`: immutable timelines (`AssetStore`)
//! - `playheads`: mutable playback state (`Playheads`)
//!
//! Load and dump touch all three in one call, so nothing outside the
//! registry ever sees a key present in one table and missing from another.
//!
//! # Error policy
//!
//! - Read paths (`get_state`, `get_cue`, `get_previous_cue`, `get_playhead`,
//!   `get_progress`) answer `Ok(None)` for unknown keys
//! - Write paths (`play`, `pause`, `stop`, `seek`, `dump_asset`) fail with
//!   `UnknownAssetKey`
//! - `IndexOutOfRange` means the tables disagree and is always logged

use indexmap::IndexSet;
use log::{debug, error, info};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::{EngineError, Result};

use super::asset::{Asset, AssetData, TimedCue};
use super::engine_events::{
    AssetDumpedEvent, AssetLoadedEvent, PlaybackStateChangedEvent, TimelineEndedEvent,
};
use super::event_bus::EventEmitter;
use super::keys::{generate_key, AssetKey, KeyFields};
use super::playhead::{EndPolicy, PlayState, PlayheadSnapshot, Playheads};
use super::store::AssetStore;
use super::target::{SelectorTargeting, TargetDescriptor, TargetQuery};

/// Combined per-asset snapshot handed to the render transform
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetState {
    pub key: AssetKey,
    pub cue: TimedCue,
    /// Cue at `index - 1`, or the zero sentinel at index 0
    pub previous_cue: TimedCue,
    pub playhead: PlayheadSnapshot,
    pub progress: f32,
}

pub struct AssetRegistry {
    keys: IndexSet<AssetKey>,
    names: HashMap<AssetKey, String>,
    store: AssetStore,
    playheads: Playheads,
    /// Monotonic, never reset; part of every key
    load_counter: u64,
    manifest: Vec<AssetKey>,
    ended: Vec<AssetKey>,
    default_cue_duration: Duration,
    targeting: Box<dyn TargetQuery>,
    emitter: EventEmitter,
}

impl std::fmt::Debug for AssetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetRegistry")
            .field("assets", &self.keys.len())
            .field("load_counter", &self.load_counter)
            .field("manifest", &self.manifest.len())
            .field("end_policy", &self.playheads.end_policy())
            .finish()
    }
}

impl AssetRegistry {
    pub fn new(end_policy: EndPolicy, default_cue_duration: Duration) -> Self {
        debug!(
            "AssetRegistry created: end_policy={:?}, default_cue_duration={:?}",
            end_policy, default_cue_duration
        );

        Self {
            keys: IndexSet::new(),
            names: HashMap::new(),
            store: AssetStore::new(),
            playheads: Playheads::new(end_policy),
            load_counter: 0,
            manifest: Vec::new(),
            ended: Vec::new(),
            default_cue_duration,
            targeting: Box::new(SelectorTargeting),
            emitter: EventEmitter::dummy(),
        }
    }

    /// Replace the targeting collaborator
    pub fn set_targeting(&mut self, targeting: Box<dyn TargetQuery>) {
        self.targeting = targeting;
    }

    pub fn set_emitter(&mut self, emitter: EventEmitter) {
        self.emitter = emitter;
    }

    pub fn end_policy(&self) -> EndPolicy {
        self.playheads.end_policy()
    }

    pub fn set_end_policy(&mut self, policy: EndPolicy) {
        self.playheads.set_end_policy(policy);
    }

    // === Load / dump ===

    /// Register an asset and return its new key.
    ///
    /// Validation happens before any table is touched, so a rejected load
    /// leaves no trace (the load counter included).
    pub fn load_asset(&mut self, data: AssetData) -> Result<AssetKey> {
        data.validate()?;

        let key = generate_key(&KeyFields::from_data(&data), self.load_counter);
        self.load_counter += 1;

        let cue_duration = data
            .cue_duration_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_cue_duration);
        let target = self.targeting.query_target(&data.target);
        let name = data.name.clone();
        let asset = Asset::from_data(key.clone(), data, target);
        let len = asset.len();

        self.keys.insert(key.clone());
        self.names.insert(key.clone(), name.clone());
        self.store.load_track(key.clone(), asset);
        self.playheads.load_timeline(key.clone(), len, cue_duration);

        info!("Loaded asset '{}' as {} ({} cues, {:?}/cue)", name, key, len, cue_duration);
        self.emitter.emit(AssetLoadedEvent { key: key.clone(), name });
        Ok(key)
    }

    /// Remove an asset from every table.
    pub fn dump_asset(&mut self, key: &AssetKey) -> Result<()> {
        if !self.keys.shift_remove(key) {
            return Err(EngineError::UnknownAssetKey(key.hex().to_string()));
        }
        self.store.dump_track(key);
        self.playheads.dump_timeline(key);
        let name = self.names.remove(key).unwrap_or_default();
        self.manifest.retain(|k| k != key);
        self.ended.retain(|k| k != key);

        info!("Dumped asset '{}' ({})", name, key);
        self.emitter.emit(AssetDumpedEvent { key: key.clone() });
        Ok(())
    }

    // === State queries ===

    /// Current cue, previous cue and playhead for `key`, or None if unknown.
    pub fn get_state(&self, key: &AssetKey) -> Result<Option<AssetState>> {
        if !self.keys.contains(key) {
            return Ok(None);
        }

        let playhead = self.playheads.get_playhead(key)?;
        let cue = *self.cue_at(key, playhead.index)?;
        let previous_cue = self.previous_cue_for(key, &playhead)?;

        Ok(Some(AssetState {
            key: key.clone(),
            cue,
            previous_cue,
            progress: playhead.progress,
            playhead,
        }))
    }

    /// Cue at the playhead's current index
    pub fn get_cue(&self, key: &AssetKey) -> Result<Option<TimedCue>> {
        if !self.keys.contains(key) {
            return Ok(None);
        }
        let index = self.playheads.get_index(key)?;
        self.cue_at(key, index).map(|cue| Some(*cue))
    }

    /// Cue before the current one, or the zero sentinel
    pub fn get_previous_cue(&self, key: &AssetKey) -> Result<Option<TimedCue>> {
        if !self.keys.contains(key) {
            return Ok(None);
        }
        let playhead = self.playheads.get_playhead(key)?;
        self.previous_cue_for(key, &playhead).map(Some)
    }

    fn previous_cue_for(&self, key: &AssetKey, playhead: &PlayheadSnapshot) -> Result<TimedCue> {
        if playhead.index > 0 && playhead.index <= playhead.index_max {
            self.cue_at(key, playhead.index - 1).copied()
        } else {
            Ok(TimedCue::zero())
        }
    }

    fn cue_at(&self, key: &AssetKey, index: usize) -> Result<&TimedCue> {
        self.store.get_cue(key, index).inspect_err(|e| {
            if matches!(e, EngineError::IndexOutOfRange { .. }) {
                error!("Referential integrity lost: {}", e);
            }
        })
    }

    pub fn get_playhead(&self, key: &AssetKey) -> Result<Option<PlayheadSnapshot>> {
        if !self.keys.contains(key) {
            return Ok(None);
        }
        self.playheads.get_playhead(key).map(Some)
    }

    pub fn get_progress(&self, key: &AssetKey) -> Result<Option<f32>> {
        if !self.keys.contains(key) {
            return Ok(None);
        }
        self.playheads.get_progress(key).map(Some)
    }

    // === Manifest ===

    /// Advance all playheads to `now` and cache the resulting manifest.
    pub fn generate_manifest(&mut self, now: Instant) -> &[AssetKey] {
        let advance = self.playheads.update(now);
        let policy = self.playheads.end_policy();
        for key in &advance.ended {
            self.emitter.emit(TimelineEndedEvent { key: key.clone(), policy });
            if policy == EndPolicy::Stop {
                self.emitter.emit(PlaybackStateChangedEvent {
                    key: key.clone(),
                    from: PlayState::Playing,
                    to: PlayState::Stopped,
                });
            }
        }
        self.manifest = advance.manifest;
        self.ended = advance.ended;
        &self.manifest
    }

    /// Manifest of the most recent tick
    pub fn get_manifest(&self) -> &[AssetKey] {
        &self.manifest
    }

    /// Keys that passed their last cue during the most recent tick
    pub fn ended_last_tick(&self) -> &[AssetKey] {
        &self.ended
    }

    // === Playback control ===

    pub fn play(&mut self, key: &AssetKey) -> Result<()> {
        let previous = self.playheads.play(key)?;
        self.emit_transition(key, previous, PlayState::Playing);
        Ok(())
    }

    pub fn pause(&mut self, key: &AssetKey) -> Result<()> {
        let previous = self.playheads.pause(key)?;
        self.emit_transition(key, previous, PlayState::Paused);
        Ok(())
    }

    pub fn stop(&mut self, key: &AssetKey) -> Result<()> {
        let previous = self.playheads.stop(key)?;
        self.emit_transition(key, previous, PlayState::Stopped);
        Ok(())
    }

    pub fn seek(&mut self, key: &AssetKey, index: usize) -> Result<()> {
        self.playheads.seek(key, index)?;
        debug!("Seek {} to cue {}", key, index);
        Ok(())
    }

    fn emit_transition(&self, key: &AssetKey, previous: Option<PlayState>, to: PlayState) {
        if let Some(from) = previous {
            debug!("Asset {}: {} -> {}", key, from, to);
            self.emitter.emit(PlaybackStateChangedEvent { key: key.clone(), from, to });
        }
    }

    // === Targeting ===

    /// Pass-through to the targeting collaborator
    pub fn query_target(&self, query: &str) -> TargetDescriptor {
        self.targeting.query_target(query)
    }

    /// Target resolved at load time
    pub fn target_of(&self, key: &AssetKey) -> Option<&TargetDescriptor> {
        self.store.get(key).map(|a| &a.target)
    }

    // === Introspection ===

    pub fn asset_name(&self, key: &AssetKey) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    /// (key, name) pairs in load order
    pub fn asset_names(&self) -> Vec<(AssetKey, String)> {
        self.keys
            .iter()
            .map(|k| (k.clone(), self.names.get(k).cloned().unwrap_or_default()))
            .collect()
    }

    /// Live keys in load order
    pub fn keys(&self) -> impl Iterator<Item = &AssetKey> {
        self.keys.iter()
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        self.keys.contains(key)
    }

    /// Number of loads ever performed
    pub fn assets_loaded(&self) -> u64 {
        self.load_counter
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// True when all three tables hold exactly the live key set
    pub fn is_consistent(&self) -> bool {
        self.store.len() == self.keys.len()
            && self.playheads.len() == self.keys.len()
            && self
                .keys
                .iter()
                .all(|k| self.store.contains(k) && self.playheads.contains(k))
    }
}
