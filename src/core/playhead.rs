//! Per-asset playhead state machine with wall-clock timing
//!
//! **Architecture**: `Playheads` owns one entry per loaded asset, kept in
//! load order. It knows nothing about cue values; the registry pairs it with
//! the `AssetStore` under a single mutation boundary.
//!
//! # States
//!
//! - **STOPPED**: initial state, index 0 (or clamped at the end under `EndPolicy::Stop`)
//! - **PLAYING**: advanced on every `update()`
//! - **PAUSED**: index frozen, resumes where it left off
//!
//! # Timing Model
//!
//! Each asset has a fixed cue duration. `update(now)` measures wall-clock time
//! since the asset's previous update and advances by whole cue durations. The
//! remainder is carried into the next update, so tick jitter never
//! accumulates into drift. The first update after `play()` only arms the
//! clock.
//!
//! # End of timeline
//!
//! When the index would pass `index_max`, the engine-wide `EndPolicy`
//! decides: `Loop` wraps around, `Stop` clamps to `index_max` and stops.

use indexmap::IndexMap;
use log::{debug, error, trace};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::error::{EngineError, Result};

use super::keys::AssetKey;

/// Playback state of one asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlayState::Stopped => "STOPPED",
            PlayState::Playing => "PLAYING",
            PlayState::Paused => "PAUSED",
        })
    }
}

/// What happens when a playhead runs past its last cue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndPolicy {
    /// Wrap back to cue 0 and keep playing
    #[default]
    Loop,
    /// Hold the last cue and transition to STOPPED
    Stop,
}

impl FromStr for EndPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "loop" => Ok(EndPolicy::Loop),
            "stop" => Ok(EndPolicy::Stop),
            other => Err(format!("unknown end policy '{}' (expected loop|stop)", other)),
        }
    }
}

/// Read-only view of a playhead
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayheadSnapshot {
    pub state: PlayState,
    pub index: usize,
    pub index_max: usize,
    pub progress: f32,
}

/// Result of one `update()` pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayheadAdvance {
    /// Keys that were PLAYING when the update started, in load order
    pub manifest: Vec<AssetKey>,
    /// Keys that ran past their last cue during this update
    pub ended: Vec<AssetKey>,
}

#[derive(Debug, Clone)]
struct PlayheadEntry {
    state: PlayState,
    index: usize,
    index_max: usize,
    cue_duration: Duration,
    /// Time of the previous advance (runtime-only, None = not armed)
    last_advance: Option<Instant>,
    /// Elapsed time not yet consumed by a whole cue
    carry: Duration,
}

impl PlayheadEntry {
    fn progress(&self) -> f32 {
        if self.index_max == 0 {
            100.0
        } else {
            self.index as f32 / self.index_max as f32 * 100.0
        }
    }

    fn snapshot(&self) -> PlayheadSnapshot {
        PlayheadSnapshot {
            state: self.state,
            index: self.index,
            index_max: self.index_max,
            progress: self.progress(),
        }
    }

    /// Advance by elapsed time. Returns true if the end of the timeline was crossed.
    fn advance(&mut self, now: Instant, policy: EndPolicy) -> bool {
        let Some(last) = self.last_advance else {
            self.last_advance = Some(now);
            return false;
        };

        self.carry += now.saturating_duration_since(last);
        self.last_advance = Some(now);

        let cue_nanos = self.cue_duration.as_nanos().max(1);
        let carry_nanos = self.carry.as_nanos();
        let steps = carry_nanos / cue_nanos;
        if steps == 0 {
            return false;
        }
        self.carry = Duration::from_nanos((carry_nanos % cue_nanos) as u64);

        let len = self.index_max as u128 + 1;
        let target = self.index as u128 + steps;
        if target <= self.index_max as u128 {
            self.index = target as usize;
            return false;
        }

        match policy {
            EndPolicy::Loop => {
                self.index = (target % len) as usize;
            }
            EndPolicy::Stop => {
                self.index = self.index_max;
                self.state = PlayState::Stopped;
                self.last_advance = None;
                self.carry = Duration::ZERO;
            }
        }
        true
    }
}

/// Playhead table for all loaded assets
#[derive(Debug, Default)]
pub struct Playheads {
    entries: IndexMap<AssetKey, PlayheadEntry>,
    end_policy: EndPolicy,
}

impl Playheads {
    pub fn new(end_policy: EndPolicy) -> Self {
        Self {
            entries: IndexMap::new(),
            end_policy,
        }
    }

    pub fn end_policy(&self) -> EndPolicy {
        self.end_policy
    }

    pub fn set_end_policy(&mut self, policy: EndPolicy) {
        if self.end_policy != policy {
            debug!("End policy: {:?} -> {:?}", self.end_policy, policy);
            self.end_policy = policy;
        }
    }

    /// Register a fresh STOPPED playhead at index 0. `len` must be at least 1.
    pub fn load_timeline(&mut self, key: AssetKey, len: usize, cue_duration: Duration) {
        let entry = PlayheadEntry {
            state: PlayState::Stopped,
            index: 0,
            index_max: len.saturating_sub(1),
            cue_duration,
            last_advance: None,
            carry: Duration::ZERO,
        };
        self.entries.insert(key, entry);
    }

    /// Remove a playhead, preserving the order of the others
    pub fn dump_timeline(&mut self, key: &AssetKey) -> bool {
        self.entries.shift_remove(key).is_some()
    }

    fn entry(&self, key: &AssetKey) -> Result<&PlayheadEntry> {
        self.entries
            .get(key)
            .ok_or_else(|| EngineError::UnknownAssetKey(key.hex().to_string()))
    }

    fn entry_mut(&mut self, key: &AssetKey) -> Result<&mut PlayheadEntry> {
        self.entries
            .get_mut(key)
            .ok_or_else(|| EngineError::UnknownAssetKey(key.hex().to_string()))
    }

    /// STOPPED|PAUSED -> PLAYING. Returns the previous state if it changed.
    ///
    /// Playing from STOPPED restarts at cue 0.
    pub fn play(&mut self, key: &AssetKey) -> Result<Option<PlayState>> {
        let entry = self.entry_mut(key)?;
        let previous = entry.state;
        match previous {
            PlayState::Playing => return Ok(None),
            PlayState::Stopped => {
                entry.index = 0;
                entry.carry = Duration::ZERO;
            }
            PlayState::Paused => {}
        }
        entry.state = PlayState::Playing;
        entry.last_advance = None;
        trace!("Play {}: {} -> PLAYING at cue {}", key, previous, entry.index);
        Ok(Some(previous))
    }

    /// PLAYING -> PAUSED. Returns the previous state if it changed.
    pub fn pause(&mut self, key: &AssetKey) -> Result<Option<PlayState>> {
        let entry = self.entry_mut(key)?;
        if entry.state != PlayState::Playing {
            return Ok(None);
        }
        entry.state = PlayState::Paused;
        entry.last_advance = None;
        trace!("Pause {} at cue {}", key, entry.index);
        Ok(Some(PlayState::Playing))
    }

    /// Any state -> STOPPED at cue 0. Returns the previous state if it changed.
    pub fn stop(&mut self, key: &AssetKey) -> Result<Option<PlayState>> {
        let entry = self.entry_mut(key)?;
        let previous = entry.state;
        entry.index = 0;
        entry.carry = Duration::ZERO;
        entry.last_advance = None;
        if previous == PlayState::Stopped {
            return Ok(None);
        }
        entry.state = PlayState::Stopped;
        trace!("Stop {}: {} -> STOPPED", key, previous);
        Ok(Some(previous))
    }

    /// Jump to a cue. Indices past `index_max` are rejected, never clamped.
    pub fn seek(&mut self, key: &AssetKey, index: usize) -> Result<()> {
        let entry = self.entry_mut(key)?;
        if index > entry.index_max {
            let err = EngineError::IndexOutOfRange {
                key: key.hex().to_string(),
                index,
                len: entry.index_max + 1,
            };
            error!("Seek rejected: {}", err);
            return Err(err);
        }
        entry.index = index;
        entry.carry = Duration::ZERO;
        entry.last_advance = None;
        Ok(())
    }

    /// Advance every PLAYING playhead to `now`.
    ///
    /// The manifest is taken from the states at the start of the pass, so a
    /// playhead that stops at its end this pass still gets one final render.
    pub fn update(&mut self, now: Instant) -> PlayheadAdvance {
        let policy = self.end_policy;
        let mut advance = PlayheadAdvance::default();

        for (key, entry) in self.entries.iter_mut() {
            if entry.state != PlayState::Playing {
                continue;
            }
            advance.manifest.push(key.clone());
            if entry.advance(now, policy) {
                trace!("Timeline end {} ({:?}), now at cue {}", key, policy, entry.index);
                advance.ended.push(key.clone());
            }
        }

        advance
    }

    pub fn get_playhead(&self, key: &AssetKey) -> Result<PlayheadSnapshot> {
        self.entry(key).map(PlayheadEntry::snapshot)
    }

    pub fn get_index(&self, key: &AssetKey) -> Result<usize> {
        self.entry(key).map(|e| e.index)
    }

    /// Progress in [0, 100]; single-cue timelines report 100
    pub fn get_progress(&self, key: &AssetKey) -> Result<f32> {
        self.entry(key).map(PlayheadEntry::progress)
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUE: Duration = Duration::from_millis(10);

    fn key(n: u8) -> AssetKey {
        AssetKey::from_hex(format!("{:02x}", n).repeat(32))
    }

    fn table(policy: EndPolicy, len: usize) -> (Playheads, AssetKey) {
        let mut p = Playheads::new(policy);
        let k = key(1);
        p.load_timeline(k.clone(), len, CUE);
        (p, k)
    }

    #[test]
    fn test_initial_state() {
        let (p, k) = table(EndPolicy::Loop, 5);
        let snap = p.get_playhead(&k).unwrap();
        assert_eq!(snap.state, PlayState::Stopped);
        assert_eq!(snap.index, 0);
        assert_eq!(snap.index_max, 4);
        assert_eq!(snap.progress, 0.0);
    }

    #[test]
    fn test_play_pause_idempotent() {
        let (mut p, k) = table(EndPolicy::Loop, 3);
        assert_eq!(p.play(&k).unwrap(), Some(PlayState::Stopped));
        assert_eq!(p.play(&k).unwrap(), None);
        assert_eq!(p.get_playhead(&k).unwrap().state, PlayState::Playing);

        assert_eq!(p.pause(&k).unwrap(), Some(PlayState::Playing));
        assert_eq!(p.pause(&k).unwrap(), None);
        assert_eq!(p.get_playhead(&k).unwrap().state, PlayState::Paused);
    }

    #[test]
    fn test_pause_when_stopped_is_noop() {
        let (mut p, k) = table(EndPolicy::Loop, 3);
        assert_eq!(p.pause(&k).unwrap(), None);
        assert_eq!(p.get_playhead(&k).unwrap().state, PlayState::Stopped);
    }

    #[test]
    fn test_unknown_key() {
        let (mut p, _) = table(EndPolicy::Loop, 3);
        let missing = key(9);
        assert!(matches!(p.play(&missing), Err(EngineError::UnknownAssetKey(_))));
        assert!(matches!(p.pause(&missing), Err(EngineError::UnknownAssetKey(_))));
        assert!(matches!(p.get_playhead(&missing), Err(EngineError::UnknownAssetKey(_))));
    }

    #[test]
    fn test_first_update_arms_clock() {
        let (mut p, k) = table(EndPolicy::Loop, 5);
        p.play(&k).unwrap();
        let t0 = Instant::now();
        let adv = p.update(t0 + Duration::from_secs(5));
        assert_eq!(adv.manifest, vec![k.clone()]);
        assert_eq!(p.get_index(&k).unwrap(), 0);
    }

    #[test]
    fn test_advance_carries_remainder() {
        let (mut p, k) = table(EndPolicy::Loop, 10);
        p.play(&k).unwrap();
        let t0 = Instant::now();
        p.update(t0);
        p.update(t0 + Duration::from_millis(6));
        assert_eq!(p.get_index(&k).unwrap(), 0);
        // 6ms + 6ms = one cue plus 2ms carried
        p.update(t0 + Duration::from_millis(12));
        assert_eq!(p.get_index(&k).unwrap(), 1);
        p.update(t0 + Duration::from_millis(20));
        assert_eq!(p.get_index(&k).unwrap(), 2);
    }

    #[test]
    fn test_loop_wraps() {
        let (mut p, k) = table(EndPolicy::Loop, 3);
        p.play(&k).unwrap();
        let t0 = Instant::now();
        p.update(t0);
        let adv = p.update(t0 + Duration::from_millis(40));
        assert_eq!(adv.ended, vec![k.clone()]);
        assert_eq!(p.get_index(&k).unwrap(), 1);
        assert_eq!(p.get_playhead(&k).unwrap().state, PlayState::Playing);
    }

    #[test]
    fn test_stop_policy_clamps_and_stops() {
        let (mut p, k) = table(EndPolicy::Stop, 3);
        p.play(&k).unwrap();
        let t0 = Instant::now();
        p.update(t0);
        let adv = p.update(t0 + Duration::from_millis(100));
        // Still rendered on the tick it ended
        assert_eq!(adv.manifest, vec![k.clone()]);
        assert_eq!(adv.ended, vec![k.clone()]);

        let snap = p.get_playhead(&k).unwrap();
        assert_eq!(snap.state, PlayState::Stopped);
        assert_eq!(snap.index, 2);
        assert_eq!(snap.progress, 100.0);

        assert!(p.update(t0 + Duration::from_millis(200)).manifest.is_empty());

        // Replay restarts from the top
        p.play(&k).unwrap();
        assert_eq!(p.get_index(&k).unwrap(), 0);
    }

    #[test]
    fn test_paused_does_not_advance() {
        let (mut p, k) = table(EndPolicy::Loop, 5);
        p.play(&k).unwrap();
        let t0 = Instant::now();
        p.update(t0);
        p.update(t0 + Duration::from_millis(10));
        p.pause(&k).unwrap();
        let adv = p.update(t0 + Duration::from_millis(500));
        assert!(adv.manifest.is_empty());
        assert_eq!(p.get_index(&k).unwrap(), 1);

        // Resume: paused time is not counted
        p.play(&k).unwrap();
        p.update(t0 + Duration::from_millis(600));
        assert_eq!(p.get_index(&k).unwrap(), 1);
        p.update(t0 + Duration::from_millis(610));
        assert_eq!(p.get_index(&k).unwrap(), 2);
    }

    #[test]
    fn test_manifest_follows_load_order() {
        let mut p = Playheads::new(EndPolicy::Loop);
        for n in 1..=4 {
            p.load_timeline(key(n), 2, CUE);
        }
        p.play(&key(3)).unwrap();
        p.play(&key(1)).unwrap();
        p.play(&key(4)).unwrap();
        p.pause(&key(4)).unwrap();
        let adv = p.update(Instant::now());
        assert_eq!(adv.manifest, vec![key(1), key(3)]);
    }

    #[test]
    fn test_progress() {
        let (mut p, k) = table(EndPolicy::Loop, 5);
        p.seek(&k, 2).unwrap();
        assert_eq!(p.get_progress(&k).unwrap(), 50.0);

        let (single, s) = table(EndPolicy::Loop, 1);
        assert_eq!(single.get_progress(&s).unwrap(), 100.0);
    }

    #[test]
    fn test_seek_rejects_out_of_range() {
        let (mut p, k) = table(EndPolicy::Loop, 3);
        assert!(matches!(
            p.seek(&k, 3),
            Err(EngineError::IndexOutOfRange { index: 3, len: 3, .. })
        ));
        assert_eq!(p.get_index(&k).unwrap(), 0);
    }

    #[test]
    fn test_rejected_seek_keeps_playback_running() {
        let (mut p, k) = table(EndPolicy::Loop, 3);
        p.play(&k).unwrap();
        let t0 = Instant::now();
        p.update(t0);
        p.update(t0 + CUE);
        assert_eq!(p.get_index(&k).unwrap(), 1);

        assert!(p.seek(&k, 7).is_err());
        let snap = p.get_playhead(&k).unwrap();
        assert_eq!((snap.state, snap.index), (PlayState::Playing, 1));

        // Clock stays armed: the next cue lands on schedule
        p.update(t0 + CUE * 2);
        assert_eq!(p.get_index(&k).unwrap(), 2);
    }

    #[test]
    fn test_stop_resets_index() {
        let (mut p, k) = table(EndPolicy::Loop, 3);
        p.play(&k).unwrap();
        p.seek(&k, 2).unwrap();
        assert_eq!(p.stop(&k).unwrap(), Some(PlayState::Playing));
        assert_eq!(p.get_index(&k).unwrap(), 0);
        assert_eq!(p.stop(&k).unwrap(), None);
    }

    #[test]
    fn test_dump_timeline() {
        let (mut p, k) = table(EndPolicy::Loop, 3);
        assert!(p.dump_timeline(&k));
        assert!(!p.dump_timeline(&k));
        assert!(p.is_empty());
    }

    #[test]
    fn test_end_policy_from_str() {
        assert_eq!("loop".parse::<EndPolicy>(), Ok(EndPolicy::Loop));
        assert_eq!("STOP".parse::<EndPolicy>(), Ok(EndPolicy::Stop));
        assert!("bounce".parse::<EndPolicy>().is_err());
    }
}
