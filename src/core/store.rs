//! Immutable timeline storage keyed by asset key.

use std::collections::HashMap;

use crate::error::{EngineError, Result};

use super::asset::{Asset, TimedCue};
use super::keys::AssetKey;

/// Owns the loaded assets. No timing logic.
#[derive(Debug, Default)]
pub struct AssetStore {
    tracks: HashMap<AssetKey, Asset>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_track(&mut self, key: AssetKey, asset: Asset) {
        self.tracks.insert(key, asset);
    }

    /// Remove and return the asset, if present
    pub fn dump_track(&mut self, key: &AssetKey) -> Option<Asset> {
        self.tracks.remove(key)
    }

    pub fn get(&self, key: &AssetKey) -> Option<&Asset> {
        self.tracks.get(key)
    }

    /// Cue at `index`. Out-of-range is a caller bug and reported as such.
    pub fn get_cue(&self, key: &AssetKey, index: usize) -> Result<&TimedCue> {
        let asset = self
            .tracks
            .get(key)
            .ok_or_else(|| EngineError::UnknownAssetKey(key.hex().to_string()))?;

        asset
            .timeline
            .get(index)
            .ok_or_else(|| EngineError::IndexOutOfRange {
                key: key.hex().to_string(),
                index,
                len: asset.timeline.len(),
            })
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        self.tracks.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::{AssetData, Rgb};
    use crate::core::target::TargetDescriptor;

    fn store_with(len: usize) -> (AssetStore, AssetKey) {
        let key = AssetKey::from_hex("ab".repeat(32));
        let data = AssetData::new("t", (0..len).map(|i| Rgb::new(i as u8, 0, 0)).collect());
        let mut store = AssetStore::new();
        store.load_track(key.clone(), Asset::from_data(key.clone(), data, TargetDescriptor::default()));
        (store, key)
    }

    #[test]
    fn test_get_cue() {
        let (store, key) = store_with(3);
        let cue = store.get_cue(&key, 2).unwrap();
        assert_eq!(cue.position, 2);
        assert_eq!(cue.value, Rgb::new(2, 0, 0));
    }

    #[test]
    fn test_get_cue_out_of_range() {
        let (store, key) = store_with(3);
        assert_eq!(
            store.get_cue(&key, 3),
            Err(EngineError::IndexOutOfRange { key: key.hex().to_string(), index: 3, len: 3 })
        );
    }

    #[test]
    fn test_dump_track() {
        let (mut store, key) = store_with(1);
        assert!(store.dump_track(&key).is_some());
        assert!(store.is_empty());
        assert!(matches!(store.get_cue(&key, 0), Err(EngineError::UnknownAssetKey(_))));
    }
}
