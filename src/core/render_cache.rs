//! Render cache: asset key -> last rendered output
//!
//! Written once per active asset per tick by the scheduler, polled by the
//! delivery layer at its own cadence. The handle is cheap to clone; all
//! clones share one table.
//!
//! Entries of paused/stopped assets keep their last value until the asset
//! is dumped, at which point `evict()` removes them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use log::{debug, trace};

use super::keys::AssetKey;

/// Cache statistics for monitoring
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 { 0.0 } else { self.hits() as f64 / total as f64 }
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }
}

/// Shared key -> output table
#[derive(Debug)]
pub struct RenderCache<T> {
    entries: Arc<Mutex<HashMap<AssetKey, T>>>,
    stats: Arc<CacheStats>,
}

impl<T> Clone for RenderCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<T> Default for RenderCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RenderCache<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(CacheStats::new()),
        }
    }

    /// Unconditional overwrite, last writer wins
    pub fn write(&self, key: &AssetKey, value: T) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.clone(), value);
        self.stats.record_write();
        trace!("Cache write: {}", key);
    }

    /// Remove the entry for a dumped asset. Returns true if one existed.
    pub fn evict(&self, key: &AssetKey) -> bool {
        let removed = self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some();
        if removed {
            self.stats.record_eviction();
            debug!("Cache evicted: {}", key);
        }
        removed
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    /// Clear entire cache
    pub fn clear_all(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
        debug!("Cleared render cache");
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }
}

impl<T: Clone> RenderCache<T> {
    /// Most recent write, or None if never written or evicted
    pub fn read(&self, key: &AssetKey) -> Option<T> {
        let result = self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned();

        if result.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        result
    }

    /// Copy of every entry, for bulk delivery
    pub fn snapshot(&self) -> Vec<(AssetKey, T)> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
