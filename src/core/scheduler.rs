//! Tick scheduler: the engine instance driven by the clock
//!
//! One `tick()` pass, in order:
//! 1. `AssetRegistry::generate_manifest` advances every playhead
//! 2. for each manifest key, `get_state` -> render transform -> cache write
//! 3. keys that fail to resolve are reported and skipped, the pass goes on
//!
//! `Engine` takes `&mut self` for both ticks and control calls, so a tick
//! can never interleave with load/dump/play/pause. `EngineHandle` shares one
//! engine between the clock thread and the control surface under a single
//! mutex.

use log::{debug, error, info, trace, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

use super::asset::AssetData;
use super::engine_events::{CueIndexOutOfRangeEvent, ManifestResolutionFailureEvent};
use super::event_bus::EventBus;
use super::keys::AssetKey;
use super::playhead::{EndPolicy, PlayheadSnapshot};
use super::registry::{AssetRegistry, AssetState};
use super::render::RenderTransform;
use super::render_cache::RenderCache;
use super::target::{TargetDescriptor, TargetQuery};

/// Outcome of one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// 1-based tick number
    pub tick: u64,
    pub manifest_len: usize,
    pub rendered: usize,
    /// Keys that could not be rendered this tick
    pub failures: Vec<EngineError>,
    /// Wall-clock time spent in the tick
    pub elapsed: Duration,
}

/// Engine core: registry, render transform, render cache and event bus.
pub struct Engine<R: RenderTransform> {
    registry: AssetRegistry,
    render: R,
    cache: RenderCache<R::Output>,
    events: EventBus,
    tick_count: u64,
    last_report: Option<TickReport>,
}

impl<R: RenderTransform> Engine<R> {
    pub fn new(config: &EngineConfig, render: R) -> Self {
        let events = EventBus::new();
        let mut registry = AssetRegistry::new(config.end_policy, config.default_cue_duration());
        registry.set_emitter(events.emitter());

        info!(
            "Engine initialized: tick={:?}, cue={:?}, end_policy={:?}",
            config.tick_interval(),
            config.default_cue_duration(),
            config.end_policy
        );

        Self {
            registry,
            render,
            cache: RenderCache::new(),
            events,
            tick_count: 0,
            last_report: None,
        }
    }

    /// Replace the targeting collaborator
    pub fn with_targeting(mut self, targeting: Box<dyn TargetQuery>) -> Self {
        self.registry.set_targeting(targeting);
        self
    }

    // === Control surface ===

    pub fn load_asset(&mut self, data: AssetData) -> Result<AssetKey> {
        self.registry.load_asset(data)
    }

    /// Remove an asset and its cached output
    pub fn dump_asset(&mut self, key: &AssetKey) -> Result<()> {
        self.registry.dump_asset(key)?;
        self.cache.evict(key);
        Ok(())
    }

    pub fn play(&mut self, key: &AssetKey) -> Result<()> {
        self.registry.play(key)
    }

    pub fn pause(&mut self, key: &AssetKey) -> Result<()> {
        self.registry.pause(key)
    }

    pub fn stop(&mut self, key: &AssetKey) -> Result<()> {
        self.registry.stop(key)
    }

    pub fn seek(&mut self, key: &AssetKey, index: usize) -> Result<()> {
        self.registry.seek(key, index)
    }

    pub fn set_end_policy(&mut self, policy: EndPolicy) {
        self.registry.set_end_policy(policy);
    }

    pub fn query_target(&self, query: &str) -> TargetDescriptor {
        self.registry.query_target(query)
    }

    // === Queries ===

    pub fn get_state(&self, key: &AssetKey) -> Result<Option<AssetState>> {
        self.registry.get_state(key)
    }

    pub fn get_playhead(&self, key: &AssetKey) -> Result<Option<PlayheadSnapshot>> {
        self.registry.get_playhead(key)
    }

    pub fn get_manifest(&self) -> &[AssetKey] {
        self.registry.get_manifest()
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Reader handle on the render cache
    pub fn cache(&self) -> RenderCache<R::Output> {
        self.cache.clone()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn last_report(&self) -> Option<&TickReport> {
        self.last_report.as_ref()
    }

    // === Tick ===

    pub fn tick(&mut self) -> TickReport {
        self.tick_at(Instant::now())
    }

    /// Run one tick as if the clock read `now`.
    pub fn tick_at(&mut self, now: Instant) -> TickReport {
        let started = Instant::now();
        self.tick_count += 1;

        let manifest = self.registry.generate_manifest(now).to_vec();
        let mut report = self.render_manifest(&manifest);
        report.elapsed = started.elapsed();

        trace!(
            "Tick {}: {} active, {} rendered, {} failed in {:?}",
            report.tick,
            report.manifest_len,
            report.rendered,
            report.failures.len(),
            report.elapsed
        );
        self.last_report = Some(report.clone());
        report
    }

    /// Resolve, render and cache every manifest key. One bad key never stalls the rest.
    fn render_manifest(&mut self, manifest: &[AssetKey]) -> TickReport {
        let mut report = TickReport {
            tick: self.tick_count,
            manifest_len: manifest.len(),
            ..Default::default()
        };

        for key in manifest {
            match self.registry.get_state(key) {
                Ok(Some(state)) => {
                    let output = self.render.render(&state);
                    self.cache.write(key, output);
                    report.rendered += 1;
                }
                Ok(None) => {
                    warn!("Manifest key {} not resolvable (tick {})", key, self.tick_count);
                    self.events.emit(ManifestResolutionFailureEvent {
                        key: key.clone(),
                        tick: self.tick_count,
                    });
                    report
                        .failures
                        .push(EngineError::ManifestResolutionFailure(key.hex().to_string()));
                }
                Err(e) => {
                    error!("Tick {}: asset {} skipped: {}", self.tick_count, key, e);
                    if let EngineError::IndexOutOfRange { index, len, .. } = &e {
                        self.events.emit(CueIndexOutOfRangeEvent {
                            key: key.clone(),
                            index: *index,
                            len: *len,
                            tick: self.tick_count,
                        });
                    }
                    report.failures.push(e);
                }
            }
        }

        report
    }
}

/// Shared engine: one mutex covers ticks and control calls
pub struct EngineHandle<R: RenderTransform> {
    engine: Arc<Mutex<Engine<R>>>,
    cache: RenderCache<R::Output>,
}

impl<R: RenderTransform> Clone for EngineHandle<R> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            cache: self.cache.clone(),
        }
    }
}

impl<R: RenderTransform> EngineHandle<R> {
    pub fn new(engine: Engine<R>) -> Self {
        let cache = engine.cache();
        Self {
            engine: Arc::new(Mutex::new(engine)),
            cache,
        }
    }

    /// Exclusive access for the duration of the guard
    pub fn lock(&self) -> MutexGuard<'_, Engine<R>> {
        self.engine.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn tick(&self) -> TickReport {
        self.lock().tick()
    }

    pub fn load_asset(&self, data: AssetData) -> Result<AssetKey> {
        self.lock().load_asset(data)
    }

    pub fn dump_asset(&self, key: &AssetKey) -> Result<()> {
        self.lock().dump_asset(key)
    }

    pub fn play(&self, key: &AssetKey) -> Result<()> {
        self.lock().play(key)
    }

    pub fn pause(&self, key: &AssetKey) -> Result<()> {
        self.lock().pause(key)
    }

    pub fn stop(&self, key: &AssetKey) -> Result<()> {
        self.lock().stop(key)
    }

    pub fn get_state(&self, key: &AssetKey) -> Result<Option<AssetState>> {
        self.lock().get_state(key)
    }

    pub fn query_target(&self, query: &str) -> TargetDescriptor {
        self.lock().query_target(query)
    }

    /// Render cache reader; does not take the engine lock
    pub fn cache(&self) -> &RenderCache<R::Output> {
        &self.cache
    }

    /// Cached output for `key` without taking the engine lock
    pub fn read(&self, key: &AssetKey) -> Option<R::Output> {
        self.cache.read(key)
    }
}

impl<R: RenderTransform> Drop for Engine<R> {
    fn drop(&mut self) {
        debug!("Engine dropped after {} ticks", self.tick_count);
    }
}
