//! Core engine modules - assets, playheads, registry, cache, scheduler
//!
//! Everything here is host-agnostic: no sockets, no fixtures. A host feeds
//! `AssetData` in, drives `Engine::tick` (directly or through `Clock`) and
//! reads rendered output from the `RenderCache`.

pub mod asset;
pub mod clock;
pub mod engine_events;
pub mod event_bus;
pub mod keys;
pub mod playhead;
pub mod registry;
pub mod render;
pub mod render_cache;
pub mod scheduler;
pub mod store;
pub mod target;

// Re-exports for convenience
pub use asset::{Asset, AssetData, Rgb, TimedCue};
pub use clock::Clock;
pub use event_bus::EventBus;
pub use keys::{AssetKey, generate_key};
pub use playhead::{EndPolicy, PlayState, PlayheadSnapshot, Playheads};
pub use registry::{AssetRegistry, AssetState};
pub use render::{FnRender, RenderTransform, RenderedCue, SnapshotRender};
pub use render_cache::{CacheStats, RenderCache};
pub use scheduler::{Engine, EngineHandle, TickReport};
pub use store::AssetStore;
pub use target::{SelectorTargeting, TargetDescriptor, TargetQuery};
