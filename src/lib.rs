//! cuecast - tick-driven cue playback engine library
//!
//! Re-exports the engine for use by the binary target and by hosts.

// Core engine (assets, playheads, registry, cache, scheduler)
pub mod core;

// Host modules
pub mod cli;
pub mod config;
pub mod error;

// Re-export commonly used types from core
pub use crate::core::event_bus::{BoxedEvent, EventBus, EventEmitter, downcast_event};
pub use crate::core::{
    AssetData, AssetKey, AssetState, Clock, EndPolicy, Engine, EngineHandle, PlayState, RenderCache, RenderTransform,
    RenderedCue, Rgb, SnapshotRender, TickReport, TimedCue,
};

pub use config::EngineConfig;
pub use error::{EngineError, Result};
