//! Render transform contract.
//!
//! The interpolation math that turns a cue state into fixture output lives
//! outside the engine. The scheduler only needs a pure `render(&state)`.

use serde::{Deserialize, Serialize};

use super::asset::Rgb;
use super::playhead::PlayState;
use super::registry::AssetState;

/// Converts an asset state snapshot into a consumable output.
///
/// Called once per active asset per tick, with the engine lock held, so
/// implementations must be cheap and must not block.
pub trait RenderTransform: Send {
    type Output: Clone + Send + 'static;

    fn render(&self, state: &AssetState) -> Self::Output;
}

/// Forwards the current state without interpolation
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotRender;

/// Output of [`SnapshotRender`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedCue {
    pub color: Rgb,
    pub previous: Rgb,
    pub index: usize,
    pub state: PlayState,
    pub progress: f32,
}

impl RenderTransform for SnapshotRender {
    type Output = RenderedCue;

    fn render(&self, state: &AssetState) -> RenderedCue {
        RenderedCue {
            color: state.cue.value,
            previous: state.previous_cue.value,
            index: state.playhead.index,
            state: state.playhead.state,
            progress: state.progress,
        }
    }
}

/// Adapts a closure into a render transform
pub struct FnRender<F>(pub F);

impl<F, O> RenderTransform for FnRender<F>
where
    F: Fn(&AssetState) -> O + Send,
    O: Clone + Send + 'static,
{
    type Output = O;

    fn render(&self, state: &AssetState) -> O {
        (self.0)(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::TimedCue;
    use crate::core::keys::AssetKey;
    use crate::core::playhead::PlayheadSnapshot;

    fn state() -> AssetState {
        AssetState {
            key: AssetKey::from_hex("cd".repeat(32)),
            cue: TimedCue { position: 1, value: Rgb::new(128, 128, 128) },
            previous_cue: TimedCue { position: 0, value: Rgb::ZERO },
            playhead: PlayheadSnapshot {
                state: PlayState::Playing,
                index: 1,
                index_max: 2,
                progress: 50.0,
            },
            progress: 50.0,
        }
    }

    #[test]
    fn test_snapshot_render() {
        let out = SnapshotRender.render(&state());
        assert_eq!(out.color, Rgb::new(128, 128, 128));
        assert_eq!(out.previous, Rgb::ZERO);
        assert_eq!(out.index, 1);
        assert_eq!(out.state, PlayState::Playing);
        assert_eq!(out.progress, 50.0);
    }

    #[test]
    fn test_fn_render() {
        let render = FnRender(|s: &AssetState| s.cue.value.red as u32 * 2);
        assert_eq!(render.render(&state()), 256);
    }
}
