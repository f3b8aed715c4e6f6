//! Volume and mute
//!
//! Volume lives on a 0-100 scale and is remembered across players in the
//! unscoped `volume` preference. Muting sets the volume to zero and
//! remembers the previous level for unmuting.

use crate::modules::{FeatureModule, ModuleContext};
use crate::player::{keys, EventKind, ModuleName, PlayerEvent};
use crate::utils::error::Result;
use log::debug;
use std::any::Any;

/// Keyboard step
pub const VOLUME_STEP: u8 = 20;

/// Level restored when unmuting from a stored zero volume
const DEFAULT_UNMUTE_VOLUME: u8 = 100;

#[derive(Debug, Default)]
pub struct VolumeControl {
    /// Level to restore when unmuting
    previous: Option<u8>,
}

impl VolumeControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set volume on a 0-100 scale. Out-of-range values are ignored.
    pub fn set_volume(&mut self, volume: f64, ctx: &mut ModuleContext<'_>) -> bool {
        if !volume.is_finite() || !(0.0..=100.0).contains(&volume) {
            debug!("Ignoring volume {}", volume);
            return false;
        }
        self.apply(volume.round() as u8, ctx);
        true
    }

    /// Raise or lower volume by one step, clamped to 0-100
    pub fn step(&mut self, up: bool, ctx: &mut ModuleContext<'_>) {
        let current = ctx.state().volume;
        let next = if up {
            current.saturating_add(VOLUME_STEP).min(100)
        } else {
            current.saturating_sub(VOLUME_STEP)
        };
        self.apply(next, ctx);
    }

    pub fn toggle_mute(&mut self, ctx: &mut ModuleContext<'_>) {
        let current = ctx.state().volume;
        if ctx.state().muted || current == 0 {
            let restore = self.previous.take().filter(|v| *v > 0).unwrap_or(DEFAULT_UNMUTE_VOLUME);
            self.apply(restore, ctx);
        } else {
            self.previous = Some(current);
            self.apply(0, ctx);
        }
    }

    fn apply(&mut self, volume: u8, ctx: &mut ModuleContext<'_>) {
        if let Some(mut engine) = ctx.engine() {
            engine.set_volume(f64::from(volume));
        }

        let state = ctx.state_mut();
        let changed = state.volume != volume;
        state.volume = volume;
        state.muted = volume == 0;
        state.storage.set_item(keys::VOLUME, volume, false);

        if changed {
            ctx.emit(PlayerEvent::VolumeChange { volume });
        }
    }
}

impl FeatureModule for VolumeControl {
    fn name(&self) -> ModuleName {
        ModuleName::Volume
    }

    fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()> {
        ctx.subscribe(EventKind::Ready);
        Ok(())
    }

    fn handle_event(&mut self, event: &PlayerEvent, ctx: &mut ModuleContext<'_>) -> Result<()> {
        if let PlayerEvent::Ready = event {
            if ctx.state().muted {
                self.previous = Some(DEFAULT_UNMUTE_VOLUME);
            }
        }
        Ok(())
    }

    fn destroy(&mut self, _ctx: &mut ModuleContext<'_>) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
