//! Playback speed menu

use crate::collections::IndexedRing;
use crate::modules::{FeatureModule, ModuleContext};
use crate::player::{keys, EventKind, ModuleName, PlaybackMode, PlayerEvent, Speed};
use crate::utils::error::Result;
use log::{debug, info};
use std::any::Any;

/// Speed menu state. The ring mirrors `PlayerState::speeds` with the
/// cursor on the active speed.
#[derive(Debug, Default)]
pub struct SpeedControl {
    ring: IndexedRing<Speed>,
}

impl SpeedControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speeds(&self) -> &[Speed] {
        self.ring.items()
    }

    pub fn current(&self) -> Option<Speed> {
        self.ring.current().copied()
    }

    /// Switch to the supported speed closest to `requested`.
    ///
    /// With `persist` the choice is stored for this video and as the
    /// general default. Returns whether the speed changed.
    pub fn set_speed(&mut self, requested: Speed, persist: bool, ctx: &mut ModuleContext<'_>) -> bool {
        let Some(speed) = Speed::snap(&ctx.state().speeds, requested) else {
            debug!("No speeds configured, ignoring {}", requested);
            return false;
        };

        if let Some(index) = self.ring.position(|s| *s == speed) {
            self.ring.set_index(index as i64);
        }

        if let Some(mut engine) = ctx.engine() {
            engine.set_playback_rate(speed.as_f64());
        }

        let state = ctx.state_mut();
        let previous = state.speed;
        state.speed = speed;

        if persist {
            let value = speed.to_string();
            state.storage.set_item(keys::SPEED, value.clone(), true);
            state.storage.set_item(keys::GENERAL_SPEED, value, false);
        }

        if speed == previous {
            return false;
        }

        info!("{}: speed {} -> {}", state.id, previous, speed);
        ctx.emit(PlayerEvent::SpeedChange { speed, previous });
        true
    }

    /// Select the next speed, wrapping to the slowest after the fastest
    pub fn cycle(&mut self, ctx: &mut ModuleContext<'_>) -> bool {
        match self.ring.next().copied() {
            Some(next) => self.set_speed(next, true, ctx),
            None => false,
        }
    }

    fn sync_ring(&mut self, ctx: &ModuleContext<'_>) {
        let state = ctx.state();
        self.ring.replace(state.speeds.clone());
        if let Some(index) = self.ring.position(|s| *s == state.speed) {
            self.ring.set_index(index as i64);
        }
    }
}

impl FeatureModule for SpeedControl {
    fn name(&self) -> ModuleName {
        ModuleName::Speed
    }

    fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()> {
        ctx.subscribe(EventKind::Ready);
        self.sync_ring(ctx);
        Ok(())
    }

    fn handle_event(&mut self, event: &PlayerEvent, ctx: &mut ModuleContext<'_>) -> Result<()> {
        if !matches!(event, PlayerEvent::Ready) || ctx.state().playback_mode != Some(PlaybackMode::ExternalProvider) {
            return Ok(());
        }

        let rates = ctx.engine().map(|e| e.available_playback_rates()).unwrap_or_default();
        let mut speeds: Vec<Speed> = rates.into_iter().filter_map(Speed::from_f64).collect();
        speeds.sort();
        speeds.dedup();
        if speeds.is_empty() {
            return Ok(());
        }

        debug!("Provider speeds: {:?}", speeds);
        ctx.state_mut().speeds = speeds;
        self.sync_ring(ctx);

        let current = ctx.state().speed;
        self.set_speed(current, false, ctx);
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
