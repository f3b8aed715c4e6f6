//! Progress slider
//!
//! While the viewer drags the handle, position reports are ignored so the
//! handle does not jump back. Releasing seeks to the drop point and keeps
//! the slider frozen for a short grace period, until the engine has caught
//! up with the new position.

use crate::modules::{FeatureModule, ModuleContext};
use crate::player::{EventKind, ModuleName, PlayerEvent, SeekOrigin};
use crate::utils::error::Result;
use log::debug;
use std::any::Any;
use std::time::Duration;
use tokio::time::Instant;

/// How long the slider stays frozen after a drag ends
pub const UNFREEZE_DELAY: Duration = Duration::from_millis(200);

/// Highlighted part of the slider, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderRegion {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Default)]
pub struct ProgressSlider {
    /// Handle position in seconds
    position: f64,

    /// Slider maximum, the media duration
    max: f64,

    dragging: bool,
    frozen: bool,
    unfreeze_at: Option<Instant>,
    region: Option<SliderRegion>,
}

impl ProgressSlider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Start/end region, present while bounds apply
    pub fn region(&self) -> Option<SliderRegion> {
        self.region
    }

    pub fn begin_drag(&mut self, _ctx: &mut ModuleContext<'_>) {
        self.dragging = true;
        self.frozen = true;
        self.unfreeze_at = None;
    }

    /// Drop the handle at `time` and seek there
    pub fn end_drag(&mut self, time: f64, ctx: &mut ModuleContext<'_>) -> bool {
        if !self.dragging {
            debug!("Drag ended without a drag in progress");
        }
        self.dragging = false;
        self.position = time;
        self.unfreeze_at = Some(ctx.now() + UNFREEZE_DELAY);
        ctx.seek(time, SeekOrigin::Slider)
    }

    fn update_region(&mut self, ctx: &ModuleContext<'_>) {
        let bounds = ctx.state().bounds();
        self.region = if bounds.active && (bounds.start > 0.0 || bounds.end.is_some()) {
            Some(SliderRegion {
                start: bounds.start,
                end: bounds.end.unwrap_or(self.max),
            })
        } else {
            None
        };
    }
}

impl FeatureModule for ProgressSlider {
    fn name(&self) -> ModuleName {
        ModuleName::Progress
    }

    fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()> {
        ctx.subscribe_all(&[EventKind::Ready, EventKind::TimeUpdate, EventKind::Seek, EventKind::Ended]);
        self.max = ctx.state().duration.unwrap_or(0.0);
        self.update_region(ctx);
        Ok(())
    }

    fn handle_event(&mut self, event: &PlayerEvent, ctx: &mut ModuleContext<'_>) -> Result<()> {
        match event {
            PlayerEvent::Ready => {
                self.max = ctx.state().duration.unwrap_or(0.0);
                self.position = ctx.state().current_time;
            }
            PlayerEvent::TimeUpdate { time } | PlayerEvent::Seek { time, .. } => {
                if !self.frozen {
                    self.position = *time;
                }
            }
            PlayerEvent::Ended => {
                if !self.frozen {
                    self.position = self.max;
                }
            }
            _ => {}
        }
        self.update_region(ctx);
        Ok(())
    }

    fn on_tick(&mut self, now: Instant, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        if let Some(at) = self.unfreeze_at {
            if now >= at {
                self.frozen = false;
                self.unfreeze_at = None;
            }
        }
        Ok(())
    }

    fn destroy(&mut self, _ctx: &mut ModuleContext<'_>) {
        self.unfreeze_at = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
