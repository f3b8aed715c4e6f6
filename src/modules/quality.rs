//! HD/SD toggle for the external provider

use crate::modules::{FeatureModule, ModuleContext};
use crate::player::{EventKind, ModuleName, PlayerEvent};
use crate::utils::error::Result;
use log::debug;
use std::any::Any;

/// Provider quality levels that count as HD
const HD_LEVELS: [&str; 3] = ["highres", "hd1080", "hd720"];

/// Level requested when switching to HD
const HD_REQUEST: &str = "hd720";

/// Level requested when switching back to SD
const SD_REQUEST: &str = "large";

pub fn is_hd(quality: &str) -> bool {
    HD_LEVELS.contains(&quality)
}

#[derive(Debug, Default)]
pub struct QualityControl {
    quality: Option<String>,
}

impl QualityControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quality(&self) -> Option<&str> {
        self.quality.as_deref()
    }

    pub fn is_hd(&self) -> bool {
        self.quality.as_deref().map_or(false, is_hd)
    }

    /// Ask the provider for the other quality class. Returns whether the
    /// provider accepted the request.
    pub fn toggle(&mut self, ctx: &mut ModuleContext<'_>) -> bool {
        let target = if self.is_hd() { SD_REQUEST } else { HD_REQUEST };
        let Some(mut engine) = ctx.engine() else {
            return false;
        };

        debug!("Requesting quality {}", target);
        engine.set_quality(target)
    }
}

impl FeatureModule for QualityControl {
    fn name(&self) -> ModuleName {
        ModuleName::Quality
    }

    fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()> {
        ctx.subscribe_all(&[EventKind::Ready, EventKind::QualityChange]);
        Ok(())
    }

    fn handle_event(&mut self, event: &PlayerEvent, ctx: &mut ModuleContext<'_>) -> Result<()> {
        match event {
            PlayerEvent::Ready => {
                self.quality = ctx.engine().and_then(|e| e.quality());
            }
            PlayerEvent::QualityChange { quality } => {
                self.quality = Some(quality.clone());
            }
            _ => {}
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
