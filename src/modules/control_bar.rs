//! Play/pause control and elapsed-time display

use crate::modules::{FeatureModule, ModuleContext};
use crate::player::{EventKind, ModuleName, PlayerEvent};
use crate::utils::error::Result;
use crate::utils::format_duration;
use std::any::Any;

/// Tracks what the control bar shows: play or pause, whether the bar is
/// visible and the `elapsed / total` time readout
#[derive(Debug, Default)]
pub struct ControlBar {
    playing: bool,
    visible: bool,
    started: bool,
    time_label: String,
}

impl ControlBar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the button shows "pause"
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Touch devices hide the controls until playback first starts
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Elapsed and total time, e.g. `1:05 / 12:00`
    pub fn time_label(&self) -> &str {
        &self.time_label
    }

    fn update_time(&mut self, time: f64, duration: Option<f64>) {
        self.time_label = format!("{} / {}", format_duration(time), format_duration(duration.unwrap_or(0.0)));
    }
}

impl FeatureModule for ControlBar {
    fn name(&self) -> ModuleName {
        ModuleName::ControlBar
    }

    fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()> {
        ctx.subscribe_all(&[
            EventKind::Ready,
            EventKind::Play,
            EventKind::Pause,
            EventKind::Ended,
            EventKind::TimeUpdate,
            EventKind::Seek,
        ]);

        self.visible = !ctx.state().is_touch;
        let state = ctx.state();
        self.update_time(state.current_time, state.duration);
        Ok(())
    }

    fn handle_event(&mut self, event: &PlayerEvent, ctx: &mut ModuleContext<'_>) -> Result<()> {
        match event {
            PlayerEvent::Play => {
                self.playing = true;
                if !self.started {
                    self.started = true;
                    self.visible = true;
                }
            }
            PlayerEvent::Pause | PlayerEvent::Ended => self.playing = false,
            PlayerEvent::Ready | PlayerEvent::TimeUpdate { .. } | PlayerEvent::Seek { .. } => {
                let state = ctx.state();
                self.update_time(state.current_time, state.duration);
            }
            _ => {}
        }
        Ok(())
    }

    fn destroy(&mut self, _ctx: &mut ModuleContext<'_>) {
        self.playing = false;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
