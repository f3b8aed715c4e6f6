//! Analytics events
//!
//! Translates player events into the host's tracking vocabulary and hands
//! them to an [`AnalyticsSink`].

use crate::modules::{FeatureModule, ModuleContext};
use crate::player::{EventKind, ModuleName, PlaybackMode, PlayerEvent, SeekOrigin};
use crate::utils::error::Result;
use log::info;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::any::Any;

/// Receives tracking events
pub trait AnalyticsSink: Send + Sync {
    fn emit(&self, name: &str, data: Value);
}

/// Writes tracking events to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl AnalyticsSink for LogSink {
    fn emit(&self, name: &str, data: Value) {
        info!(target: "lectern::analytics", "{} {}", name, data);
    }
}

/// Keeps tracking events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(String, Value)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AnalyticsSink for MemorySink {
    fn emit(&self, name: &str, data: Value) {
        self.events.lock().push((name.to_string(), data));
    }
}

#[derive(Debug, Default)]
pub struct AnalyticsModule {
    /// `html5` or the provider video id
    code: String,
}

impl AnalyticsModule {
    pub fn new() -> Self {
        Self::default()
    }

    fn send(&self, name: &str, extra: Value, ctx: &ModuleContext<'_>) {
        let mut data = Map::new();
        data.insert("id".to_string(), Value::String(ctx.state().id.clone()));
        data.insert("code".to_string(), Value::String(self.code.clone()));
        if let Value::Object(extra) = extra {
            data.extend(extra);
        }
        ctx.services().analytics.emit(name, Value::Object(data));
    }
}

impl FeatureModule for AnalyticsModule {
    fn name(&self) -> ModuleName {
        ModuleName::Analytics
    }

    fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()> {
        let state = ctx.state();
        self.code = match state.playback_mode {
            Some(PlaybackMode::ExternalProvider) => state.config.provider_id().unwrap_or_default(),
            _ => "html5".to_string(),
        };

        ctx.subscribe_all(&[
            EventKind::Ready,
            EventKind::Play,
            EventKind::Pause,
            EventKind::Ended,
            EventKind::Seek,
            EventKind::SpeedChange,
            EventKind::Skip,
            EventKind::LanguageChange,
            EventKind::LanguageMenuShow,
            EventKind::LanguageMenuHide,
            EventKind::CaptionsShow,
            EventKind::CaptionsHide,
        ]);
        Ok(())
    }

    fn handle_event(&mut self, event: &PlayerEvent, ctx: &mut ModuleContext<'_>) -> Result<()> {
        let time = ctx.state().current_time;

        match event {
            PlayerEvent::Ready => self.send("load_video", json!({}), ctx),
            PlayerEvent::Play => self.send("play_video", json!({ "currentTime": time }), ctx),
            PlayerEvent::Pause => self.send("pause_video", json!({ "currentTime": time }), ctx),
            PlayerEvent::Ended => self.send("stop_video", json!({ "currentTime": time }), ctx),
            PlayerEvent::Seek { origin: SeekOrigin::Resume, .. } => {}
            PlayerEvent::Seek { time, previous, origin } => self.send(
                "seek_video",
                json!({ "old_time": previous, "new_time": time, "type": origin.as_str() }),
                ctx,
            ),
            PlayerEvent::SpeedChange { speed, previous } => self.send(
                "speed_change_video",
                json!({ "current_time": time, "old_speed": previous.to_string(), "new_speed": speed.to_string() }),
                ctx,
            ),
            PlayerEvent::Skip { do_not_show_again } => {
                let name = if *do_not_show_again {
                    "do_not_show_again_video"
                } else {
                    "skip_video"
                };
                self.send(name, json!({ "currentTime": time }), ctx);
            }
            PlayerEvent::LanguageChange { language } => {
                self.send("video_language_change", json!({ "language": language }), ctx)
            }
            PlayerEvent::LanguageMenu { shown } => {
                let name = if *shown {
                    "edx.video.language_menu.shown"
                } else {
                    "edx.video.language_menu.hidden"
                };
                let language = ctx.state().language.clone();
                self.send(name, json!({ "language": language }), ctx);
            }
            PlayerEvent::Captions { shown } => {
                let name = if *shown {
                    "edx.video.closed_captions.shown"
                } else {
                    "edx.video.closed_captions.hidden"
                };
                self.send(name, json!({ "current_time": time }), ctx);
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
