//! Persists the viewer's position and choices
//!
//! Positions go to the local preference store and, when a save-state URL
//! is configured, to the host. Host POSTs run in the background and are
//! never retried. On unload the final POST is awaited by the controller.

use crate::api::SaveStatePayload;
use crate::modules::{FeatureModule, ModuleContext, TaskOutcome};
use crate::player::{keys, EventKind, ModuleName, PlayerEvent};
use crate::utils::error::Result;
use crate::utils::format_full;
use log::{debug, warn};
use std::any::Any;

#[derive(Debug, Default)]
pub struct SaveStateModule {
    /// Provider availability already reported
    availability_reported: bool,

    next_token: u64,
    posts_sent: usize,
}

impl SaveStateModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// POSTs started so far
    pub fn posts_sent(&self) -> usize {
        self.posts_sent
    }

    /// Store the current position and build the final POST, if the host
    /// wants one
    pub fn prepare_unload(&mut self, ctx: &mut ModuleContext<'_>) -> Option<(String, SaveStatePayload)> {
        let position = ctx.state().current_time;
        let payload = self.store_position(position, ctx);
        let url = Self::endpoint(ctx)?;
        self.posts_sent += 1;
        Some((url, payload))
    }

    fn store_position(&self, position: f64, ctx: &mut ModuleContext<'_>) -> SaveStatePayload {
        ctx.state_mut().storage.set_item(keys::SAVED_POSITION, position, true);
        SaveStatePayload {
            saved_video_position: Some(format_full(position)),
            ..Default::default()
        }
    }

    fn endpoint(ctx: &ModuleContext<'_>) -> Option<String> {
        let config = &ctx.state().config;
        if !config.save_state_enabled {
            return None;
        }
        config.save_state_url.clone()
    }

    fn post(&mut self, payload: SaveStatePayload, ctx: &mut ModuleContext<'_>) {
        let Some(url) = Self::endpoint(ctx) else {
            debug!("No save-state endpoint, keeping {:?} local", payload);
            return;
        };

        self.next_token += 1;
        self.posts_sent += 1;
        let api = ctx.services().api.clone();
        ctx.spawn(self.next_token, async move {
            TaskOutcome::Posted(api.save_state(&url, &payload).await)
        });
    }
}

impl FeatureModule for SaveStateModule {
    fn name(&self) -> ModuleName {
        ModuleName::SaveState
    }

    fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()> {
        ctx.subscribe_all(&[
            EventKind::Play,
            EventKind::Pause,
            EventKind::Ended,
            EventKind::SpeedChange,
            EventKind::LanguageChange,
        ]);
        Ok(())
    }

    fn handle_event(&mut self, event: &PlayerEvent, ctx: &mut ModuleContext<'_>) -> Result<()> {
        let payload = match event {
            PlayerEvent::Play => {
                if self.availability_reported {
                    return Ok(());
                }
                self.availability_reported = true;

                let state = ctx.state();
                match state.youtube_is_available {
                    Some(available) if available != state.config.recorded_youtube_is_available => SaveStatePayload {
                        youtube_is_available: Some(available),
                        ..Default::default()
                    },
                    _ => return Ok(()),
                }
            }
            PlayerEvent::Pause => {
                let position = ctx.state().current_time;
                self.store_position(position, ctx)
            }
            PlayerEvent::Ended => {
                let start = ctx.state().bounds().start;
                self.store_position(start, ctx)
            }
            PlayerEvent::SpeedChange { speed, .. } => SaveStatePayload {
                speed: Some(speed.to_string()),
                ..Default::default()
            },
            PlayerEvent::LanguageChange { language } => SaveStatePayload {
                transcript_language: Some(language.clone()),
                ..Default::default()
            },
            _ => return Ok(()),
        };

        self.post(payload, ctx);
        Ok(())
    }

    fn on_task_complete(&mut self, _token: u64, outcome: TaskOutcome, ctx: &mut ModuleContext<'_>) -> Result<()> {
        if let TaskOutcome::Posted(Err(e)) = outcome {
            warn!("{}: save-state failed: {}", ctx.state().id, e);
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
