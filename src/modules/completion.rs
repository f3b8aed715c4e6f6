//! Completion tracking
//!
//! Publishes `{completion: 1.0}` once the viewer has watched far enough
//! into the playable region, or when the media ends.

use crate::modules::{FeatureModule, ModuleContext, TaskOutcome};
use crate::player::{EventKind, ModuleName, PlayerEvent};
use crate::utils::error::{PlayerError, Result};
use log::{info, warn};
use std::any::Any;

#[derive(Debug, Default)]
pub struct CompletionModule {
    /// Position that counts as complete, known once the duration is
    threshold: Option<f64>,

    published: bool,
}

impl CompletionModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    fn compute_threshold(&mut self, ctx: &ModuleContext<'_>) {
        let state = ctx.state();
        let bounds = state.bounds();
        let Some(end) = bounds.end.or(state.duration) else {
            return;
        };
        let start = bounds.start;
        self.threshold = Some(start + (end - start) * state.config.completion_threshold());
    }

    fn publish(&mut self, ctx: &mut ModuleContext<'_>) {
        if self.published {
            return;
        }
        self.published = true;

        let Some(url) = ctx.state().config.publish_completion_url.clone() else {
            return;
        };
        info!("{}: marking complete", ctx.state().id);

        let api = ctx.services().api.clone();
        ctx.spawn(0, async move { TaskOutcome::Posted(api.publish_completion(&url, 1.0).await) });
    }
}

impl FeatureModule for CompletionModule {
    fn name(&self) -> ModuleName {
        ModuleName::Completion
    }

    fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()> {
        if ctx.state().config.publish_completion_url.is_none() {
            return Err(PlayerError::Config("Completion tracking needs publishCompletionUrl".to_string()));
        }

        ctx.subscribe_all(&[EventKind::Ready, EventKind::TimeUpdate, EventKind::Ended]);
        self.compute_threshold(ctx);
        Ok(())
    }

    fn handle_event(&mut self, event: &PlayerEvent, ctx: &mut ModuleContext<'_>) -> Result<()> {
        match event {
            PlayerEvent::Ready => self.compute_threshold(ctx),
            PlayerEvent::TimeUpdate { time } => {
                let position = ctx.state().unscaled_time(*time, ctx.scaled_time());
                if self.threshold.map_or(false, |t| position >= t) {
                    self.publish(ctx);
                }
            }
            PlayerEvent::Ended => self.publish(ctx),
            _ => {}
        }
        Ok(())
    }

    fn on_task_complete(&mut self, _token: u64, outcome: TaskOutcome, ctx: &mut ModuleContext<'_>) -> Result<()> {
        if let TaskOutcome::Posted(Err(e)) = outcome {
            warn!("{}: completion could not be published: {}", ctx.state().id, e);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{PlayerConfig, PlayerController};
    use std::time::Duration;

    fn config(json: &str) -> PlayerConfig {
        PlayerConfig::from_json(json).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_uses_region() {
        let player = PlayerController::builder()
            .with_config(config(
                r#"{"sources": ["a.mp4"], "duration": 100, "start": 10, "end": 50,
                    "completionEnabled": true, "publishCompletionUrl": "/complete",
                    "completionPercentage": 0.5}"#,
            ))
            .build("v1");
        assert_eq!(player.module::<CompletionModule>().unwrap().threshold(), Some(30.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_attached_without_url() {
        let player = PlayerController::builder()
            .with_config(config(r#"{"sources": ["a.mp4"], "completionEnabled": true}"#))
            .build("v1");
        assert!(player.module::<CompletionModule>().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_once_past_threshold() {
        let mut player = PlayerController::builder()
            .with_config(config(
                r#"{"sources": ["a.mp4"], "duration": 10,
                    "completionEnabled": true, "publishCompletionUrl": "/complete"}"#,
            ))
            .build("v1");
        player.play().unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        player.tick();
        assert!(!player.module::<CompletionModule>().unwrap().is_published());

        tokio::time::advance(Duration::from_millis(600)).await;
        player.tick();
        assert!(player.module::<CompletionModule>().unwrap().is_published());
    }
}
