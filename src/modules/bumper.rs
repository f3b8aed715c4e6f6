//! Pre-roll bumper
//!
//! When a bumper is configured and has not been shown yet, a reduced
//! nested player plays it in front of the main media. The sequencer swaps
//! to the main media when the bumper ends, fails, is skipped or runs past
//! [`MAX_BUMPER_DURATION`], then starts the main media.

use crate::modules::{FeatureModule, ModuleContext};
use crate::player::{keys, ModuleName, PlayerConfig, PlayerController, PlayerEvent, MAX_BUMPER_DURATION};
use crate::utils::error::Result;
use log::{debug, info, warn};
use std::any::Any;
use std::time::Duration;
use tokio::time::Instant;

/// Which player is in front
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumperPhase {
    BumperActive,
    MainActive,
}

#[derive(Debug)]
pub struct BumperSequencer {
    phase: BumperPhase,
    nested: Option<PlayerController>,

    /// When the bumper first started playing
    started_at: Option<Instant>,
}

impl Default for BumperSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl BumperSequencer {
    pub fn new() -> Self {
        Self {
            phase: BumperPhase::MainActive,
            nested: None,
            started_at: None,
        }
    }

    pub fn phase(&self) -> BumperPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == BumperPhase::BumperActive
    }

    /// The bumper's player while it is showing
    pub fn nested(&self) -> Option<&PlayerController> {
        self.nested.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_active() && self.nested.as_ref().map_or(false, |n| n.is_playing())
    }

    /// Play the bumper. Returns false when the main media is in front.
    pub fn play(&mut self) -> bool {
        let Some(nested) = self.nested.as_mut().filter(|_| self.phase == BumperPhase::BumperActive) else {
            return false;
        };

        if let Err(e) = nested.play() {
            warn!("Bumper could not play: {}", e);
        }
        self.started_at.get_or_insert_with(Instant::now);
        true
    }

    /// Pause the bumper. Returns false when the main media is in front.
    pub fn pause(&mut self) -> bool {
        let Some(nested) = self.nested.as_mut().filter(|_| self.phase == BumperPhase::BumperActive) else {
            return false;
        };

        if let Err(e) = nested.pause() {
            warn!("Bumper could not pause: {}", e);
        }
        true
    }

    /// Skip the bumper and start the main media
    pub fn skip(&mut self, do_not_show_again: bool, ctx: &mut ModuleContext<'_>) -> bool {
        if !self.is_active() {
            return false;
        }

        ctx.emit(PlayerEvent::Skip { do_not_show_again });
        self.finish(do_not_show_again, ctx);
        true
    }

    fn finish(&mut self, do_not_show_again: bool, ctx: &mut ModuleContext<'_>) {
        let storage = &ctx.state().storage;
        storage.set_item(keys::BUMPER_SHOWN, true, false);
        if do_not_show_again {
            storage.set_item(keys::BUMPER_DO_NOT_SHOW_AGAIN, true, false);
        }

        if let Some(mut nested) = self.nested.take() {
            nested.destroy();
        }
        self.phase = BumperPhase::MainActive;
        self.started_at = None;
        info!("{}: bumper done, starting main media", ctx.state().id);

        ctx.play();
    }

    fn bumper_config(ctx: &ModuleContext<'_>) -> Option<PlayerConfig> {
        let bumper = ctx.state().config.bumper.as_ref()?;
        let mut config = PlayerConfig {
            sources: bumper.sources.clone(),
            streams: bumper.streams.clone(),
            duration: bumper.duration,
            save_state_enabled: false,
            show_captions: false,
            ..Default::default()
        };
        config.normalize();
        Some(config)
    }
}

impl FeatureModule for BumperSequencer {
    fn name(&self) -> ModuleName {
        ModuleName::Bumper
    }

    fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()> {
        let Some(config) = Self::bumper_config(ctx) else {
            return Ok(());
        };

        let storage = &ctx.state().storage;
        let shown = storage.get::<bool>(keys::BUMPER_SHOWN, false).unwrap_or(false)
            || storage.get::<bool>(keys::BUMPER_DO_NOT_SHOW_AGAIN, false).unwrap_or(false);
        if shown {
            debug!("{}: bumper already shown", ctx.state().id);
            return Ok(());
        }

        let state = ctx.state();
        let nested = PlayerController::builder()
            .with_config(config)
            .with_services(ctx.services().clone())
            .with_storage(state.storage.area().clone())
            .with_namespace(state.storage.namespace())
            .touch_device(state.is_touch)
            .nested()
            .build(format!("{}-bumper", state.id));

        if nested.engine().is_none() {
            warn!("{}: bumper media unusable, showing main media", state.id);
            return Ok(());
        }

        info!("{}: showing bumper", state.id);
        self.nested = Some(nested);
        self.phase = BumperPhase::BumperActive;
        Ok(())
    }

    fn handle_event(&mut self, _event: &PlayerEvent, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_tick(&mut self, now: Instant, ctx: &mut ModuleContext<'_>) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let Some(nested) = self.nested.as_mut() else {
            return Ok(());
        };

        let events = nested.tick();
        let over = events
            .iter()
            .any(|e| matches!(e, PlayerEvent::Ended | PlayerEvent::Error { .. }));
        let timed_out = self
            .started_at
            .map_or(false, |at| now.duration_since(at) >= Duration::from_secs_f64(MAX_BUMPER_DURATION));

        if over || timed_out {
            debug!("Bumper finished (ended or failed: {}, timed out: {})", over, timed_out);
            self.finish(false, ctx);
        }
        Ok(())
    }

    fn destroy(&mut self, _ctx: &mut ModuleContext<'_>) {
        if let Some(mut nested) = self.nested.take() {
            nested.destroy();
        }
        self.phase = BumperPhase::MainActive;
    }

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
    use crate::modules::Services;
    use crate::storage::PreferenceArea;
    use std::sync::Arc;

    const CONFIG: &str = r#"{"sources": ["lecture.mp4"], "duration": 600,
        "bumper": {"sources": ["bumper.mp4"], "duration": 5}}"#;

    fn player(area: Arc<PreferenceArea>, json: &str) -> PlayerController {
        PlayerController::builder()
            .with_config(PlayerConfig::from_json(json).unwrap())
            .with_storage(area)
            .build("v1")
    }

    async fn advance_ticks(player: &mut PlayerController, ticks: usize) {
        for _ in 0..ticks {
            tokio::time::advance(Duration::from_millis(500)).await;
            player.tick();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_bumper_plays_first_then_main() {
        let area = PreferenceArea::in_memory();
        let mut player = player(area.clone(), CONFIG);
        assert_eq!(player.module::<BumperSequencer>().unwrap().phase(), BumperPhase::BumperActive);

        player.play().unwrap();
        assert!(player.is_playing());
        assert!(!player.state().is_playing());

        advance_ticks(&mut player, 12).await;

        let bumper = player.module::<BumperSequencer>().unwrap();
        assert_eq!(bumper.phase(), BumperPhase::MainActive);
        assert!(bumper.nested().is_none());
        assert!(player.state().is_playing());

        let again = self::player(area, CONFIG);
        assert_eq!(again.module::<BumperSequencer>().unwrap().phase(), BumperPhase::MainActive);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_records_do_not_show_again() {
        let area = PreferenceArea::in_memory();
        let mut player = player(area, CONFIG);
        player.play().unwrap();
        player.take_events();

        assert!(player.skip_bumper(true).unwrap());
        assert!(!player.skip_bumper(true).unwrap());

        let events = player.take_events();
        assert_eq!(events[0], PlayerEvent::Skip { do_not_show_again: true });
        assert!(events.contains(&PlayerEvent::Play));
        assert_eq!(
            player.state().storage.get::<bool>(keys::BUMPER_DO_NOT_SHOW_AGAIN, false),
            Some(true)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bumper_duration_is_capped() {
        let json = r#"{"sources": ["lecture.mp4"], "duration": 600,
            "bumper": {"sources": ["bumper.mp4"], "duration": 90}}"#;
        let mut player = player(PreferenceArea::in_memory(), json);
        player.play().unwrap();

        advance_ticks(&mut player, 68).await;
        assert!(player.module::<BumperSequencer>().unwrap().is_active());

        advance_ticks(&mut player, 3).await;
        assert!(!player.module::<BumperSequencer>().unwrap().is_active());
        assert!(player.state().is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bumper_takes_part_in_single_playback() {
        let services = Services::default();
        let mut other = PlayerController::builder()
            .with_config(PlayerConfig::from_json(r#"{"sources": ["other.mp4"], "duration": 60}"#).unwrap())
            .with_services(services.clone())
            .build("other");
        let mut player = PlayerController::builder()
            .with_config(PlayerConfig::from_json(CONFIG).unwrap())
            .with_services(services)
            .build("v1");

        other.play().unwrap();
        player.play().unwrap();
        assert!(player.is_playing());
        assert!(!other.is_playing());

        other.play().unwrap();
        assert!(!player.is_playing());

        assert!(player.skip_bumper(false).unwrap());
        assert!(player.state().is_playing());
        assert!(!other.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unusable_bumper_is_skipped() {
        let json = r#"{"sources": ["lecture.mp4"], "bumper": {"sources": []}}"#;
        let player = player(PreferenceArea::in_memory(), json);
        let bumper = player.module::<BumperSequencer>().unwrap();
        assert_eq!(bumper.phase(), BumperPhase::MainActive);
        assert!(!player.is_playing());
    }
}
