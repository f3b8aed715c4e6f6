//! Integration tests for the external provider backend
//!
//! These tests drive a player through a scripted provider SDK and verify
//! engine selection, provider speeds and quality toggling, fallback to
//! native media and SDK teardown.

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver};
use lectern::engine::{ProviderCallback, ProviderSdk, ProviderSdkFactory};
use lectern::modules::{CaptionsModule, CompletionModule, QualityControl, Services, SpeedControl};
use lectern::{EngineFactory, PlaybackMode, PlaybackState, PlayerController, PlayerEvent};
use lectern_integration_tests::provider::FakeProviderFactory;
use lectern_integration_tests::{config, transcript, RecordingApi, RecordingHandler};
use mockall::mock;
use std::sync::Arc;

const PROVIDER: &str = r#"{"sources": ["lecture.mp4"], "streams": "1.00:dQw4w9WgXcQ"}"#;

fn services(factory: Arc<dyn ProviderSdkFactory>) -> Services {
    Services {
        engines: EngineFactory::default().with_provider(factory),
        ..Services::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_provider_ready_uses_provider_speeds() -> Result<()> {
    let (factory, sdk) = FakeProviderFactory::new();
    let handler = RecordingHandler::new();
    let mut player = PlayerController::builder()
        .with_config(config(PROVIDER))
        .with_services(services(factory))
        .with_event_handler(handler.boxed())
        .build("provider");

    assert_eq!(player.state().playback_mode, Some(PlaybackMode::ExternalProvider));
    assert_eq!(player.state().youtube_is_available, Some(true));
    assert_eq!(player.state().playback_state, PlaybackState::Unstarted);

    sdk.send(ProviderCallback::Ready);
    player.pump();

    assert_eq!(player.state().playback_state, PlaybackState::Paused);
    assert_eq!(player.state().duration, Some(120.0));
    let speeds: Vec<String> = player
        .module::<SpeedControl>()
        .expect("speed attached")
        .speeds()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(speeds, vec!["0.50", "1.0", "1.50", "2.0"]);

    player.play()?;
    assert!(player.state().is_playing());
    assert_eq!(handler.count(&PlayerEvent::Play), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_quality_toggle_round_trip() -> Result<()> {
    let (factory, sdk) = FakeProviderFactory::new();
    let mut player = PlayerController::builder()
        .with_config(config(PROVIDER))
        .with_services(services(factory))
        .build("provider");
    sdk.send(ProviderCallback::Ready);
    player.pump();

    assert!(!player.module::<QualityControl>().expect("quality attached").is_hd());

    assert!(player.toggle_quality()?);
    assert_eq!(sdk.status().quality, "hd720");
    assert!(player.module::<QualityControl>().expect("quality attached").is_hd());

    assert!(player.toggle_quality()?);
    assert_eq!(sdk.status().quality, "large");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_provider_time_updates_while_playing() -> Result<()> {
    let (factory, sdk) = FakeProviderFactory::new();
    let mut player = PlayerController::builder()
        .with_config(config(PROVIDER))
        .with_services(services(factory))
        .build("provider");
    sdk.send(ProviderCallback::Ready);
    player.pump();
    player.play()?;

    sdk.set_time(12.5);
    let events = player.tick();
    assert!(events.contains(&PlayerEvent::TimeUpdate { time: 12.5 }));
    assert_eq!(player.state().current_time, 12.5);

    sdk.send(ProviderCallback::StateChange(0));
    player.pump();
    assert_eq!(player.state().playback_state, PlaybackState::Ended);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_provider_falls_back_to_native() {
    let player = PlayerController::builder()
        .with_config(config(PROVIDER))
        .with_services(services(FakeProviderFactory::unavailable()))
        .build("fallback");

    assert_eq!(player.state().playback_mode, Some(PlaybackMode::NativeMedia));
    assert_eq!(player.state().youtube_is_available, Some(false));
    assert!(player.module::<QualityControl>().is_none());
    assert_eq!(player.state().playback_state, PlaybackState::Paused);
}

const SCALED_CAPTIONED: &str = r#"{"sources": ["lecture.mp4"], "streams": "1.00:dQw4w9WgXcQ",
    "transcriptUrl": "/transcript/translation",
    "transcriptLanguages": {"en": "English"}}"#;

#[tokio::test(start_paused = true)]
async fn test_scaled_time_at_double_speed() -> Result<()> {
    let (factory, sdk) = FakeProviderFactory::scaled();
    let api = RecordingApi::new().with_transcript("/transcript/translation/en", transcript(30));
    let mut player = PlayerController::builder()
        .with_config(config(SCALED_CAPTIONED))
        .with_services(services(factory))
        .with_api(api)
        .build("scaled");
    sdk.send(ProviderCallback::Ready);
    player.settle().await;

    assert!(player.engine().expect("engine").reports_scaled_time());
    assert!(player.set_speed("2.0")?);
    player.play()?;

    // 3s of scaled time is 6s into the media
    sdk.set_time(3.0);
    player.tick();
    let captions = player.module::<CaptionsModule>().expect("captions attached");
    assert_eq!(captions.current_text(), Some("cue 3"));

    // Cue 5 starts 10s into the media, 5s of scaled time
    assert!(player.seek_to_caption(5)?);
    assert_eq!(sdk.status().time, 5.0);
    assert_eq!(player.state().current_time, 5.0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_scaled_end_bound_at_double_speed() -> Result<()> {
    let (factory, sdk) = FakeProviderFactory::scaled();
    let mut player = PlayerController::builder()
        .with_config(config(r#"{"streams": "1.00:dQw4w9WgXcQ", "end": 10}"#))
        .with_services(services(factory))
        .build("scaled-clip");
    sdk.send(ProviderCallback::Ready);
    player.pump();
    assert!(player.set_speed("2.0")?);
    player.play()?;

    sdk.set_time(4.0);
    player.tick();
    assert!(player.state().is_playing());

    sdk.set_time(5.0);
    player.tick();
    player.pump();
    assert_eq!(player.state().playback_state, PlaybackState::Paused);
    assert!(sdk.status().calls.contains(&"pauseVideo".to_string()));
    assert!(!player.state().bounds().active);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_scaled_completion_threshold() -> Result<()> {
    let (factory, sdk) = FakeProviderFactory::scaled();
    let api = RecordingApi::new();
    let mut player = PlayerController::builder()
        .with_config(config(
            r#"{"streams": "1.00:dQw4w9WgXcQ", "completionEnabled": true,
                "publishCompletionUrl": "/complete", "completionPercentage": 0.5}"#,
        ))
        .with_services(services(factory))
        .with_api(api.clone())
        .build("scaled-complete");
    sdk.send(ProviderCallback::Ready);
    player.pump();
    assert!(player.set_speed("2.0")?);
    player.play()?;

    // Threshold is 60s of media; 25s scaled is 50s
    sdk.set_time(25.0);
    player.tick();
    assert!(!player.module::<CompletionModule>().expect("completion attached").is_published());

    sdk.set_time(30.0);
    player.tick();
    player.settle().await;
    assert!(player.module::<CompletionModule>().expect("completion attached").is_published());
    assert_eq!(api.completions(), vec![("/complete".to_string(), 1.0)]);
    Ok(())
}

mock! {
    Sdk {}

    impl ProviderSdk for Sdk {
        fn play_video(&mut self);
        fn pause_video(&mut self);
        fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool);
        fn set_volume(&mut self, volume: u8);
        fn get_volume(&self) -> u8;
        fn set_playback_rate(&mut self, rate: f64);
        fn get_playback_rate(&self) -> f64;
        fn get_available_playback_rates(&self) -> Vec<f64>;
        fn get_current_time(&self) -> f64;
        fn get_duration(&self) -> f64;
        fn get_player_state(&self) -> i32;
        fn set_playback_quality(&mut self, quality: &str);
        fn get_playback_quality(&self) -> String;
        fn get_available_quality_levels(&self) -> Vec<String>;
        fn destroy(&mut self);
    }
}

struct MockFactory(parking_lot::Mutex<Option<MockSdk>>);

impl ProviderSdkFactory for MockFactory {
    fn create(&self, video_id: &str) -> lectern::Result<(Box<dyn ProviderSdk>, Receiver<ProviderCallback>)> {
        let sdk = self
            .0
            .lock()
            .take()
            .ok_or_else(|| lectern::PlayerError::Engine(format!("SDK already used for {}", video_id)))?;
        let (_tx, rx) = unbounded();
        Ok((Box::new(sdk), rx))
    }
}

#[tokio::test(start_paused = true)]
async fn test_play_before_ready_and_destroy_once() -> Result<()> {
    let mut sdk = MockSdk::new();
    sdk.expect_get_volume().return_const(100u8);
    sdk.expect_get_playback_rate().return_const(1.0);
    sdk.expect_get_available_playback_rates().returning(|| vec![1.0]);
    sdk.expect_get_current_time().return_const(0.0);
    sdk.expect_get_duration().return_const(60.0);
    sdk.expect_get_player_state().return_const(-1);
    sdk.expect_get_playback_quality().returning(String::new);
    sdk.expect_get_available_quality_levels().returning(Vec::new);
    sdk.expect_play_video().times(0);
    sdk.expect_destroy().times(1).return_const(());

    let factory = Arc::new(MockFactory(parking_lot::Mutex::new(Some(sdk))));
    let mut player = PlayerController::builder()
        .with_config(config(PROVIDER))
        .with_services(services(factory))
        .build("mocked");

    // The provider never became ready, so play is not forwarded
    player.play()?;
    assert_eq!(player.state().playback_state, PlaybackState::Unstarted);
    player.destroy();
    player.destroy();
    drop(player);
    Ok(())
}
