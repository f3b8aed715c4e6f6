//! Integration tests for a single Lectern player
//!
//! These tests verify the complete player functionality including:
//! - Preferences surviving a restart
//! - Captions following playback
//! - Save-state and completion traffic to the host
//! - Resource cleanup

use anyhow::Result;
use lectern::modules::{CaptionsModule, CompletionModule};
use lectern::{PlaybackState, PlayerController, PlayerEvent, SeekOrigin};
use lectern_integration_tests::{config, transcript, RecordingApi, RecordingHandler, TestFixture};
use once_cell::sync::Lazy;
use std::time::Duration;

static CAPTIONED: Lazy<String> = Lazy::new(|| {
    r#"{"sources": ["lecture.mp4"], "duration": 60,
        "transcriptUrl": "/transcript/translation",
        "transcriptAvailableTranslationsUrl": "/transcript/available_translations",
        "transcriptLanguages": {"en": "English", "de": "Deutsch"}}"#
        .to_string()
});

async fn play_for(player: &mut PlayerController, millis: u64) {
    for _ in 0..millis / 250 {
        tokio::time::advance(Duration::from_millis(250)).await;
        player.tick();
    }
}

#[tokio::test(start_paused = true)]
async fn test_player_initialization() -> Result<()> {
    let handler = RecordingHandler::new();
    let player = PlayerController::builder()
        .with_config(config(r#"{"sources": ["lecture.mp4"], "duration": 60}"#))
        .with_event_handler(handler.boxed())
        .build("intro");

    assert_eq!(player.state().playback_state, PlaybackState::Paused);
    assert_eq!(player.state().duration, Some(60.0));
    assert_eq!(handler.events(), vec![PlayerEvent::Ready]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_preferences_survive_restart() -> Result<()> {
    let fixture = TestFixture::new()?;
    let json = r#"{"sources": ["lecture.mp4"], "duration": 600}"#;

    {
        let mut player = PlayerController::builder()
            .with_config(config(json))
            .with_storage(fixture.area()?)
            .build("lecture-1");
        player.play()?;
        player.set_speed("1.50")?;
        player.set_volume(40.0)?;
        player.seek(30.0, SeekOrigin::Keyboard)?;
        player.pause()?;
    }
    assert!(fixture.preferences.exists());

    let player = PlayerController::builder()
        .with_config(config(json))
        .with_storage(fixture.area()?)
        .build("lecture-1");

    assert_eq!(player.state().speed.to_string(), "1.50");
    assert_eq!(player.state().volume, 40);
    assert_eq!(player.state().resume_position(), 30.0);
    assert_eq!(player.state().current_time, 30.0);

    // Speed is also remembered across videos, position is not
    let other = PlayerController::builder()
        .with_config(config(json))
        .with_storage(fixture.area()?)
        .build("lecture-2");
    assert_eq!(other.state().speed.to_string(), "1.50");
    assert_eq!(other.state().resume_position(), 0.0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_captions_follow_playback() -> Result<()> {
    let api = RecordingApi::new().with_transcript("/transcript/translation/en", transcript(30));
    let mut player = PlayerController::builder()
        .with_config(config(&CAPTIONED))
        .with_api(api.clone())
        .build("captioned");
    player.settle().await;

    let captions = player.module::<CaptionsModule>().expect("captions attached");
    assert!(captions.is_available());
    assert_eq!(captions.language(), Some("en"));

    player.play()?;
    play_for(&mut player, 5000).await;

    let captions = player.module::<CaptionsModule>().expect("captions attached");
    assert_eq!(captions.current_text(), Some("cue 2"));
    assert_eq!(api.transcript_requests()[0].0, "/transcript/translation/en");

    assert!(player.seek_to_caption(10)?);
    assert_eq!(player.state().current_time, 20.0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_missing_transcript_falls_back_to_translation() -> Result<()> {
    let api = RecordingApi::new()
        .with_transcript("/transcript/translation/de", transcript(5))
        .with_translations(&["de"]);
    let mut player = PlayerController::builder()
        .with_config(config(&CAPTIONED))
        .with_api(api.clone())
        .build("fallback");
    player.settle().await;

    let captions = player.module::<CaptionsModule>().expect("captions attached");
    assert!(captions.is_available());
    assert_eq!(captions.language(), Some("de"));
    assert_eq!(captions.languages().len(), 1);
    assert_eq!(player.state().language.as_deref(), Some("de"));

    let requested: Vec<String> = api.transcript_requests().into_iter().map(|(url, _)| url).collect();
    assert_eq!(requested, vec!["/transcript/translation/en", "/transcript/translation/de"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unload_posts_final_state() -> Result<()> {
    let api = RecordingApi::new();
    let mut player = PlayerController::builder()
        .with_config(config(
            r#"{"sources": ["lecture.mp4"], "duration": 600, "saveStateUrl": "/handler/save_user_state"}"#,
        ))
        .with_api(api.clone())
        .build("lecture");

    player.play()?;
    player.seek(42.0, SeekOrigin::Slider)?;
    player.unload().await;

    assert!(player.is_destroyed());
    let saves = api.saves();
    let (url, payload) = saves.last().expect("final save-state");
    assert_eq!(url, "/handler/save_user_state");
    assert_eq!(payload.saved_video_position.as_deref(), Some("00:00:42"));

    // Destroyed players refuse work
    assert!(player.play().is_err());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_completion_published_once() -> Result<()> {
    let api = RecordingApi::new();
    let handler = RecordingHandler::new();
    let mut player = PlayerController::builder()
        .with_config(config(
            r#"{"sources": ["lecture.mp4"], "duration": 10,
                "completionEnabled": true, "publishCompletionUrl": "/complete"}"#,
        ))
        .with_api(api.clone())
        .with_event_handler(handler.boxed())
        .build("short");

    player.play()?;
    play_for(&mut player, 11_000).await;
    player.settle().await;

    assert_eq!(handler.count(&PlayerEvent::Ended), 1);
    assert_eq!(player.state().playback_state, PlaybackState::Ended);
    assert!(player.module::<CompletionModule>().expect("completion attached").is_published());
    assert_eq!(api.completions(), vec![("/complete".to_string(), 1.0)]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_region_end_pauses_once() -> Result<()> {
    let handler = RecordingHandler::new();
    let mut player = PlayerController::builder()
        .with_config(config(r#"{"sources": ["lecture.mp4"], "duration": 60, "start": 5, "end": 8}"#))
        .with_event_handler(handler.boxed())
        .build("clip");

    assert_eq!(player.state().current_time, 5.0);
    player.play()?;
    play_for(&mut player, 4000).await;

    assert_eq!(player.state().playback_state, PlaybackState::Paused);
    assert_eq!(handler.count(&PlayerEvent::Pause), 1);

    // The region no longer applies once it has been reached
    player.play()?;
    play_for(&mut player, 2000).await;
    assert!(player.state().is_playing());
    assert!(player.state().current_time > 8.0);
    Ok(())
}
