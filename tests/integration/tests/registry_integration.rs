//! Integration tests for mounting several players
//!
//! These tests verify:
//! - Only one mounted player plays at a time
//! - Replacing a slot tears the old player down
//! - Unloading every player flushes their state to the host

use anyhow::Result;
use lectern::modules::{MemorySink, Services};
use lectern::{PlaybackState, PlayerEvent, PlayerRegistry, PreferenceArea};
use lectern_integration_tests::{config, RecordingApi, RecordingHandler};
use std::sync::Arc;

const LECTURE: &str = r#"{"sources": ["lecture.mp4"], "duration": 300, "saveStateUrl": "/save"}"#;

fn registry(api: Arc<RecordingApi>, sink: Arc<MemorySink>) -> PlayerRegistry {
    let services = Services {
        api,
        analytics: sink,
        ..Services::default()
    };
    PlayerRegistry::new(services, PreferenceArea::in_memory())
}

#[tokio::test(start_paused = true)]
async fn test_second_mount_pauses_first_before_ready() -> Result<()> {
    let sink = Arc::new(MemorySink::new());
    let mut registry = registry(RecordingApi::new(), sink.clone());

    let first = RecordingHandler::new();
    registry.mount("unit-1", "video-a", config(LECTURE)).add_event_handler(first.boxed());
    registry.play("unit-1")?;
    sink.clear();

    registry.mount("unit-2", "video-b", config(LECTURE));

    assert_eq!(first.count(&PlayerEvent::Pause), 1);
    let order: Vec<(String, String)> = sink
        .events()
        .into_iter()
        .map(|(name, data)| (data["id"].as_str().unwrap_or_default().to_string(), name))
        .collect();
    assert_eq!(
        order,
        vec![
            ("video-a".to_string(), "pause_video".to_string()),
            ("video-b".to_string(), "load_video".to_string()),
        ]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_player_started_directly_pauses_the_active_one() -> Result<()> {
    let mut registry = registry(RecordingApi::new(), Arc::new(MemorySink::new()));
    let left = RecordingHandler::new();
    registry.mount("left", "video-a", config(LECTURE)).add_event_handler(left.boxed());
    registry.mount("right", "video-b", config(LECTURE));

    registry.play("left")?;
    registry.get_mut("right").expect("mounted").play()?;

    assert!(!registry.get("left").expect("mounted").is_playing());
    assert!(registry.get("right").expect("mounted").is_playing());
    assert_eq!(registry.active_slot(), Some("right"));

    let events = registry.pump();
    assert!(events.contains(&("left".to_string(), PlayerEvent::Pause)));
    assert_eq!(left.count(&PlayerEvent::Pause), 1);
    assert_eq!(
        registry.get("left").expect("mounted").state().playback_state,
        PlaybackState::Paused
    );
    assert!(registry.get("right").expect("mounted").state().is_playing());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_left_never_advances_after_being_paused() -> Result<()> {
    let mut registry = registry(RecordingApi::new(), Arc::new(MemorySink::new()));
    registry.mount("left", "video-a", config(LECTURE));
    registry.mount("right", "video-b", config(LECTURE));

    registry.play("left")?;
    registry.get_mut("right").expect("mounted").play()?;

    for _ in 0..8 {
        tokio::time::advance(std::time::Duration::from_millis(250)).await;
        registry.tick();
    }

    assert_eq!(registry.get("left").expect("mounted").state().current_time, 0.0);
    assert!(registry.get("right").expect("mounted").state().current_time >= 1.75);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_replacing_slot_destroys_previous_player() -> Result<()> {
    let mut registry = registry(RecordingApi::new(), Arc::new(MemorySink::new()));
    let old = RecordingHandler::new();
    registry.mount("main", "video-a", config(LECTURE)).add_event_handler(old.boxed());
    registry.play("main")?;

    registry.mount("main", "video-b", config(LECTURE));

    assert_eq!(registry.len(), 1);
    let player = registry.get("main").expect("mounted");
    assert_eq!(player.id(), "video-b");
    assert_eq!(player.state().playback_state, PlaybackState::Paused);
    assert_eq!(old.count(&PlayerEvent::Play), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unload_all_saves_every_player() -> Result<()> {
    let api = RecordingApi::new();
    let mut registry = registry(api.clone(), Arc::new(MemorySink::new()));
    registry.mount("left", "video-a", config(LECTURE));
    registry.mount("right", "video-b", config(LECTURE));

    registry.unload_all().await;

    assert!(registry.is_empty());
    let positions: Vec<_> = api
        .saves()
        .into_iter()
        .filter_map(|(_, p)| p.saved_video_position)
        .collect();
    assert_eq!(positions, vec!["00:00:00".to_string(), "00:00:00".to_string()]);
    Ok(())
}
