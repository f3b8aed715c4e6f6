//! Integration tests for application and player configuration loading

use anyhow::Result;
use lectern::utils::AppConfig;
use lectern_integration_tests::{config, TestFixture};
use serial_test::serial;
use std::time::Duration;

#[test]
#[serial]
fn test_app_config_file_and_env() -> Result<()> {
    let fixture = TestFixture::new()?;
    let path = fixture.path().join("config.toml");
    std::fs::write(
        &path,
        "[host]\nbase_url = \"https://courses.example.org\"\ntimeout_ms = 2500\n\n[general]\ntick_interval_ms = 100\n",
    )?;

    std::env::set_var("LECTERN_LOG_LEVEL", "debug");
    let loaded = AppConfig::load_from(&path);
    std::env::remove_var("LECTERN_LOG_LEVEL");
    let loaded = loaded?;

    assert_eq!(loaded.host.base_url.as_deref(), Some("https://courses.example.org"));
    assert_eq!(loaded.request_timeout(), Duration::from_millis(2500));
    assert_eq!(loaded.tick_interval(), Duration::from_millis(100));
    assert_eq!(loaded.general.log_level, "debug");
    assert_eq!(loaded.storage.namespace, "VideoPlayer");
    Ok(())
}

#[test]
#[serial]
fn test_app_config_rejects_bad_env() -> Result<()> {
    let fixture = TestFixture::new()?;
    let path = fixture.path().join("config.toml");
    std::fs::write(&path, "")?;

    std::env::set_var("LECTERN_HOST_TIMEOUT_MS", "soon");
    let loaded = AppConfig::load_from(&path);
    std::env::remove_var("LECTERN_HOST_TIMEOUT_MS");

    assert!(loaded.is_err());
    Ok(())
}

#[test]
fn test_player_config_from_host_page() {
    let player = config(
        r#"{"speeds": ["0.75", "1.0", "1.25", "1.50"], "start": "12", "end": "bogus",
            "savedVideoPosition": 30.5, "saveStateUrl": "/save",
            "transcriptLanguages": {"en": "English", "zh": "中文"},
            "streams": "0.75:slowId,1.00:normalId", "sources": ["a.mp4", "a.webm"]}"#,
    );

    assert_eq!(player.speeds.len(), 4);
    assert_eq!(player.start, Some(12.0));
    assert_eq!(player.end, None);
    assert_eq!(player.saved_video_position, Some(30.5));
    assert_eq!(player.provider_id().as_deref(), Some("normalId"));
    assert_eq!(player.transcript_languages.label("zh"), Some("中文"));
}
