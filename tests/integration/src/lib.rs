//! Integration test utilities for Lectern
//!
//! This module provides common utilities for integration testing including:
//! - A recording host API with canned transcripts
//! - A scriptable external provider SDK
//! - Event recording and file-backed preference fixtures

use anyhow::Result;
use async_trait::async_trait;
use crossbeam_channel::{unbounded, Receiver, Sender};
use lectern::captions::CaptionPayload;
use lectern::engine::{ProviderCallback, ProviderSdk, ProviderSdkFactory};
use lectern::player::PlayerEventHandler;
use lectern::{HostApi, PlayerConfig, PlayerError, PlayerEvent, PreferenceArea, SaveStatePayload};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Test fixture with a file-backed preference area
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub preferences: PathBuf,
}

impl TestFixture {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let preferences = temp_dir.path().join("preferences.json");
        Ok(Self { temp_dir, preferences })
    }

    /// Open the preference file, as a fresh process would
    pub fn area(&self) -> Result<Arc<PreferenceArea>> {
        Ok(PreferenceArea::open(&self.preferences)?)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}

/// Parse a player config, panicking on bad test input
pub fn config(json: &str) -> PlayerConfig {
    match PlayerConfig::from_json(json) {
        Ok(config) => config,
        Err(e) => panic!("bad test config {}: {}", json, e),
    }
}

/// Host API that records every request and serves canned transcripts
#[derive(Default)]
pub struct RecordingApi {
    saves: Mutex<Vec<(String, SaveStatePayload)>>,
    completions: Mutex<Vec<(String, f64)>>,
    transcript_requests: Mutex<Vec<(String, Option<String>)>>,
    transcripts: Mutex<HashMap<String, CaptionPayload>>,
    translations: Mutex<Option<Vec<String>>>,
}

impl RecordingApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serve `payload` for `url`
    pub fn with_transcript(self: Arc<Self>, url: &str, payload: CaptionPayload) -> Arc<Self> {
        self.transcripts.lock().insert(url.to_string(), payload);
        self
    }

    /// Answer available-translations with `codes`
    pub fn with_translations(self: Arc<Self>, codes: &[&str]) -> Arc<Self> {
        *self.translations.lock() = Some(codes.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn saves(&self) -> Vec<(String, SaveStatePayload)> {
        self.saves.lock().clone()
    }

    pub fn completions(&self) -> Vec<(String, f64)> {
        self.completions.lock().clone()
    }

    pub fn transcript_requests(&self) -> Vec<(String, Option<String>)> {
        self.transcript_requests.lock().clone()
    }
}

#[async_trait]
impl HostApi for RecordingApi {
    async fn save_state(&self, url: &str, payload: &SaveStatePayload) -> lectern::Result<()> {
        self.saves.lock().push((url.to_string(), payload.clone()));
        Ok(())
    }

    async fn fetch_transcript(&self, url: &str, video_id: Option<&str>) -> lectern::Result<CaptionPayload> {
        self.transcript_requests
            .lock()
            .push((url.to_string(), video_id.map(str::to_string)));
        self.transcripts
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| PlayerError::Transport(format!("{} returned HTTP 404", url)))
    }

    async fn available_translations(&self, url: &str) -> lectern::Result<Vec<String>> {
        self.translations
            .lock()
            .clone()
            .ok_or_else(|| PlayerError::Transport(format!("{} returned HTTP 404", url)))
    }

    async fn publish_completion(&self, url: &str, completion: f64) -> lectern::Result<()> {
        self.completions.lock().push((url.to_string(), completion));
        Ok(())
    }
}

/// Transcript with one cue every two seconds
pub fn transcript(cues: usize) -> CaptionPayload {
    CaptionPayload {
        start: (0..cues as i64).map(|i| i * 2000).collect(),
        end: (0..cues as i64).map(|i| i * 2000 + 1900).collect(),
        text: (0..cues).map(|i| format!("cue {}", i)).collect(),
    }
}

/// Event handler that appends to a shared list
#[derive(Clone, Default)]
pub struct RecordingHandler {
    events: Arc<Mutex<Vec<PlayerEvent>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PlayerEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, event: &PlayerEvent) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }

    pub fn boxed(&self) -> Box<dyn PlayerEventHandler> {
        Box::new(self.clone())
    }
}

impl PlayerEventHandler for RecordingHandler {
    fn handle_event(&mut self, event: &PlayerEvent) {
        self.events.lock().push(event.clone());
    }
}

pub mod provider {
    //! Scriptable stand-in for the external provider SDK

    use super::*;

    /// What the fake SDK currently reports
    #[derive(Debug, Clone)]
    pub struct ProviderStatus {
        pub state: i32,
        pub time: f64,
        pub duration: f64,
        pub rate: f64,
        pub rates: Vec<f64>,
        pub volume: u8,
        pub quality: String,
        pub destroyed: bool,

        /// Every mutating SDK call, by name
        pub calls: Vec<String>,
    }

    impl Default for ProviderStatus {
        fn default() -> Self {
            Self {
                state: -1,
                time: 0.0,
                duration: 120.0,
                rate: 1.0,
                rates: vec![0.25, 0.5, 1.0, 1.5, 2.0],
                volume: 100,
                quality: "large".to_string(),
                destroyed: false,
                calls: Vec::new(),
            }
        }
    }

    /// Handle tests use to drive the fake SDK
    #[derive(Clone)]
    pub struct ProviderHandle {
        status: Arc<Mutex<ProviderStatus>>,
        callbacks: Arc<Mutex<Option<Sender<ProviderCallback>>>>,
    }

    impl ProviderHandle {
        pub fn status(&self) -> ProviderStatus {
            self.status.lock().clone()
        }

        /// Deliver a callback as the SDK would
        pub fn send(&self, callback: ProviderCallback) {
            if let Some(tx) = self.callbacks.lock().as_ref() {
                let _ = tx.send(callback);
            }
        }

        pub fn set_time(&self, time: f64) {
            self.status.lock().time = time;
        }
    }

    struct FakeSdk {
        status: Arc<Mutex<ProviderStatus>>,
        callbacks: Sender<ProviderCallback>,
    }

    impl FakeSdk {
        fn record(&self, call: &str) {
            self.status.lock().calls.push(call.to_string());
        }

        fn change_state(&mut self, code: i32) {
            self.status.lock().state = code;
            let _ = self.callbacks.send(ProviderCallback::StateChange(code));
        }
    }

    impl ProviderSdk for FakeSdk {
        fn play_video(&mut self) {
            self.record("playVideo");
            self.change_state(1);
        }

        fn pause_video(&mut self) {
            self.record("pauseVideo");
            self.change_state(2);
        }

        fn seek_to(&mut self, seconds: f64, _allow_seek_ahead: bool) {
            self.record("seekTo");
            self.status.lock().time = seconds;
        }

        fn set_volume(&mut self, volume: u8) {
            self.status.lock().volume = volume;
        }

        fn get_volume(&self) -> u8 {
            self.status.lock().volume
        }

        fn set_playback_rate(&mut self, rate: f64) {
            self.record("setPlaybackRate");
            self.status.lock().rate = rate;
            let _ = self.callbacks.send(ProviderCallback::PlaybackRateChange(rate));
        }

        fn get_playback_rate(&self) -> f64 {
            self.status.lock().rate
        }

        fn get_available_playback_rates(&self) -> Vec<f64> {
            self.status.lock().rates.clone()
        }

        fn get_current_time(&self) -> f64 {
            self.status.lock().time
        }

        fn get_duration(&self) -> f64 {
            self.status.lock().duration
        }

        fn get_player_state(&self) -> i32 {
            self.status.lock().state
        }

        fn set_playback_quality(&mut self, quality: &str) {
            self.record("setPlaybackQuality");
            self.status.lock().quality = quality.to_string();
            let _ = self
                .callbacks
                .send(ProviderCallback::PlaybackQualityChange(quality.to_string()));
        }

        fn get_playback_quality(&self) -> String {
            self.status.lock().quality.clone()
        }

        fn get_available_quality_levels(&self) -> Vec<String> {
            vec!["hd720".to_string(), "large".to_string(), "medium".to_string()]
        }

        fn destroy(&mut self) {
            self.record("destroy");
            self.status.lock().destroyed = true;
        }
    }

    /// Factory handing out fake SDKs that share one [`ProviderHandle`]
    #[derive(Clone)]
    pub struct FakeProviderFactory {
        handle: ProviderHandle,
        available: bool,
        scaled: bool,
    }

    impl FakeProviderFactory {
        pub fn new() -> (Arc<Self>, ProviderHandle) {
            Self::with_availability(true)
        }

        /// A factory whose SDK never loads
        pub fn unavailable() -> Arc<Self> {
            Self::with_availability(false).0
        }

        /// A factory whose SDK reports positions in speed-scaled time
        pub fn scaled() -> (Arc<Self>, ProviderHandle) {
            let (factory, handle) = Self::with_availability(true);
            let factory = Arc::new(Self {
                scaled: true,
                ..(*factory).clone()
            });
            (factory, handle)
        }

        fn with_availability(available: bool) -> (Arc<Self>, ProviderHandle) {
            let handle = ProviderHandle {
                status: Arc::new(Mutex::new(ProviderStatus::default())),
                callbacks: Arc::new(Mutex::new(None)),
            };
            let factory = Self {
                handle: handle.clone(),
                available,
                scaled: false,
            };
            (Arc::new(factory), handle)
        }
    }

    impl ProviderSdkFactory for FakeProviderFactory {
        fn create(&self, video_id: &str) -> lectern::Result<(Box<dyn ProviderSdk>, Receiver<ProviderCallback>)> {
            if !self.available {
                return Err(PlayerError::Engine(format!("SDK failed to load for {}", video_id)));
            }

            let (tx, rx) = unbounded();
            *self.handle.callbacks.lock() = Some(tx.clone());
            let sdk = FakeSdk {
                status: self.handle.status.clone(),
                callbacks: tx,
            };
            Ok((Box::new(sdk), rx))
        }

        fn reports_scaled_time(&self) -> bool {
            self.scaled
        }
    }
}
