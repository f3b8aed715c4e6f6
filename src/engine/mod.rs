//! Playback engine adapters
//!
//! The player core drives media through [`PlaybackEngine`], which hides the
//! difference between a native media element and an embedded external
//! provider. Both backends validate their inputs the same way and report
//! what happened as [`EngineEvent`]s that the controller polls.

pub mod native;
pub mod provider;

pub use native::{
    ClockedElementFactory, ClockedMediaElement, MediaElement, MediaElementEvent, MediaElementFactory, NativeMediaEngine,
};
pub use provider::{ExternalProviderEngine, ProviderCallback, ProviderSdk, ProviderSdkFactory, ProviderState};

use crate::utils::error::{PlayerError, Result};
use log::{info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Slowest playback rate an engine accepts
pub const MIN_PLAYBACK_RATE: f64 = 0.25;

/// Fastest playback rate an engine accepts
pub const MAX_PLAYBACK_RATE: f64 = 5.0;

/// Which backend is playing the media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackMode {
    /// Local encodings played by a media element
    NativeMedia,

    /// Embedded external provider player
    ExternalProvider,
}

/// Engine-level playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unstarted,
    Playing,
    Paused,
    Buffering,
    Ended,
}

/// What an engine reports back to the player
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Media metadata is available; fired once
    Ready,

    /// Playback state changed
    StateChange(EngineState),

    /// Periodic position report while playing
    TimeUpdate(f64),

    /// A seek completed
    Seeked { from: f64, to: f64 },

    /// Playback rate changed
    RateChange(f64),

    /// Volume changed (0-100)
    VolumeChange(u8),

    /// Provider switched quality level
    QualityChange(String),

    /// Engine failure
    Error(String),
}

/// Uniform control surface over a playback backend.
///
/// Invalid arguments (non-finite values, seeks outside `[0, duration]`,
/// volumes outside `[0, 100]`, rates outside
/// `[MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE]`) are ignored and the previous
/// value kept. The setters return whether the request was applied.
pub trait PlaybackEngine: Send {
    /// Backend kind
    fn mode(&self) -> PlaybackMode;

    fn play(&mut self);

    fn pause(&mut self);

    /// Seek to `time` seconds
    fn seek_to(&mut self, time: f64) -> bool;

    /// Set volume on a 0-100 scale
    fn set_volume(&mut self, volume: f64) -> bool;

    fn set_playback_rate(&mut self, rate: f64) -> bool;

    /// Position in seconds
    fn current_time(&self) -> f64;

    /// Media length in seconds, `None` until known
    fn duration(&self) -> Option<f64>;

    fn player_state(&self) -> EngineState;

    /// Volume on a 0-100 scale
    fn volume(&self) -> u8;

    fn playback_rate(&self) -> f64;

    /// Rates the backend supports, empty when it accepts any rate in range
    fn available_playback_rates(&self) -> Vec<f64> {
        Vec::new()
    }

    /// Current quality level, if the backend has any
    fn quality(&self) -> Option<String> {
        None
    }

    fn available_qualities(&self) -> Vec<String> {
        Vec::new()
    }

    fn set_quality(&mut self, _quality: &str) -> bool {
        false
    }

    /// Whether `current_time` is reported in speed-scaled media time
    /// rather than 1.0x time
    fn reports_scaled_time(&self) -> bool {
        false
    }

    /// Take everything that happened since the last poll
    fn poll_events(&mut self) -> Vec<EngineEvent>;

    /// Release the backend. Further calls are ignored.
    fn destroy(&mut self);
}

/// An engine owned by its player and reachable by the playback coordinator
pub type SharedEngine = Arc<Mutex<Box<dyn PlaybackEngine>>>;

/// Whether `time` is a usable seek target. An unknown duration only
/// allows seeking to the start.
pub fn is_valid_seek(time: f64, duration: Option<f64>) -> bool {
    time.is_finite() && time >= 0.0 && time <= duration.unwrap_or(0.0)
}

/// Volume as an integer percent, or `None` when out of range
pub fn valid_volume(volume: f64) -> Option<u8> {
    if volume.is_finite() && (0.0..=100.0).contains(&volume) {
        Some(volume.round() as u8)
    } else {
        None
    }
}

pub fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && (MIN_PLAYBACK_RATE..=MAX_PLAYBACK_RATE).contains(&rate)
}

/// Which media a player should load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaSource {
    /// Native encodings, in preference order
    pub sources: Vec<String>,

    /// External provider video id
    pub provider_id: Option<String>,

    /// Known length in seconds, used by simulated elements
    pub duration: Option<f64>,
}

/// Result of engine selection
pub struct EngineSelection {
    pub engine: Box<dyn PlaybackEngine>,

    pub mode: PlaybackMode,

    /// `Some(false)` when a provider was requested but could not be used
    pub provider_available: Option<bool>,
}

impl std::fmt::Debug for EngineSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSelection")
            .field("mode", &self.mode)
            .field("provider_available", &self.provider_available)
            .finish()
    }
}

/// Builds the right engine for a media source
#[derive(Clone)]
pub struct EngineFactory {
    element: Arc<dyn MediaElementFactory>,
    provider: Option<Arc<dyn ProviderSdkFactory>>,
}

impl Default for EngineFactory {
    fn default() -> Self {
        Self::new(Arc::new(ClockedElementFactory))
    }
}

impl EngineFactory {
    pub fn new(element: Arc<dyn MediaElementFactory>) -> Self {
        Self { element, provider: None }
    }

    /// Enable the external provider backend
    pub fn with_provider(mut self, provider: Arc<dyn ProviderSdkFactory>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Pick a backend for `source`.
    ///
    /// The provider wins when an id is given and the SDK can be created.
    /// Otherwise native encodings are used, flagging the provider as
    /// unavailable if one was asked for. With neither, selection fails.
    pub fn create(&self, source: &MediaSource) -> Result<EngineSelection> {
        let mut provider_available = None;

        if let Some(id) = source.provider_id.as_deref().filter(|id| !id.is_empty()) {
            match self.provider.as_ref().map(|p| (p.create(id), p.reports_scaled_time())) {
                Some((Ok((sdk, callbacks)), scaled)) => {
                    info!("Using external provider for video {}", id);
                    let engine = ExternalProviderEngine::new(sdk, callbacks).with_scaled_time(scaled);
                    return Ok(EngineSelection {
                        engine: Box::new(engine),
                        mode: PlaybackMode::ExternalProvider,
                        provider_available: Some(true),
                    });
                }
                Some((Err(e), _)) => {
                    warn!("External provider unavailable for {}: {}", id, e);
                    provider_available = Some(false);
                }
                None => {
                    warn!("No external provider configured for {}", id);
                    provider_available = Some(false);
                }
            }
        }

        if source.sources.is_empty() {
            return Err(PlayerError::Engine("No playable source".to_string()));
        }

        let element = self.element.create(&source.sources, source.duration)?;
        info!("Using native media for {}", source.sources[0]);

        Ok(EngineSelection {
            engine: Box::new(NativeMediaEngine::new(element)),
            mode: PlaybackMode::NativeMedia,
            provider_available,
        })
    }
}
