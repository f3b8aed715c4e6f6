//! External provider backend
//!
//! Embedded provider players are driven through an SDK object and report
//! back through callbacks. [`ProviderSdk`] is the SDK surface; callbacks
//! arrive as [`ProviderCallback`]s on a crossbeam channel, since the SDK
//! may deliver them from its own thread.

use crate::engine::{
    is_valid_rate, is_valid_seek, valid_volume, EngineEvent, EngineState, PlaybackEngine, PlaybackMode,
    MAX_PLAYBACK_RATE, MIN_PLAYBACK_RATE,
};
use crate::utils::error::Result;
use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, warn};

/// Player state codes used by the provider SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl ProviderState {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Unstarted),
            0 => Some(Self::Ended),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            3 => Some(Self::Buffering),
            5 => Some(Self::Cued),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Unstarted => -1,
            Self::Ended => 0,
            Self::Playing => 1,
            Self::Paused => 2,
            Self::Buffering => 3,
            Self::Cued => 5,
        }
    }

    fn engine_state(self) -> EngineState {
        match self {
            Self::Unstarted | Self::Cued => EngineState::Unstarted,
            Self::Ended => EngineState::Ended,
            Self::Playing => EngineState::Playing,
            Self::Paused => EngineState::Paused,
            Self::Buffering => EngineState::Buffering,
        }
    }
}

/// Callbacks the provider SDK delivers
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCallback {
    Ready,
    StateChange(i32),
    PlaybackQualityChange(String),
    PlaybackRateChange(f64),
    Error(i32),
}

/// Provider SDK player object
#[cfg_attr(test, mockall::automock)]
pub trait ProviderSdk: Send {
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

/// Loads the provider SDK for a video
pub trait ProviderSdkFactory: Send + Sync {
    fn create(&self, video_id: &str) -> Result<(Box<dyn ProviderSdk>, Receiver<ProviderCallback>)>;

    /// Whether SDKs from this factory report positions in speed-scaled
    /// time rather than 1.0x time
    fn reports_scaled_time(&self) -> bool {
        false
    }
}

/// [`PlaybackEngine`] over a provider SDK
pub struct ExternalProviderEngine {
    sdk: Box<dyn ProviderSdk>,

    callbacks: Receiver<ProviderCallback>,

    state: EngineState,

    /// Events raised locally, reported on the next poll
    pending: Vec<EngineEvent>,

    /// Whether the SDK reports speed-scaled time
    scaled_time: bool,

    destroyed: bool,
}

impl ExternalProviderEngine {
    pub fn new(sdk: Box<dyn ProviderSdk>, callbacks: Receiver<ProviderCallback>) -> Self {
        Self {
            sdk,
            callbacks,
            state: EngineState::Unstarted,
            pending: Vec::new(),
            scaled_time: false,
            destroyed: false,
        }
    }

    /// Mark the SDK as reporting positions in speed-scaled time
    pub fn with_scaled_time(mut self, scaled: bool) -> Self {
        self.scaled_time = scaled;
        self
    }

    fn translate(&mut self, callback: ProviderCallback, out: &mut Vec<EngineEvent>) {
        match callback {
            ProviderCallback::Ready => out.push(EngineEvent::Ready),
            ProviderCallback::StateChange(code) => match ProviderState::from_code(code) {
                Some(state) => {
                    let state = state.engine_state();
                    if state != self.state {
                        self.state = state;
                        out.push(EngineEvent::StateChange(state));
                    }
                }
                None => debug!("Ignoring unknown provider state {}", code),
            },
            ProviderCallback::PlaybackQualityChange(quality) => out.push(EngineEvent::QualityChange(quality)),
            ProviderCallback::PlaybackRateChange(rate) => out.push(EngineEvent::RateChange(rate)),
            ProviderCallback::Error(code) => out.push(EngineEvent::Error(format!("Provider error {}", code))),
        }
    }
}

impl PlaybackEngine for ExternalProviderEngine {
    fn mode(&self) -> PlaybackMode {
        PlaybackMode::ExternalProvider
    }

    fn play(&mut self) {
        if !self.destroyed {
            self.sdk.play_video();
        }
    }

    fn pause(&mut self) {
        if !self.destroyed {
            self.sdk.pause_video();
        }
    }

    fn seek_to(&mut self, time: f64) -> bool {
        if self.destroyed || !is_valid_seek(time, self.duration()) {
            debug!("Ignoring seek to {}", time);
            return false;
        }
        let from = self.sdk.get_current_time();
        self.sdk.seek_to(time, true);
        self.pending.push(EngineEvent::Seeked { from, to: time });
        true
    }

    fn set_volume(&mut self, volume: f64) -> bool {
        match valid_volume(volume) {
            Some(v) if !self.destroyed => {
                self.sdk.set_volume(v);
                self.pending.push(EngineEvent::VolumeChange(v));
                true
            }
            _ => false,
        }
    }

    fn set_playback_rate(&mut self, rate: f64) -> bool {
        if self.destroyed || !is_valid_rate(rate) {
            return false;
        }
        self.sdk.set_playback_rate(rate);
        true
    }

    fn current_time(&self) -> f64 {
        self.sdk.get_current_time()
    }

    fn duration(&self) -> Option<f64> {
        let duration = self.sdk.get_duration();
        (duration.is_finite() && duration > 0.0).then_some(duration)
    }

    fn player_state(&self) -> EngineState {
        self.state
    }

    fn volume(&self) -> u8 {
        self.sdk.get_volume()
    }

    fn playback_rate(&self) -> f64 {
        self.sdk.get_playback_rate()
    }

    /// Provider rates, limited to `(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE]`
    fn available_playback_rates(&self) -> Vec<f64> {
        self.sdk
            .get_available_playback_rates()
            .into_iter()
            .filter(|r| *r > MIN_PLAYBACK_RATE && *r <= MAX_PLAYBACK_RATE)
            .collect()
    }

    fn quality(&self) -> Option<String> {
        let quality = self.sdk.get_playback_quality();
        (!quality.is_empty()).then_some(quality)
    }

    fn available_qualities(&self) -> Vec<String> {
        self.sdk.get_available_quality_levels()
    }

    fn set_quality(&mut self, quality: &str) -> bool {
        if self.destroyed {
            return false;
        }
        self.sdk.set_playback_quality(quality);
        true
    }

    fn reports_scaled_time(&self) -> bool {
        self.scaled_time
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        let mut out = std::mem::take(&mut self.pending);
        if self.destroyed {
            return Vec::new();
        }

        loop {
            match self.callbacks.try_recv() {
                Ok(callback) => self.translate(callback, &mut out),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Provider callback channel closed");
                    break;
                }
            }
        }

        if self.state == EngineState::Playing {
            out.push(EngineEvent::TimeUpdate(self.sdk.get_current_time()));
        }

        out
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.pending.clear();
        self.sdk.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_state_codes() {
        for code in [-1, 0, 1, 2, 3, 5] {
            let state = ProviderState::from_code(code).unwrap();
            assert_eq!(state.code(), code);
        }
        assert_eq!(ProviderState::from_code(4), None);
    }

    #[test]
    fn test_callbacks_become_engine_events() {
        let mut sdk = MockProviderSdk::new();
        sdk.expect_get_current_time().return_const(4.5);
        let (tx, rx) = unbounded();
        let mut engine = ExternalProviderEngine::new(Box::new(sdk), rx);

        tx.send(ProviderCallback::Ready).unwrap();
        tx.send(ProviderCallback::StateChange(1)).unwrap();
        tx.send(ProviderCallback::PlaybackQualityChange("hd720".into())).unwrap();

        assert_eq!(
            engine.poll_events(),
            vec![
                EngineEvent::Ready,
                EngineEvent::StateChange(EngineState::Playing),
                EngineEvent::QualityChange("hd720".into()),
                EngineEvent::TimeUpdate(4.5),
            ]
        );
    }

    #[test]
    fn test_seek_checks_duration() {
        let mut sdk = MockProviderSdk::new();
        sdk.expect_get_duration().return_const(60.0);
        sdk.expect_get_current_time().return_const(1.0);
        sdk.expect_seek_to()
            .withf(|t, allow| *t == 30.0 && *allow)
            .times(1)
            .return_const(());
        let (_tx, rx) = unbounded();
        let mut engine = ExternalProviderEngine::new(Box::new(sdk), rx);

        assert!(!engine.seek_to(-50.0));
        assert!(!engine.seek_to(500_000.0));
        assert!(engine.seek_to(30.0));
        assert_eq!(engine.poll_events(), vec![EngineEvent::Seeked { from: 1.0, to: 30.0 }]);
    }

    #[test]
    fn test_rates_are_filtered() {
        let mut sdk = MockProviderSdk::new();
        sdk.expect_get_available_playback_rates()
            .return_const(vec![0.25, 0.5, 1.0, 1.5, 2.0, 8.0]);
        let (_tx, rx) = unbounded();
        let engine = ExternalProviderEngine::new(Box::new(sdk), rx);

        assert_eq!(engine.available_playback_rates(), vec![0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn test_destroy_once() {
        let mut sdk = MockProviderSdk::new();
        sdk.expect_destroy().times(1).return_const(());
        let (_tx, rx) = unbounded();
        let mut engine = ExternalProviderEngine::new(Box::new(sdk), rx);

        engine.destroy();
        engine.destroy();
        engine.play();
        assert!(!engine.set_volume(50.0));
        assert!(engine.poll_events().is_empty());
    }
}
