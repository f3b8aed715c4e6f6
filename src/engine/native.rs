//! Native media backend
//!
//! [`MediaElement`] mirrors the control surface of a media element: a
//! position, a rate, a volume in `[0, 1]` and a queue of DOM-style events.
//! [`NativeMediaEngine`] adapts any element to [`PlaybackEngine`].
//!
//! [`ClockedMediaElement`] is a self-contained element whose position is
//! derived from the tokio clock. The CLI uses it to play a lecture without
//! decoding anything, and tests drive it with paused time.

use crate::engine::{
    is_valid_rate, is_valid_seek, valid_volume, EngineEvent, EngineState, PlaybackEngine, PlaybackMode,
};
use crate::utils::error::{PlayerError, Result};
use log::debug;
use tokio::time::Instant;

/// Events a media element queues
#[derive(Debug, Clone, PartialEq)]
pub enum MediaElementEvent {
    LoadedMetadata,
    Playing,
    Pause,
    Waiting,
    Ended,
    Seeked,
    RateChange,
    VolumeChange,
    TimeUpdate,
    Error(String),
}

/// Control surface of a media element
pub trait MediaElement: Send {
    fn play(&mut self);

    fn pause(&mut self);

    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, time: f64);

    /// Length in seconds, NaN while unknown
    fn duration(&self) -> f64;

    fn playback_rate(&self) -> f64;

    fn set_playback_rate(&mut self, rate: f64);

    /// Volume in `[0, 1]`
    fn volume(&self) -> f64;

    fn set_volume(&mut self, volume: f64);

    fn is_paused(&self) -> bool;

    fn is_ended(&self) -> bool;

    /// Take queued events
    fn drain_events(&mut self) -> Vec<MediaElementEvent>;
}

/// Creates media elements for a list of encodings
pub trait MediaElementFactory: Send + Sync {
    fn create(&self, sources: &[String], duration: Option<f64>) -> Result<Box<dyn MediaElement>>;
}

/// Factory for [`ClockedMediaElement`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockedElementFactory;

impl MediaElementFactory for ClockedElementFactory {
    fn create(&self, sources: &[String], duration: Option<f64>) -> Result<Box<dyn MediaElement>> {
        if sources.iter().all(|s| s.trim().is_empty()) {
            return Err(PlayerError::Engine("No usable encoding".to_string()));
        }
        Ok(Box::new(ClockedMediaElement::new(duration)))
    }
}

/// Media element that plays against the tokio clock
#[derive(Debug)]
pub struct ClockedMediaElement {
    /// Length in seconds, NaN when unknown
    duration: f64,

    /// Position at the last anchor point
    position: f64,

    /// When playback last (re)started; `None` while paused
    anchored_at: Option<Instant>,

    rate: f64,

    volume: f64,

    ended: bool,

    events: Vec<MediaElementEvent>,
}

impl ClockedMediaElement {
    /// Create an element; metadata is reported on the first drain
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            duration: duration.filter(|d| d.is_finite() && *d >= 0.0).unwrap_or(f64::NAN),
            position: 0.0,
            anchored_at: None,
            rate: 1.0,
            volume: 1.0,
            ended: false,
            events: vec![MediaElementEvent::LoadedMetadata],
        }
    }

    fn clamp_to_duration(&self, time: f64) -> f64 {
        if self.duration.is_nan() {
            time
        } else {
            time.min(self.duration)
        }
    }

    /// Fold elapsed time into `position` and restart the anchor
    fn reanchor(&mut self) {
        self.position = self.current_time();
        if self.anchored_at.is_some() {
            self.anchored_at = Some(Instant::now());
        }
    }

    fn reached_end(&self) -> bool {
        !self.duration.is_nan() && self.current_time() >= self.duration
    }
}

impl MediaElement for ClockedMediaElement {
    fn play(&mut self) {
        if self.anchored_at.is_some() {
            return;
        }
        if self.ended {
            self.position = 0.0;
            self.ended = false;
        }
        self.anchored_at = Some(Instant::now());
        self.events.push(MediaElementEvent::Playing);
    }

    fn pause(&mut self) {
        if self.anchored_at.is_none() {
            return;
        }
        self.position = self.current_time();
        self.anchored_at = None;
        self.events.push(MediaElementEvent::Pause);
    }

    fn current_time(&self) -> f64 {
        match self.anchored_at {
            Some(at) => self.clamp_to_duration(self.position + at.elapsed().as_secs_f64() * self.rate),
            None => self.position,
        }
    }

    fn set_current_time(&mut self, time: f64) {
        self.position = self.clamp_to_duration(time.max(0.0));
        if self.anchored_at.is_some() {
            self.anchored_at = Some(Instant::now());
        }
        self.ended = false;
        self.events.push(MediaElementEvent::Seeked);
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.reanchor();
        self.rate = rate;
        self.events.push(MediaElementEvent::RateChange);
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
        self.events.push(MediaElementEvent::VolumeChange);
    }

    fn is_paused(&self) -> bool {
        self.anchored_at.is_none()
    }

    fn is_ended(&self) -> bool {
        self.ended
    }

    fn drain_events(&mut self) -> Vec<MediaElementEvent> {
        if self.anchored_at.is_some() {
            if self.reached_end() {
                self.position = self.duration;
                self.anchored_at = None;
                self.ended = true;
                self.events.push(MediaElementEvent::Ended);
            } else {
                self.events.push(MediaElementEvent::TimeUpdate);
            }
        }
        std::mem::take(&mut self.events)
    }
}

/// [`PlaybackEngine`] over a [`MediaElement`]
pub struct NativeMediaEngine {
    element: Box<dyn MediaElement>,

    state: EngineState,

    /// Position before the last accepted seek
    seek_from: Option<f64>,

    ready: bool,

    destroyed: bool,
}

impl NativeMediaEngine {
    pub fn new(element: Box<dyn MediaElement>) -> Self {
        Self {
            element,
            state: EngineState::Unstarted,
            seek_from: None,
            ready: false,
            destroyed: false,
        }
    }

    fn set_state(&mut self, state: EngineState, out: &mut Vec<EngineEvent>) {
        if self.state != state {
            self.state = state;
            out.push(EngineEvent::StateChange(state));
        }
    }
}

impl PlaybackEngine for NativeMediaEngine {
    fn mode(&self) -> PlaybackMode {
        PlaybackMode::NativeMedia
    }

    fn play(&mut self) {
        if !self.destroyed {
            self.element.play();
        }
    }

    fn pause(&mut self) {
        if !self.destroyed {
            self.element.pause();
        }
    }

    fn seek_to(&mut self, time: f64) -> bool {
        if self.destroyed || !is_valid_seek(time, self.duration()) {
            debug!("Ignoring seek to {}", time);
            return false;
        }
        self.seek_from = Some(self.element.current_time());
        self.element.set_current_time(time);
        true
    }

    fn set_volume(&mut self, volume: f64) -> bool {
        match valid_volume(volume) {
            Some(v) if !self.destroyed => {
                self.element.set_volume(f64::from(v) / 100.0);
                true
            }
            _ => false,
        }
    }

    fn set_playback_rate(&mut self, rate: f64) -> bool {
        if self.destroyed || !is_valid_rate(rate) {
            return false;
        }
        self.element.set_playback_rate(rate);
        true
    }

    fn current_time(&self) -> f64 {
        self.element.current_time()
    }

    fn duration(&self) -> Option<f64> {
        let duration = self.element.duration();
        (duration.is_finite() && duration >= 0.0).then_some(duration)
    }

    fn player_state(&self) -> EngineState {
        self.state
    }

    fn volume(&self) -> u8 {
        (self.element.volume() * 100.0).round().clamp(0.0, 100.0) as u8
    }

    fn playback_rate(&self) -> f64 {
        self.element.playback_rate()
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        if self.destroyed {
            return out;
        }

        for event in self.element.drain_events() {
            match event {
                MediaElementEvent::LoadedMetadata => {
                    if !self.ready {
                        self.ready = true;
                        out.push(EngineEvent::Ready);
                    }
                }
                MediaElementEvent::Playing => self.set_state(EngineState::Playing, &mut out),
                MediaElementEvent::Pause => {
                    if !self.element.is_ended() {
                        self.set_state(EngineState::Paused, &mut out);
                    }
                }
                MediaElementEvent::Waiting => self.set_state(EngineState::Buffering, &mut out),
                MediaElementEvent::Ended => self.set_state(EngineState::Ended, &mut out),
                MediaElementEvent::Seeked => {
                    let to = self.element.current_time();
                    let from = self.seek_from.take().unwrap_or(to);
                    out.push(EngineEvent::Seeked { from, to });
                }
                MediaElementEvent::RateChange => out.push(EngineEvent::RateChange(self.element.playback_rate())),
                MediaElementEvent::VolumeChange => out.push(EngineEvent::VolumeChange(self.volume())),
                MediaElementEvent::TimeUpdate => out.push(EngineEvent::TimeUpdate(self.element.current_time())),
                MediaElementEvent::Error(message) => out.push(EngineEvent::Error(message)),
            }
        }

        out
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.element.pause();
        self.element.drain_events();
        self.destroyed = true;
    }
}
