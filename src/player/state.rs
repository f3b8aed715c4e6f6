//! Player state shared by every feature module
//!
//! One [`PlayerState`] exists per mounted player. Modules read and write it
//! from inside event handlers; the controller owns it and hands out mutable
//! access one handler at a time.

use crate::player::{ModuleName, PlaybackMode, PlaybackState, PlayerConfig, PlayerEvent, Speed};
use crate::storage::PreferenceStore;
use log::debug;

/// Storage keys
pub(crate) mod keys {
    pub const SPEED: &str = "speed";
    pub const GENERAL_SPEED: &str = "general_speed";
    pub const LANGUAGE: &str = "language";
    pub const VOLUME: &str = "volume";
    pub const SAVED_POSITION: &str = "savedVideoPosition";
    pub const BUMPER_SHOWN: &str = "bumper_shown";
    pub const BUMPER_DO_NOT_SHOW_AGAIN: &str = "bumper_do_not_show_again";
}

/// Playable region. Bounds stop applying once the viewer seeks away,
/// reaches the end bound or the media ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Region start in seconds, never negative
    pub start: f64,

    /// Region end in seconds, always after `start`
    pub end: Option<f64>,

    /// Whether the bounds still constrain playback
    pub active: bool,
}

impl Bounds {
    /// End bound while it still applies
    pub fn active_end(&self) -> Option<f64> {
        self.end.filter(|_| self.active)
    }
}

/// Mutable state of one mounted player
#[derive(Debug)]
pub struct PlayerState {
    /// Stable player id, also the scoped storage bucket
    pub id: String,

    /// Normalized configuration
    pub config: PlayerConfig,

    /// Position in seconds
    pub current_time: f64,

    /// Media length in seconds, once known
    pub duration: Option<f64>,

    /// Current speed, always one of `speeds`
    pub speed: Speed,

    /// Supported speeds, ascending
    pub speeds: Vec<Speed>,

    /// Volume 0-100
    pub volume: u8,

    pub muted: bool,

    /// Transcript language, `None` when captions are unavailable
    pub language: Option<String>,

    /// Active backend, `None` when no engine could be created
    pub playback_mode: Option<PlaybackMode>,

    pub playback_state: PlaybackState,

    /// Preference store for this player
    pub storage: PreferenceStore,

    /// Running on a touch-class device
    pub is_touch: bool,

    /// `Some(false)` when the external provider could not be used
    pub youtube_is_available: Option<bool>,

    bounds: Bounds,

    /// Where playback starts on first load
    resume_position: f64,

    /// Attached modules in attach order
    attached: Vec<ModuleName>,
}

impl PlayerState {
    /// Build the initial state, applying stored preferences over the
    /// configuration
    pub fn new(id: impl Into<String>, config: PlayerConfig, storage: PreferenceStore, is_touch: bool) -> Self {
        let mut config = config;
        config.normalize();

        let speeds = config.speeds.clone();
        let requested_speed = storage
            .get::<String>(keys::SPEED, true)
            .and_then(|s| Speed::parse(&s))
            .or(config.speed)
            .or_else(|| storage.get::<String>(keys::GENERAL_SPEED, false).and_then(|s| Speed::parse(&s)))
            .or(config.general_speed)
            .unwrap_or(Speed::NORMAL);
        let speed = Speed::snap(&speeds, requested_speed).unwrap_or(Speed::NORMAL);

        let requested_language = storage
            .get::<String>(keys::LANGUAGE, false)
            .or_else(|| config.transcript_language.clone())
            .unwrap_or_else(|| "en".to_string());
        let language = config.transcript_languages.resolve(Some(&requested_language));

        let volume = storage
            .get::<f64>(keys::VOLUME, false)
            .filter(|v| v.is_finite() && (0.0..=100.0).contains(v))
            .map(|v| v.round() as u8)
            .unwrap_or(100);

        let start = config.start_bound();
        let end = config.end_bound();
        let resume_position = storage
            .get::<f64>(keys::SAVED_POSITION, true)
            .filter(|p| p.is_finite() && *p >= start && end.map_or(true, |e| *p < e))
            .or(config.saved_video_position)
            .unwrap_or(start);

        debug!(
            "Initial state for {}: speed {}, language {:?}, volume {}, resume at {}",
            storage.id(),
            speed,
            language,
            volume,
            resume_position
        );

        Self {
            id: id.into(),
            duration: config.duration,
            config,
            current_time: 0.0,
            speed,
            speeds,
            volume,
            muted: volume == 0,
            language,
            playback_mode: None,
            playback_state: PlaybackState::Unstarted,
            storage,
            is_touch,
            youtube_is_available: None,
            bounds: Bounds {
                start,
                end,
                active: true,
            },
            resume_position,
            attached: Vec::new(),
        }
    }

    /// Apply the playback state machine for `event`.
    ///
    /// Returns the new state when it changed. Seeks keep the current state.
    pub fn transition(&mut self, event: &PlayerEvent) -> Option<PlaybackState> {
        use PlaybackState::*;

        let next = match (self.playback_state, event) {
            (Unstarted, PlayerEvent::Ready) => Paused,
            (Paused | Ended, PlayerEvent::Play) => Playing,
            (Playing, PlayerEvent::Pause) => Paused,
            (Playing | Paused, PlayerEvent::Ended) => Ended,
            _ => return None,
        };

        if next == self.playback_state {
            return None;
        }
        debug!("{}: {:?} -> {:?}", self.id, self.playback_state, next);
        self.playback_state = next;
        Some(next)
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Stop enforcing the playable region
    pub fn clear_bounds(&mut self) {
        if self.bounds.active {
            debug!("{}: playback bounds cleared", self.id);
            self.bounds.active = false;
        }
    }

    /// Position playback starts from on first load
    pub fn resume_position(&self) -> f64 {
        self.resume_position
    }

    pub fn attached_modules(&self) -> &[ModuleName] {
        &self.attached
    }

    pub fn is_attached(&self, name: ModuleName) -> bool {
        self.attached.contains(&name)
    }

    pub fn is_playing(&self) -> bool {
        self.playback_state == PlaybackState::Playing
    }

    /// Time in 1.0x media seconds, undoing speed scaling for backends
    /// that report scaled time
    pub fn unscaled_time(&self, time: f64, scaled: bool) -> f64 {
        if scaled {
            time * self.speed.as_f64()
        } else {
            time
        }
    }

    pub(crate) fn mark_attached(&mut self, name: ModuleName) {
        if !self.attached.contains(&name) {
            self.attached.push(name);
        }
    }

    pub(crate) fn mark_detached(&mut self, name: ModuleName) {
        self.attached.retain(|n| *n != name);
    }
}
