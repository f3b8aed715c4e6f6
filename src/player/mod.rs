//! Player core for Lectern
//!
//! This module holds the pieces every feature module shares: the canonical
//! event vocabulary, per-player configuration and state, the typed event bus,
//! the composed [`PlayerController`] and the [`PlayerRegistry`] that mounts
//! controllers into slots.

mod config;
pub(crate) mod controller;
mod coordinator;
mod events;
mod registry;
mod speed;
mod state;

pub use config::{BumperConfig, LanguageMap, PlayerConfig, DEFAULT_COMPLETION_PERCENTAGE, MAX_BUMPER_DURATION};
pub use controller::{PlayerController, PlayerControllerBuilder};
pub use coordinator::PlaybackCoordinator;
pub use events::{EventBus, SubscriptionId, MAX_EVENTS_PER_DISPATCH};
pub use registry::PlayerRegistry;
pub use speed::Speed;
pub use state::{Bounds, PlayerState};
pub(crate) use state::keys;

pub use crate::engine::PlaybackMode;

/// Playback state of a mounted player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Media not ready yet
    Unstarted,

    /// Currently playing
    Playing,

    /// Ready or paused
    Paused,

    /// End of media reached; left by replaying
    Ended,
}

/// What triggered a seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// Progress slider drag
    Slider,

    /// Click on a transcript cue
    Caption,

    /// Keyboard shortcut
    Keyboard,

    /// Automatic seek to the resume position on first load
    Resume,

    /// Programmatic seek from the host
    Api,

    /// Reported by the engine without a request from the player
    External,
}

impl SeekOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slider => "onSlideSeek",
            Self::Caption => "onCaptionSeek",
            Self::Keyboard => "onKeyboardSeek",
            Self::Resume => "onResume",
            Self::Api => "onApiSeek",
            Self::External => "onExternalSeek",
        }
    }

    /// Whether a person asked for this seek
    pub fn is_user(&self) -> bool {
        matches!(self, Self::Slider | Self::Caption | Self::Keyboard | Self::Api)
    }
}

/// Canonical player events
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Media is ready to play
    Ready,

    /// Playback started or resumed
    Play,

    /// Playback paused
    Pause,

    /// End of media reached
    Ended,

    /// Position jumped
    Seek { time: f64, previous: f64, origin: SeekOrigin },

    /// Playback speed changed
    SpeedChange { speed: Speed, previous: Speed },

    /// Volume changed (0-100)
    VolumeChange { volume: u8 },

    /// Provider quality level changed
    QualityChange { quality: String },

    /// Periodic position report
    TimeUpdate { time: f64 },

    /// Bumper skipped
    Skip { do_not_show_again: bool },

    /// Engine error
    Error { message: String },

    /// Transcript language changed
    LanguageChange { language: String },

    /// Language menu opened or closed
    LanguageMenu { shown: bool },

    /// Captions shown or hidden
    Captions { shown: bool },
}

impl PlayerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ready => EventKind::Ready,
            Self::Play => EventKind::Play,
            Self::Pause => EventKind::Pause,
            Self::Ended => EventKind::Ended,
            Self::Seek { .. } => EventKind::Seek,
            Self::SpeedChange { .. } => EventKind::SpeedChange,
            Self::VolumeChange { .. } => EventKind::VolumeChange,
            Self::QualityChange { .. } => EventKind::QualityChange,
            Self::TimeUpdate { .. } => EventKind::TimeUpdate,
            Self::Skip { .. } => EventKind::Skip,
            Self::Error { .. } => EventKind::Error,
            Self::LanguageChange { .. } => EventKind::LanguageChange,
            Self::LanguageMenu { shown: true } => EventKind::LanguageMenuShow,
            Self::LanguageMenu { shown: false } => EventKind::LanguageMenuHide,
            Self::Captions { shown: true } => EventKind::CaptionsShow,
            Self::Captions { shown: false } => EventKind::CaptionsHide,
        }
    }
}

/// Event kinds modules subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    Play,
    Pause,
    Ended,
    Seek,
    SpeedChange,
    VolumeChange,
    QualityChange,
    TimeUpdate,
    Skip,
    Error,
    LanguageChange,
    LanguageMenuShow,
    LanguageMenuHide,
    CaptionsShow,
    CaptionsHide,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Ended => "ended",
            Self::Seek => "seek",
            Self::SpeedChange => "speedchange",
            Self::VolumeChange => "volumechange",
            Self::QualityChange => "qualitychange",
            Self::TimeUpdate => "timeupdate",
            Self::Skip => "skip",
            Self::Error => "error",
            Self::LanguageChange => "language_change",
            Self::LanguageMenuShow => "language_menu:show",
            Self::LanguageMenuHide => "language_menu:hide",
            Self::CaptionsShow => "captions:show",
            Self::CaptionsHide => "captions:hide",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature modules, in attach order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleName {
    ControlBar,
    Quality,
    Progress,
    Volume,
    Speed,
    Captions,
    SaveState,
    Analytics,
    Completion,
    Bumper,
}

impl ModuleName {
    /// Order modules are attached in; teardown runs in reverse
    pub const ATTACH_ORDER: [ModuleName; 10] = [
        ModuleName::ControlBar,
        ModuleName::Quality,
        ModuleName::Progress,
        ModuleName::Volume,
        ModuleName::Speed,
        ModuleName::Captions,
        ModuleName::SaveState,
        ModuleName::Analytics,
        ModuleName::Completion,
        ModuleName::Bumper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ControlBar => "control_bar",
            Self::Quality => "quality",
            Self::Progress => "progress",
            Self::Volume => "volume",
            Self::Speed => "speed",
            Self::Captions => "captions",
            Self::SaveState => "save_state",
            Self::Analytics => "analytics",
            Self::Completion => "completion",
            Self::Bumper => "bumper",
        }
    }
}

impl std::fmt::Display for ModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Player event handler trait
pub trait PlayerEventHandler: Send {
    /// Called for every event after all modules have seen it
    fn handle_event(&mut self, event: &PlayerEvent);
}
