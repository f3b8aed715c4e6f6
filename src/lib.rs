//! Lectern - an event-driven lecture video player core
//!
//! A [`PlayerController`] wraps one playback engine (a clocked native media
//! element or an external provider SDK) and composes feature modules around
//! it: control bar, progress slider, volume, speed, quality, captions,
//! save-state, analytics, completion tracking and a pre-roll bumper. Modules
//! talk to each other only through canonical [`PlayerEvent`]s.
//!
//! A [`PlayerRegistry`] mounts controllers into slots and keeps at most one
//! of them playing.

pub mod api;
pub mod captions;
pub mod collections;
pub mod engine;
pub mod modules;
pub mod player;
pub mod storage;
pub mod utils;

pub use api::{HostApi, HttpHostApi, OfflineHostApi, SaveStatePayload};
pub use captions::{CaptionIndex, CaptionPayload};
pub use engine::{EngineFactory, PlaybackEngine, PlaybackMode};
pub use modules::{AnalyticsSink, FeatureModule, Services};
pub use player::{
    PlaybackCoordinator, PlaybackState, PlayerConfig, PlayerController, PlayerControllerBuilder, PlayerEvent,
    PlayerEventHandler, PlayerRegistry, SeekOrigin, Speed,
};
pub use storage::{PreferenceArea, PreferenceStore};
pub use utils::error::{PlayerError, Result};
