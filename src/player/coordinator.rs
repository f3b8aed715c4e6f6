//! Single active player
//!
//! Players that share a [`PlaybackCoordinator`] never play at the same
//! time. A player claims the coordinator right before it starts its engine;
//! the claim pauses whichever engine held it before. The paused player
//! learns about it from its own engine on its next pump.

use crate::engine::{PlaybackEngine, SharedEngine};
use log::debug;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

struct Holder {
    id: String,
    engine: Weak<Mutex<Box<dyn PlaybackEngine>>>,
}

impl Holder {
    fn is(&self, engine: &SharedEngine) -> bool {
        std::ptr::eq(self.engine.as_ptr(), Arc::as_ptr(engine))
    }
}

/// Tracks which engine may play
#[derive(Clone, Default)]
pub struct PlaybackCoordinator {
    holder: Arc<Mutex<Option<Holder>>>,
}

impl PlaybackCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `engine` the active one, pausing the previous holder first.
    ///
    /// Must not be called while `engine` is locked.
    pub fn claim(&self, id: &str, engine: &SharedEngine) {
        let mut holder = self.holder.lock();

        if let Some(previous) = holder.as_ref().filter(|h| !h.is(engine)) {
            if let Some(other) = previous.engine.upgrade() {
                debug!("Pausing {} before {} plays", previous.id, id);
                other.lock().pause();
            }
        }

        *holder = Some(Holder {
            id: id.to_string(),
            engine: Arc::downgrade(engine),
        });
    }

    /// Whether another engine has claimed playback since `engine` did
    pub fn is_preempted(&self, engine: &SharedEngine) -> bool {
        self.holder.lock().as_ref().map_or(false, |h| !h.is(engine))
    }

    /// Give up the claim if `engine` holds it
    pub fn release(&self, engine: &SharedEngine) {
        let mut holder = self.holder.lock();
        if holder.as_ref().map_or(false, |h| h.is(engine)) {
            *holder = None;
        }
    }

    /// Id of the player that claimed last
    pub fn holder(&self) -> Option<String> {
        self.holder.lock().as_ref().map(|h| h.id.clone())
    }
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCoordinator").field("holder", &self.holder()).finish()
    }
}
