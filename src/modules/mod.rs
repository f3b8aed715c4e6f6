//! Feature modules
//!
//! Every player feature (controls, captions, save-state, analytics, ...) is
//! a [`FeatureModule`]. Modules are attached to a player in a fixed order,
//! subscribe to the event kinds they care about and react through a
//! [`ModuleContext`], which gives them access to the player state, the
//! engine, host services and the event outbox for the duration of one
//! call.

pub mod analytics;
pub mod bumper;
pub mod captions;
pub mod completion;
pub mod control_bar;
pub mod progress;
pub mod quality;
pub mod save_state;
pub mod speed;
pub mod volume;

pub use analytics::{AnalyticsModule, AnalyticsSink, LogSink, MemorySink};
pub use bumper::{BumperPhase, BumperSequencer};
pub use captions::CaptionsModule;
pub use completion::CompletionModule;
pub use control_bar::ControlBar;
pub use progress::ProgressSlider;
pub use quality::QualityControl;
pub use save_state::SaveStateModule;
pub use speed::SpeedControl;
pub use volume::VolumeControl;

use crate::api::{HostApi, OfflineHostApi};
use crate::captions::CaptionPayload;
use crate::engine::{EngineFactory, PlaybackEngine};
use parking_lot::MutexGuard;
use crate::player::{
    EventKind, ModuleName, PlaybackCoordinator, PlayerEvent, PlayerState, SeekOrigin, SubscriptionId,
};
use crate::player::controller::PlayerCore;
use crate::utils::error::Result;
use log::warn;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

/// Host-side services shared by a player and its nested players
#[derive(Clone)]
pub struct Services {
    /// Host REST API
    pub api: Arc<dyn HostApi>,

    /// Analytics event sink
    pub analytics: Arc<dyn AnalyticsSink>,

    /// Engine selection
    pub engines: EngineFactory,

    /// Keeps players sharing these services from playing at once
    pub playback: PlaybackCoordinator,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            api: Arc::new(OfflineHostApi),
            analytics: Arc::new(LogSink),
            engines: EngineFactory::default(),
            playback: PlaybackCoordinator::new(),
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

/// Result of a background task started by a module
#[derive(Debug)]
pub enum TaskOutcome {
    /// A transcript download finished
    Transcript {
        language: String,
        result: Result<CaptionPayload>,
    },

    /// The available-translations request finished
    Translations(Result<Vec<String>>),

    /// A POST to the host finished
    Posted(Result<()>),
}

/// A finished task, routed back to the module that started it
#[derive(Debug)]
pub struct Completion {
    pub module: ModuleName,

    /// Module-chosen token, used to discard superseded work
    pub token: u64,

    pub outcome: TaskOutcome,
}

/// A player feature
pub trait FeatureModule: Send + Any {
    fn name(&self) -> ModuleName;

    /// Subscribe to events and read initial configuration. An error leaves
    /// the module detached while the rest of the player carries on.
    fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()>;

    /// React to an event this module subscribed to
    fn handle_event(&mut self, event: &PlayerEvent, ctx: &mut ModuleContext<'_>) -> Result<()>;

    /// Called on every controller tick
    fn on_tick(&mut self, _now: Instant, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called when a task spawned through [`ModuleContext::spawn`] finishes
    fn on_task_complete(&mut self, _token: u64, _outcome: TaskOutcome, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Release resources. Subscriptions are removed by the controller.
    fn destroy(&mut self, ctx: &mut ModuleContext<'_>);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// What a module may touch while handling one call
pub struct ModuleContext<'a> {
    core: &'a mut PlayerCore,
    module: ModuleName,
}

impl<'a> ModuleContext<'a> {
    pub(crate) fn new(core: &'a mut PlayerCore, module: ModuleName) -> Self {
        Self { core, module }
    }

    pub fn module(&self) -> ModuleName {
        self.module
    }

    pub fn state(&self) -> &PlayerState {
        &self.core.state
    }

    pub fn state_mut(&mut self) -> &mut PlayerState {
        &mut self.core.state
    }

    /// The playback engine, if one could be created. Release the guard
    /// before calling back into the context.
    pub fn engine(&self) -> Option<MutexGuard<'_, Box<dyn PlaybackEngine>>> {
        self.core.engine.as_ref().map(|e| e.lock())
    }

    /// Whether the engine reports speed-scaled time
    pub fn scaled_time(&self) -> bool {
        self.engine().map_or(false, |e| e.reports_scaled_time())
    }

    /// Start the engine after pausing whichever player is active
    pub fn play(&mut self) -> bool {
        self.core.start()
    }

    pub fn services(&self) -> &Services {
        &self.core.services
    }

    /// Queue an event for delivery after the current one
    pub fn emit(&mut self, event: PlayerEvent) {
        self.core.outbox.push_back(event);
    }

    pub fn subscribe(&mut self, kind: EventKind) -> SubscriptionId {
        self.core.bus.subscribe(self.module, kind)
    }

    pub fn subscribe_all(&mut self, kinds: &[EventKind]) {
        for kind in kinds {
            self.core.bus.subscribe(self.module, *kind);
        }
    }

    pub fn unsubscribe_all(&mut self) -> usize {
        self.core.bus.unsubscribe_module(self.module)
    }

    /// Seek the engine, tagging the resulting event with `origin`
    pub fn seek(&mut self, time: f64, origin: SeekOrigin) -> bool {
        self.core.seek(time, origin)
    }

    /// Run `task` in the background; its outcome comes back through
    /// [`FeatureModule::on_task_complete`] with `token`.
    ///
    /// Without a tokio runtime the task is dropped with a warning.
    pub fn spawn<F>(&mut self, token: u64, task: F)
    where
        F: Future<Output = TaskOutcome> + Send + 'static,
    {
        let module = self.module;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                self.core.tasks.spawn_on(
                    async move {
                        Completion {
                            module,
                            token,
                            outcome: task.await,
                        }
                    },
                    &handle,
                );
            }
            Err(_) => warn!("{}: no async runtime, dropping background task", module),
        }
    }

    pub fn now(&self) -> Instant {
        Instant::now()
    }
}
