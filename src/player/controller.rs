//! Player controller for Lectern
//!
//! [`PlayerController`] composes one player: it owns the state, the
//! playback engine and the attached feature modules, translates engine
//! reports into [`PlayerEvent`]s and delivers them to modules and external
//! handlers. Everything runs on the caller's thread; background work
//! (network requests) runs on the tokio runtime and is handed back to the
//! owning module by [`PlayerController::pump`].

use crate::engine::{EngineEvent, EngineState, MediaSource, PlaybackEngine, PlaybackMode, SharedEngine};
use crate::modules::{
    AnalyticsModule, BumperSequencer, CaptionsModule, Completion, CompletionModule, ControlBar, FeatureModule,
    ModuleContext, ProgressSlider, QualityControl, SaveStateModule, Services, SpeedControl, VolumeControl,
};
use crate::player::{
    EventBus, ModuleName, PlaybackState, PlayerConfig, PlayerEvent, PlayerEventHandler, PlayerState, SeekOrigin,
    Speed, MAX_EVENTS_PER_DISPATCH,
};
use crate::storage::{PreferenceArea, PreferenceStore};
use crate::utils::error::{PlayerError, Result};
use log::{debug, info, warn};
use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Engine polls and task completions handled by one [`PlayerController::pump`]
const MAX_PUMP_ROUNDS: usize = 16;

/// Delivered events kept until [`PlayerController::take_events`] is called
const MAX_UNREAD_EVENTS: usize = 1024;

/// Default storage namespace
pub const DEFAULT_NAMESPACE: &str = "VideoPlayer";

/// Everything modules may reach through a [`ModuleContext`]
pub(crate) struct PlayerCore {
    pub(crate) state: PlayerState,
    pub(crate) engine: Option<SharedEngine>,
    pub(crate) services: Services,
    pub(crate) bus: EventBus,
    pub(crate) outbox: VecDeque<PlayerEvent>,
    pub(crate) tasks: JoinSet<Completion>,

    /// Origin of the seek the engine has not confirmed yet
    pending_seek: Option<SeekOrigin>,
}

impl PlayerCore {
    pub(crate) fn seek(&mut self, time: f64, origin: SeekOrigin) -> bool {
        let Some(engine) = self.engine.as_ref() else {
            debug!("{}: no engine, ignoring seek to {}", self.state.id, time);
            return false;
        };

        let applied = engine.lock().seek_to(time);
        if applied {
            self.pending_seek = Some(origin);
        }
        applied
    }

    /// Pause the active player, then start this engine. Returns false
    /// without an engine.
    pub(crate) fn start(&self) -> bool {
        let Some(engine) = self.engine.as_ref() else {
            return false;
        };
        self.services.playback.claim(&self.state.id, engine);
        engine.lock().play();
        true
    }

    /// Take over playback when the engine started on its own
    fn claim_if_playing(&self) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let playing = engine.lock().player_state() == EngineState::Playing;
        if playing {
            self.services.playback.claim(&self.state.id, engine);
        }
    }

    /// Whether another player started since this one did
    fn is_preempted(&self) -> bool {
        self.engine
            .as_ref()
            .map_or(false, |e| self.services.playback.is_preempted(e))
    }
}

/// Builder for [`PlayerController`]
pub struct PlayerControllerBuilder {
    config: PlayerConfig,
    services: Services,
    storage: Option<Arc<PreferenceArea>>,
    namespace: String,
    is_touch: bool,
    nested: bool,
    event_handlers: Vec<Box<dyn PlayerEventHandler>>,
}

impl Default for PlayerControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerControllerBuilder {
    pub fn new() -> Self {
        Self {
            config: PlayerConfig::default(),
            services: Services::default(),
            storage: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            is_touch: false,
            nested: false,
            event_handlers: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace every host service at once
    pub fn with_services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    pub fn with_api(mut self, api: Arc<dyn crate::api::HostApi>) -> Self {
        self.services.api = api;
        self
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn crate::modules::AnalyticsSink>) -> Self {
        self.services.analytics = analytics;
        self
    }

    pub fn with_engine_factory(mut self, engines: crate::engine::EngineFactory) -> Self {
        self.services.engines = engines;
        self
    }

    /// Preference area shared with other players; defaults to a private
    /// in-memory area
    pub fn with_storage(mut self, area: Arc<PreferenceArea>) -> Self {
        self.storage = Some(area);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn touch_device(mut self, is_touch: bool) -> Self {
        self.is_touch = is_touch;
        self
    }

    /// Add an event handler
    pub fn with_event_handler(mut self, handler: Box<dyn PlayerEventHandler>) -> Self {
        self.event_handlers.push(handler);
        self
    }

    /// Build a reduced player for a pre-roll bumper
    pub(crate) fn nested(mut self) -> Self {
        self.nested = true;
        self
    }

    /// Build and mount the player.
    ///
    /// This never fails: a player whose engine cannot be created still
    /// mounts, with `playback_mode` left unset, and modules that fail to
    /// attach are skipped.
    pub fn build(self, id: impl Into<String>) -> PlayerController {
        let id = id.into();
        info!("Mounting player {}", id);

        let area = self.storage.unwrap_or_else(PreferenceArea::in_memory);
        let storage = PreferenceStore::new(area, self.namespace, id.clone());
        let mut state = PlayerState::new(id.clone(), self.config, storage, self.is_touch);

        let source = MediaSource {
            sources: state.config.sources.clone(),
            provider_id: state.config.provider_id(),
            duration: state.config.duration,
        };

        let engine = match self.services.engines.create(&source) {
            Ok(selection) => {
                state.playback_mode = Some(selection.mode);
                state.youtube_is_available = selection.provider_available;
                Some(Arc::new(Mutex::new(selection.engine)))
            }
            Err(e) => {
                warn!("{}: no playback engine: {}", id, e);
                None
            }
        };

        let candidates = candidate_modules(&state, self.nested);

        let mut controller = PlayerController {
            core: PlayerCore {
                state,
                engine,
                services: self.services,
                bus: EventBus::new(),
                outbox: VecDeque::new(),
                tasks: JoinSet::new(),
                pending_seek: None,
            },
            modules: Vec::with_capacity(candidates.len()),
            handlers: self.event_handlers,
            unread: VecDeque::new(),
            ready_seen: false,
            destroyed: false,
        };

        for module in candidates {
            controller.attach(module);
        }

        controller.pump_inner();
        controller
    }
}

/// Modules for a player, in attach order
fn candidate_modules(state: &PlayerState, nested: bool) -> Vec<Box<dyn FeatureModule>> {
    let mut modules: Vec<Box<dyn FeatureModule>> = vec![Box::new(ControlBar::new())];

    if nested {
        modules.push(Box::new(VolumeControl::new()));
        modules.push(Box::new(AnalyticsModule::new()));
        return modules;
    }

    if state.playback_mode == Some(PlaybackMode::ExternalProvider) {
        modules.push(Box::new(QualityControl::new()));
    }
    modules.push(Box::new(ProgressSlider::new()));
    modules.push(Box::new(VolumeControl::new()));
    modules.push(Box::new(SpeedControl::new()));
    modules.push(Box::new(CaptionsModule::new()));
    modules.push(Box::new(SaveStateModule::new()));
    modules.push(Box::new(AnalyticsModule::new()));

    let config = &state.config;
    if config.completion_enabled && config.publish_completion_url.is_some() {
        modules.push(Box::new(CompletionModule::new()));
    }
    if config.bumper.is_some() {
        modules.push(Box::new(BumperSequencer::new()));
    }

    modules
}

/// One mounted player
pub struct PlayerController {
    core: PlayerCore,
    modules: Vec<Box<dyn FeatureModule>>,
    handlers: Vec<Box<dyn PlayerEventHandler>>,
    unread: VecDeque<PlayerEvent>,
    ready_seen: bool,
    destroyed: bool,
}

impl PlayerController {
    pub fn builder() -> PlayerControllerBuilder {
        PlayerControllerBuilder::new()
    }

    pub fn id(&self) -> &str {
        &self.core.state.id
    }

    pub fn state(&self) -> &PlayerState {
        &self.core.state
    }

    pub fn engine(&self) -> Option<MutexGuard<'_, Box<dyn PlaybackEngine>>> {
        self.core.engine.as_ref().map(|e| e.lock())
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether the main media or a bumper in front of it is playing. A
    /// player paused by another one starting reads as not playing right
    /// away, before its engine's pause is pumped.
    pub fn is_playing(&self) -> bool {
        let main = self.core.state.is_playing() && !self.core.is_preempted();
        main || self.module::<BumperSequencer>().map_or(false, |b| b.is_playing())
    }

    /// Attached module of type `M`
    pub fn module<M: FeatureModule>(&self) -> Option<&M> {
        self.modules.iter().find_map(|m| m.as_any().downcast_ref::<M>())
    }

    pub fn module_mut<M: FeatureModule>(&mut self) -> Option<&mut M> {
        self.modules.iter_mut().find_map(|m| m.as_any_mut().downcast_mut::<M>())
    }

    /// Add an event handler after mounting
    pub fn add_event_handler(&mut self, handler: Box<dyn PlayerEventHandler>) {
        self.handlers.push(handler);
    }

    /// Start playback, or the bumper while one is showing. Any other
    /// player sharing this player's services is paused first.
    ///
    /// Ignored until the engine is ready.
    pub fn play(&mut self) -> Result<()> {
        self.ensure_live()?;
        let routed = self.with_module::<BumperSequencer, _>(|b, _| b.play()).unwrap_or(false);
        if !routed {
            self.engine_handle()?;
            if self.core.state.playback_state == PlaybackState::Unstarted {
                debug!("{}: not ready, ignoring play", self.id());
                return Ok(());
            }
            self.core.start();
        }
        self.pump_inner();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure_live()?;
        let routed = self.with_module::<BumperSequencer, _>(|b, _| b.pause()).unwrap_or(false);
        if !routed {
            self.engine_handle()?.lock().pause();
        }
        self.pump_inner();
        Ok(())
    }

    pub fn toggle_playback(&mut self) -> Result<()> {
        if self.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Seek to `time` seconds. Returns whether the engine accepted it.
    pub fn seek(&mut self, time: f64, origin: SeekOrigin) -> Result<bool> {
        self.ensure_live()?;
        let applied = self.core.seek(time, origin);
        self.pump_inner();
        Ok(applied)
    }

    /// Change speed from its string form. Unparsable values are ignored.
    pub fn set_speed(&mut self, speed: &str) -> Result<bool> {
        self.ensure_live()?;
        let Some(requested) = Speed::parse(speed) else {
            debug!("{}: ignoring unparsable speed {:?}", self.id(), speed);
            return Ok(false);
        };
        let changed = self
            .with_module::<SpeedControl, _>(|m, ctx| m.set_speed(requested, true, ctx))
            .unwrap_or(false);
        self.pump_inner();
        Ok(changed)
    }

    /// Move to the next speed, wrapping around
    pub fn cycle_speed(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.with_module::<SpeedControl, _>(|m, ctx| m.cycle(ctx));
        self.pump_inner();
        Ok(())
    }

    /// Set volume on a 0-100 scale; out-of-range values are ignored
    pub fn set_volume(&mut self, volume: f64) -> Result<bool> {
        self.ensure_live()?;
        let applied = self
            .with_module::<VolumeControl, _>(|m, ctx| m.set_volume(volume, ctx))
            .unwrap_or(false);
        self.pump_inner();
        Ok(applied)
    }

    /// Step volume up or down by one notch
    pub fn step_volume(&mut self, up: bool) -> Result<()> {
        self.ensure_live()?;
        self.with_module::<VolumeControl, _>(|m, ctx| m.step(up, ctx));
        self.pump_inner();
        Ok(())
    }

    pub fn toggle_mute(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.with_module::<VolumeControl, _>(|m, ctx| m.toggle_mute(ctx));
        self.pump_inner();
        Ok(())
    }

    /// Switch between HD and SD on the external provider
    pub fn toggle_quality(&mut self) -> Result<bool> {
        self.ensure_live()?;
        let applied = self
            .with_module::<QualityControl, _>(|m, ctx| m.toggle(ctx))
            .unwrap_or(false);
        self.pump_inner();
        Ok(applied)
    }

    /// Switch transcript language
    pub fn set_language(&mut self, language: &str) -> Result<bool> {
        self.ensure_live()?;
        let changed = self
            .with_module::<CaptionsModule, _>(|m, ctx| m.set_language(language, ctx))
            .unwrap_or(false);
        self.pump_inner();
        Ok(changed)
    }

    pub fn toggle_captions(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.with_module::<CaptionsModule, _>(|m, ctx| m.toggle(ctx));
        self.pump_inner();
        Ok(())
    }

    pub fn show_language_menu(&mut self, shown: bool) -> Result<()> {
        self.ensure_live()?;
        self.with_module::<CaptionsModule, _>(|m, ctx| m.show_language_menu(shown, ctx));
        self.pump_inner();
        Ok(())
    }

    /// Jump to the start of caption `index`
    pub fn seek_to_caption(&mut self, index: usize) -> Result<bool> {
        self.ensure_live()?;
        let applied = self
            .with_module::<CaptionsModule, _>(|m, ctx| m.seek_to_caption(index, ctx))
            .unwrap_or(false);
        self.pump_inner();
        Ok(applied)
    }

    pub fn begin_drag(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.with_module::<ProgressSlider, _>(|m, ctx| m.begin_drag(ctx));
        Ok(())
    }

    /// Release the progress slider at `time`
    pub fn end_drag(&mut self, time: f64) -> Result<bool> {
        self.ensure_live()?;
        let applied = self
            .with_module::<ProgressSlider, _>(|m, ctx| m.end_drag(time, ctx))
            .unwrap_or(false);
        self.pump_inner();
        Ok(applied)
    }

    /// Skip the bumper, optionally never showing it again
    pub fn skip_bumper(&mut self, do_not_show_again: bool) -> Result<bool> {
        self.ensure_live()?;
        let skipped = self
            .with_module::<BumperSequencer, _>(|m, ctx| m.skip(do_not_show_again, ctx))
            .unwrap_or(false);
        self.pump_inner();
        Ok(skipped)
    }

    /// Advance timers and collect engine reports. Returns the events
    /// delivered since the last call to [`take_events`](Self::take_events).
    pub fn tick(&mut self) -> Vec<PlayerEvent> {
        if self.destroyed {
            return Vec::new();
        }

        let now = Instant::now();
        let core = &mut self.core;
        for module in self.modules.iter_mut() {
            let name = module.name();
            let mut ctx = ModuleContext::new(core, name);
            if let Err(e) = module.on_tick(now, &mut ctx) {
                warn!("{}: {} tick failed: {}", core.state.id, name, e);
            }
        }

        self.pump()
    }

    /// Deliver pending engine reports and finished tasks. Returns the
    /// events delivered since the last call to
    /// [`take_events`](Self::take_events).
    pub fn pump(&mut self) -> Vec<PlayerEvent> {
        self.pump_inner();
        self.take_events()
    }

    /// Events delivered and not yet taken
    pub fn take_events(&mut self) -> Vec<PlayerEvent> {
        self.unread.drain(..).collect()
    }

    /// Wait for every background task and deliver the results
    pub async fn settle(&mut self) {
        loop {
            self.pump_inner();
            if self.destroyed || self.core.tasks.is_empty() {
                break;
            }
            match self.core.tasks.join_next().await {
                Some(Ok(completion)) => self.complete(completion),
                Some(Err(e)) => warn!("{}: background task failed: {}", self.id(), e),
                None => break,
            }
        }
    }

    /// Save state one last time, then destroy the player
    pub async fn unload(&mut self) {
        if self.destroyed {
            return;
        }

        let last = self
            .with_module::<SaveStateModule, _>(|m, ctx| m.prepare_unload(ctx))
            .flatten();

        if let Some((url, payload)) = last {
            let api = self.core.services.api.clone();
            if let Err(e) = api.save_state(&url, &payload).await {
                warn!("{}: final save-state failed: {}", self.id(), e);
            }
        }

        self.destroy();
    }

    /// Detach a single module
    pub fn detach(&mut self, name: ModuleName) -> bool {
        let Some(index) = self.modules.iter().position(|m| m.name() == name) else {
            return false;
        };

        let mut module = self.modules.remove(index);
        self.teardown(module.as_mut());
        true
    }

    /// Tear the player down. Modules are destroyed in reverse attach
    /// order; calling this twice is harmless.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        info!("Destroying player {}", self.id());

        while let Some(mut module) = self.modules.pop() {
            self.teardown(module.as_mut());
        }

        if let Some(engine) = self.core.engine.as_ref() {
            engine.lock().destroy();
            self.core.services.playback.release(engine);
        }

        // Results of in-flight requests are never delivered.
        self.core.tasks.detach_all();
        self.core.outbox.clear();
    }

    fn teardown(&mut self, module: &mut dyn FeatureModule) {
        let name = module.name();
        let mut ctx = ModuleContext::new(&mut self.core, name);
        module.destroy(&mut ctx);
        self.core.bus.unsubscribe_module(name);
        self.core.state.mark_detached(name);
        debug!("{}: detached {}", self.core.state.id, name);
    }

    fn attach(&mut self, mut module: Box<dyn FeatureModule>) {
        let name = module.name();
        let mut ctx = ModuleContext::new(&mut self.core, name);
        match module.attach(&mut ctx) {
            Ok(()) => {
                self.core.state.mark_attached(name);
                self.modules.push(module);
            }
            Err(e) => {
                warn!("{}: {} failed to attach: {}", self.core.state.id, name, e);
                self.core.bus.unsubscribe_module(name);
            }
        }
    }

    /// Run `f` against the attached module of type `M`
    fn with_module<M: FeatureModule, R>(&mut self, f: impl FnOnce(&mut M, &mut ModuleContext<'_>) -> R) -> Option<R> {
        let core = &mut self.core;
        let module = self
            .modules
            .iter_mut()
            .find_map(|m| m.as_any_mut().downcast_mut::<M>())?;
        let name = module.name();
        let mut ctx = ModuleContext::new(core, name);
        Some(f(module, &mut ctx))
    }

    fn ensure_live(&self) -> Result<()> {
        if self.destroyed {
            Err(PlayerError::InvalidInput(format!("Player {} is destroyed", self.id())))
        } else {
            Ok(())
        }
    }

    fn engine_handle(&self) -> Result<&SharedEngine> {
        self.core
            .engine
            .as_ref()
            .ok_or_else(|| PlayerError::Engine(format!("Player {} has no playback engine", self.id())))
    }

    fn pump_inner(&mut self) {
        if self.destroyed {
            return;
        }

        for round in 0..MAX_PUMP_ROUNDS {
            self.collect_engine_events(round == 0);
            let completed = self.collect_completions();
            if self.core.outbox.is_empty() && completed == 0 {
                break;
            }
            self.dispatch();
            if self.destroyed {
                break;
            }
        }
    }

    /// Translate engine reports into player events. Position reports are
    /// only taken on the first round of a pump.
    fn collect_engine_events(&mut self, with_time: bool) {
        let events = match self.core.engine.as_ref() {
            Some(engine) => engine.lock().poll_events(),
            None => return,
        };

        for event in events {
            match event {
                EngineEvent::Ready => self.core.outbox.push_back(PlayerEvent::Ready),
                EngineEvent::StateChange(EngineState::Playing) => self.core.outbox.push_back(PlayerEvent::Play),
                EngineEvent::StateChange(EngineState::Paused) => self.core.outbox.push_back(PlayerEvent::Pause),
                EngineEvent::StateChange(EngineState::Ended) => self.core.outbox.push_back(PlayerEvent::Ended),
                EngineEvent::StateChange(_) => {}
                EngineEvent::TimeUpdate(time) => {
                    if with_time {
                        self.core.outbox.push_back(PlayerEvent::TimeUpdate { time });
                    }
                }
                EngineEvent::Seeked { from, to } => {
                    let origin = self.core.pending_seek.take().unwrap_or(SeekOrigin::External);
                    self.core.outbox.push_back(PlayerEvent::Seek {
                        time: to,
                        previous: from,
                        origin,
                    });
                }
                EngineEvent::RateChange(rate) => {
                    let Some(speed) = Speed::from_f64(rate) else { continue };
                    if speed != self.core.state.speed {
                        debug!("{}: engine changed rate to {}", self.core.state.id, speed);
                        self.with_module::<SpeedControl, _>(|m, ctx| m.set_speed(speed, false, ctx));
                    }
                }
                EngineEvent::VolumeChange(volume) => {
                    if volume != self.core.state.volume {
                        self.core.state.volume = volume;
                        self.core.state.muted = volume == 0;
                        self.core.outbox.push_back(PlayerEvent::VolumeChange { volume });
                    }
                }
                EngineEvent::QualityChange(quality) => {
                    self.core.outbox.push_back(PlayerEvent::QualityChange { quality })
                }
                EngineEvent::Error(message) => {
                    warn!("{}: engine error: {}", self.core.state.id, message);
                    self.core.outbox.push_back(PlayerEvent::Error { message });
                }
            }
        }
    }

    fn collect_completions(&mut self) -> usize {
        let mut count = 0;
        while let Some(result) = self.core.tasks.try_join_next() {
            count += 1;
            match result {
                Ok(completion) => self.complete(completion),
                Err(e) => warn!("{}: background task failed: {}", self.core.state.id, e),
            }
        }
        count
    }

    /// Hand a finished task to the module that started it
    fn complete(&mut self, completion: Completion) {
        let core = &mut self.core;
        let Some(module) = self.modules.iter_mut().find(|m| m.name() == completion.module) else {
            debug!("{}: dropping result for detached {}", core.state.id, completion.module);
            return;
        };

        let mut ctx = ModuleContext::new(core, completion.module);
        if let Err(e) = module.on_task_complete(completion.token, completion.outcome, &mut ctx) {
            warn!("{}: {} failed to handle task result: {}", core.state.id, completion.module, e);
        }
    }

    /// Deliver queued events, breadth first
    fn dispatch(&mut self) {
        let mut delivered = 0;

        while let Some(event) = self.core.outbox.pop_front() {
            if delivered >= MAX_EVENTS_PER_DISPATCH {
                warn!(
                    "{}: dispatch limit reached, dropping {} events",
                    self.core.state.id,
                    self.core.outbox.len() + 1
                );
                self.core.outbox.clear();
                break;
            }

            if !self.react(&event) {
                continue;
            }

            let kind = event.kind();
            let core = &mut self.core;
            for module in self.modules.iter_mut() {
                let name = module.name();
                if !core.bus.is_subscribed(name, kind) {
                    continue;
                }
                let mut ctx = ModuleContext::new(core, name);
                if let Err(e) = module.handle_event(&event, &mut ctx) {
                    warn!("{}: {} failed on {}: {}", core.state.id, name, kind, e);
                }
            }

            for handler in self.handlers.iter_mut() {
                handler.handle_event(&event);
            }

            if self.unread.len() >= MAX_UNREAD_EVENTS {
                self.unread.pop_front();
            }
            self.unread.push_back(event);
            delivered += 1;
        }
    }

    /// Core bookkeeping before modules see `event`. Returns false for
    /// events that changed nothing and are not delivered.
    fn react(&mut self, event: &PlayerEvent) -> bool {
        let core = &mut self.core;

        match event {
            PlayerEvent::Ready => {
                if self.ready_seen {
                    return false;
                }
                self.ready_seen = true;
                core.state.transition(event);

                let speed = core.state.speed.as_f64();
                let volume = if core.state.muted { 0 } else { core.state.volume };
                if let Some(engine) = core.engine.as_ref() {
                    let mut engine = engine.lock();
                    if let Some(duration) = engine.duration() {
                        core.state.duration = Some(duration);
                    }
                    engine.set_playback_rate(speed);
                    engine.set_volume(f64::from(volume));
                }

                let resume = core.state.resume_position();
                if resume > 0.0 {
                    core.seek(resume, SeekOrigin::Resume);
                }
                true
            }
            PlayerEvent::Play => {
                let started = core.state.transition(event).is_some();
                if started {
                    core.claim_if_playing();
                }
                started
            }
            PlayerEvent::Pause => core.state.transition(event).is_some(),
            PlayerEvent::Ended => {
                core.state.clear_bounds();
                if let Some(duration) = core.state.duration {
                    core.state.current_time = duration;
                }
                core.state.transition(event).is_some()
            }
            PlayerEvent::TimeUpdate { time } => {
                core.state.current_time = *time;
                let scaled = core.engine.as_ref().map_or(false, |e| e.lock().reports_scaled_time());
                let position = core.state.unscaled_time(*time, scaled);

                if let Some(end) = core.state.bounds().active_end() {
                    if position >= end {
                        info!("{}: reached end bound at {}", core.state.id, end);
                        if let Some(engine) = core.engine.as_ref() {
                            engine.lock().pause();
                        }
                        core.state.clear_bounds();
                    }
                }
                true
            }
            PlayerEvent::Seek { time, origin, .. } => {
                core.state.current_time = *time;
                if origin.is_user() {
                    core.state.clear_bounds();
                }
                true
            }
            _ => true,
        }
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for PlayerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerController")
            .field("id", &self.core.state.id)
            .field("playback_state", &self.core.state.playback_state)
            .field("modules", &self.core.state.attached_modules())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}
