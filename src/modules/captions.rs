//! Transcript panel
//!
//! Downloads the transcript for the current language, keeps the cue
//! matching the playback position highlighted and lets the viewer switch
//! languages, hide the panel or jump to a cue.
//!
//! A failed download walks a fallback chain before giving up: with
//! several configured languages the host is asked which transcripts exist
//! and the menu is pruned to those; with a single language and a provider
//! video id the download is retried against the provider transcript.
//! Otherwise the panel is hidden.

use crate::api::{transcript_url, DEFAULT_TRANSLATIONS_URL};
use crate::captions::{CaptionIndex, CaptionPayload};
use crate::modules::{FeatureModule, ModuleContext, TaskOutcome};
use crate::player::{keys, EventKind, LanguageMap, ModuleName, PlaybackMode, PlayerEvent, SeekOrigin};
use crate::utils::error::Result;
use log::{debug, info, warn};
use std::any::Any;

/// Shown instead of the transcript on touch devices until playback starts
pub const TOUCH_PLACEHOLDER: &str = "Transcript will be displayed when you start playing the video.";

/// Captions are looked up this far ahead of the playback position
const LOOKAHEAD_MS: i64 = 100;

#[derive(Debug, Default)]
pub struct CaptionsModule {
    /// Cues inside the playable region
    captions: Option<CaptionIndex>,

    /// Highlighted cue, relative to `captions`
    current: Option<usize>,

    /// Languages offered in the menu
    languages: LanguageMap,

    language: Option<String>,

    /// False once every way of getting a transcript failed
    available: bool,

    shown: bool,
    menu_open: bool,

    /// False on touch devices until the first play
    rendered: bool,

    /// Token of the request whose result is still wanted
    generation: u64,

    /// Whether the provider transcript was already tried
    tried_video_id: bool,
}

impl CaptionsModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn is_shown(&self) -> bool {
        self.available && self.shown
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu_open
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn languages(&self) -> &LanguageMap {
        &self.languages
    }

    pub fn captions(&self) -> Option<&CaptionIndex> {
        self.captions.as_ref()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_text(&self) -> Option<&str> {
        let index = self.current?;
        self.captions.as_ref()?.text(index)
    }

    /// Text shown in place of the transcript, if any
    pub fn placeholder(&self) -> Option<&'static str> {
        (self.available && !self.rendered).then_some(TOUCH_PLACEHOLDER)
    }

    /// Switch transcript language. The choice is remembered across
    /// players. Returns false for unknown or unchanged languages.
    pub fn set_language(&mut self, language: &str, ctx: &mut ModuleContext<'_>) -> bool {
        if !self.languages.contains(language) {
            debug!("Ignoring unknown transcript language {}", language);
            return false;
        }
        if self.language.as_deref() == Some(language) {
            return false;
        }

        info!("{}: transcript language -> {}", ctx.state().id, language);
        self.language = Some(language.to_string());
        self.tried_video_id = false;

        let state = ctx.state_mut();
        state.language = Some(language.to_string());
        state.storage.set_item(keys::LANGUAGE, language, false);

        ctx.emit(PlayerEvent::LanguageChange {
            language: language.to_string(),
        });
        self.fetch(None, ctx);
        true
    }

    pub fn toggle(&mut self, ctx: &mut ModuleContext<'_>) {
        if !self.available {
            return;
        }
        self.shown = !self.shown;
        ctx.emit(PlayerEvent::Captions { shown: self.shown });
    }

    pub fn show_language_menu(&mut self, shown: bool, ctx: &mut ModuleContext<'_>) {
        if self.menu_open == shown || (shown && self.languages.is_empty()) {
            return;
        }
        self.menu_open = shown;
        ctx.emit(PlayerEvent::LanguageMenu { shown });
    }

    /// Seek to the start of cue `index`
    pub fn seek_to_caption(&mut self, index: usize, ctx: &mut ModuleContext<'_>) -> bool {
        let Some(start_ms) = self.captions.as_ref().and_then(|c| c.start_time(index)) else {
            return false;
        };

        let mut time = start_ms as f64 / 1000.0;
        if ctx.scaled_time() {
            time /= ctx.state().speed.as_f64();
        }
        ctx.seek(time, SeekOrigin::Caption)
    }

    fn fetch(&mut self, video_id: Option<String>, ctx: &mut ModuleContext<'_>) {
        let (Some(base), Some(language)) = (ctx.state().config.transcript_url.clone(), self.language.clone()) else {
            self.hide(ctx);
            return;
        };

        self.generation += 1;
        self.captions = None;
        self.current = None;

        let video_id = video_id.or_else(|| {
            (ctx.state().playback_mode == Some(PlaybackMode::ExternalProvider))
                .then(|| ctx.state().config.provider_id())
                .flatten()
        });

        let url = transcript_url(&base, &language);
        let api = ctx.services().api.clone();
        debug!("Fetching transcript {} (videoId: {:?})", url, video_id);

        ctx.spawn(self.generation, async move {
            let result = api.fetch_transcript(&url, video_id.as_deref()).await;
            TaskOutcome::Transcript { language, result }
        });
    }

    fn fetch_translations(&mut self, ctx: &mut ModuleContext<'_>) {
        let url = ctx
            .state()
            .config
            .transcript_available_translations_url
            .clone()
            .unwrap_or_else(|| DEFAULT_TRANSLATIONS_URL.to_string());
        let api = ctx.services().api.clone();

        self.generation += 1;
        ctx.spawn(self.generation, async move {
            TaskOutcome::Translations(api.available_translations(&url).await)
        });
    }

    fn hide(&mut self, ctx: &mut ModuleContext<'_>) {
        if self.available {
            info!("{}: captions unavailable", ctx.state().id);
        }
        self.available = false;
        self.captions = None;
        self.current = None;
        self.menu_open = false;
    }

    fn loaded(&mut self, payload: CaptionPayload, ctx: &mut ModuleContext<'_>) -> Result<()> {
        let index = CaptionIndex::from_payload(payload)?;
        let bounds = ctx.state().bounds();
        let start_ms = (bounds.start * 1000.0).round() as i64;
        let end_ms = bounds.end.map(|e| (e * 1000.0).round() as i64);

        let bounded = index.bounded(start_ms, end_ms);
        debug!("Loaded {} cues ({} in range)", index.len(), bounded.len());

        self.captions = Some(bounded);
        self.available = true;
        let time = ctx.state().current_time;
        self.update_current(time, ctx);
        Ok(())
    }

    fn failed(&mut self, ctx: &mut ModuleContext<'_>) {
        let native = ctx.state().playback_mode == Some(PlaybackMode::NativeMedia);
        let provider_id = ctx.state().config.provider_id();

        if ctx.state().config.transcript_languages.len() > 1 {
            self.fetch_translations(ctx);
        } else if native && !self.tried_video_id && provider_id.is_some() {
            info!("Retrying transcript with provider video id");
            self.tried_video_id = true;
            self.fetch(provider_id, ctx);
        } else {
            self.hide(ctx);
        }
    }

    fn prune_languages(&mut self, codes: Vec<String>, ctx: &mut ModuleContext<'_>) {
        self.languages.retain_codes(&codes);
        if self.languages.is_empty() {
            self.hide(ctx);
            return;
        }

        let current = self.language.clone();
        match current {
            Some(lang) if !self.languages.contains(&lang) => {
                let fallback = self.languages.resolve(Some(&lang));
                info!("Transcript {} unavailable, falling back to {:?}", lang, fallback);
                self.language = fallback.clone();
                ctx.state_mut().language = fallback;
                self.fetch(None, ctx);
            }
            _ => self.hide(ctx),
        }
    }

    fn update_current(&mut self, time: f64, ctx: &ModuleContext<'_>) {
        if !self.rendered {
            return;
        }
        let Some(captions) = &self.captions else {
            return;
        };

        let time = ctx.state().unscaled_time(time, ctx.scaled_time());
        let time_ms = (time * 1000.0).round() as i64 + LOOKAHEAD_MS;
        let index = captions.search(time_ms);
        if index != self.current {
            self.current = index;
        }
    }
}

impl FeatureModule for CaptionsModule {
    fn name(&self) -> ModuleName {
        ModuleName::Captions
    }

    fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()> {
        let state = ctx.state();
        self.languages = state.config.transcript_languages.clone();
        self.language = state.language.clone();
        self.shown = state.config.show_captions;
        self.rendered = !state.is_touch;

        if self.language.is_none() || state.config.transcript_url.is_none() {
            debug!("{}: no transcript configured", state.id);
            return Ok(());
        }

        self.available = true;
        ctx.subscribe_all(&[EventKind::Play, EventKind::TimeUpdate, EventKind::Seek]);
        self.fetch(None, ctx);
        Ok(())
    }

    fn handle_event(&mut self, event: &PlayerEvent, ctx: &mut ModuleContext<'_>) -> Result<()> {
        match event {
            PlayerEvent::Play => {
                if !self.rendered {
                    self.rendered = true;
                    let time = ctx.state().current_time;
                    self.update_current(time, ctx);
                }
            }
            PlayerEvent::TimeUpdate { time } | PlayerEvent::Seek { time, .. } => self.update_current(*time, ctx),
            _ => {}
        }
        Ok(())
    }

    fn on_task_complete(&mut self, token: u64, outcome: TaskOutcome, ctx: &mut ModuleContext<'_>) -> Result<()> {
        if token != self.generation {
            debug!("Discarding superseded transcript result {}", token);
            return Ok(());
        }

        match outcome {
            TaskOutcome::Transcript { language, result } => match result {
                Ok(payload) => {
                    if let Err(e) = self.loaded(payload, ctx) {
                        warn!("Transcript {} is malformed: {}", language, e);
                        self.failed(ctx);
                    }
                }
                Err(e) => {
                    warn!("Transcript {} could not be fetched: {}", language, e);
                    self.failed(ctx);
                }
            },
            TaskOutcome::Translations(Ok(codes)) => self.prune_languages(codes, ctx),
            TaskOutcome::Translations(Err(e)) => {
                warn!("Available translations could not be fetched: {}", e);
                self.hide(ctx);
            }
            TaskOutcome::Posted(_) => {}
        }
        Ok(())
    }

    fn destroy(&mut self, _ctx: &mut ModuleContext<'_>) {
        self.generation += 1;
        self.captions = None;
        self.current = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
