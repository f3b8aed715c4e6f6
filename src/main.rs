use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lectern::modules::{CaptionsModule, LogSink, Services};
use lectern::player::{PlaybackCoordinator, PlayerEventHandler};
use lectern::utils::AppConfig;
use lectern::{EngineFactory, HttpHostApi, PlayerConfig, PlayerEvent, PlayerRegistry, PreferenceArea};

/// Lectern - headless lecture video player
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Player configuration (JSON, as embedded in the host page)
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Video id the player is mounted under
    #[arg(long, default_value = "video")]
    id: String,

    /// Mount slot; defaults to the configured slot
    #[arg(long)]
    slot: Option<String>,

    /// Application config file (TOML)
    #[arg(long, value_name = "FILE")]
    app_config: Option<PathBuf>,

    /// Preference file, overriding the configured location
    #[arg(long, value_name = "FILE")]
    storage: Option<PathBuf>,

    /// Behave as a touch device
    #[arg(long)]
    touch: bool,

    /// Stop after this many seconds of wall time
    #[arg(long, value_name = "SECS")]
    play_for: Option<f64>,

    /// Playback speed to request after load
    #[arg(long)]
    speed: Option<String>,

    /// Volume (0-100) to set after load
    #[arg(short, long)]
    volume: Option<f64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let app_config = match &args.app_config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("Loading application config")?;

    let log_level = if args.debug { "debug" } else { app_config.general.log_level.as_str() };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    info!("Starting Lectern v{}", env!("CARGO_PKG_VERSION"));

    let json = std::fs::read_to_string(&args.config)
        .with_context(|| format!("Reading player config {:?}", args.config))?;
    let player_config = PlayerConfig::from_json(&json).context("Parsing player config")?;

    let storage = match args.storage.clone().or_else(|| app_config.storage_path()) {
        Some(path) => {
            debug!("Preferences at {:?}", path);
            PreferenceArea::open(&path)?
        }
        None => PreferenceArea::in_memory(),
    };

    let api = HttpHostApi::new(app_config.request_timeout(), app_config.host.base_url.clone())?;
    let services = Services {
        api: Arc::new(api),
        analytics: Arc::new(LogSink),
        engines: EngineFactory::default(),
        playback: PlaybackCoordinator::new(),
    };

    let mut registry = PlayerRegistry::new(services, storage.clone())
        .with_namespace(app_config.storage.namespace.clone())
        .touch_device(args.touch);

    let slot = args.slot.clone().unwrap_or_else(|| app_config.general.default_slot.clone());
    let player = registry.mount(&slot, &args.id, player_config);
    player.add_event_handler(Box::new(LoggingEventHandler));

    if player.engine().is_none() {
        error!("No playable source in {:?}", args.config);
        return Err(anyhow::anyhow!("No playable source"));
    }

    if let Some(speed) = &args.speed {
        if !player.set_speed(speed)? {
            warn!("Speed {} not applied", speed);
        }
    }
    if let Some(volume) = args.volume {
        if !player.set_volume(volume)? {
            warn!("Volume {} out of range", volume);
        }
    }

    registry.play(&slot)?;

    let deadline = args
        .play_for
        .map(|secs| tokio::time::Instant::now() + Duration::from_secs_f64(secs.max(0.0)));
    let mut interval = tokio::time::interval(app_config.tick_interval());
    let mut last_caption: Option<String> = None;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }

        let events = registry.tick();
        if events.iter().any(|(_, e)| *e == PlayerEvent::Ended) {
            info!("Playback finished");
            break;
        }

        let caption = registry
            .get(&slot)
            .and_then(|p| p.module::<CaptionsModule>())
            .and_then(|c| c.current_text())
            .map(str::to_string);
        if caption != last_caption {
            if let Some(text) = &caption {
                info!("[caption] {}", text);
            }
            last_caption = caption;
        }

        if deadline.map_or(false, |d| tokio::time::Instant::now() >= d) {
            info!("Play time elapsed");
            break;
        }
    }

    registry.unload_all().await;
    storage.flush()?;
    Ok(())
}

/// Event handler that logs events
struct LoggingEventHandler;

impl PlayerEventHandler for LoggingEventHandler {
    fn handle_event(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::TimeUpdate { time } => {
                // Position reports arrive several times a second
                debug!("Position: {:.2}s", time);
            }
            PlayerEvent::Play => info!("Playback started"),
            PlayerEvent::Pause => info!("Playback paused"),
            PlayerEvent::Ended => info!("End of media reached"),
            PlayerEvent::Seek { time, origin, .. } => info!("Seek to {:.2}s ({})", time, origin.as_str()),
            PlayerEvent::SpeedChange { speed, .. } => info!("Playback speed: {}", speed),
            PlayerEvent::VolumeChange { volume } => info!("Volume: {}%", volume),
            PlayerEvent::LanguageChange { language } => info!("Transcript language: {}", language),
            PlayerEvent::Error { message } => error!("Player error: {}", message),
            _ => {}
        }
    }
}
