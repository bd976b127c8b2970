//! Exhibit - Virtual gallery host
//!
//! Entry point and main loop. Runs a guided tour over the headless audio
//! backend, driven by a fixed-period timer.
//!
//! Usage: `exhibit [CONFIG.json] [TOUR.json]`

mod demo;
mod host;

use anyhow::{Context, Result};
use exhibit_audio::{AudioEngine, HeadlessBackend};
use exhibit_core::{Clock, ExhibitConfig, GestureKind, SystemClock};
use exhibit_tour::{JsonFileStore, MemoryStore, TourController, TourStore};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::demo::{HostAction, DEMO_SCRIPT};
use crate::host::{LoggingCamera, LoggingListener};

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let config = match args.next().map(PathBuf::from) {
        Some(path) => ExhibitConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ExhibitConfig::default(),
    };
    init_logging(&config.log_filter)?;
    info!("Exhibit starting...");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let backend = HeadlessBackend::new(Arc::clone(&clock));
    demo::register_assets(&backend);

    let audio = Arc::new(Mutex::new(AudioEngine::new(
        Box::new(backend.clone()),
        Arc::clone(&clock),
        config.audio.clone(),
    )));

    let store: Box<dyn TourStore> = match args.next().map(PathBuf::from) {
        Some(path) => Box::new(JsonFileStore::new(path)),
        None => Box::new(MemoryStore::new()),
    };
    let mut tour = TourController::new(
        Arc::clone(&audio),
        Box::new(LoggingCamera::default()),
        Box::new(LoggingListener::default()),
        store,
        Arc::clone(&clock),
        config.tour.clone(),
    )
    .context("Failed to load tour")?;

    if tour.sequence().is_empty() {
        demo::author(&mut tour)?;
        tour.commit().context("Failed to save tour")?;
    }

    {
        let mut audio = audio.lock();
        audio.ensure_unlocked();
        // the visitor clicks "enter gallery"
        audio.on_user_gesture(GestureKind::Click);
        audio.play_background_loop(demo::AMBIENCE_URL, 0.4);
    }

    if !tour.start_playback() {
        info!("Nothing to play");
        return Ok(());
    }
    let started_at = clock.now_ms();
    let mut script = DEMO_SCRIPT.iter().peekable();

    let mut ticker = tokio::time::interval(Duration::from_millis(config.tour.tick_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    while tour.is_playing() {
        ticker.tick().await;
        let elapsed = clock.now_ms().saturating_sub(started_at);
        while let Some((_, action)) = script.next_if(|(at_ms, _)| *at_ms <= elapsed) {
            match action {
                HostAction::Pause => tour.pause_playback(),
                HostAction::Resume => tour.resume_playback(),
                HostAction::Hide => audio.lock().on_visibility_changed(false),
                HostAction::Show => audio.lock().on_visibility_changed(true),
            }
        }
        audio.lock().tick();
        tour.tick();
    }

    audio.lock().dispose();
    info!(
        connects = backend.connect_log().len(),
        "Exhibit finished"
    );
    Ok(())
}

fn init_logging(fallback: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .with_context(|| format!("Invalid log filter {:?}", fallback))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
