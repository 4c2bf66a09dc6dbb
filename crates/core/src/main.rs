use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use tatami_core::config::{ConfigLoader, ConfigValidator, ConfigWatcher, Settings};
use tatami_core::events::{self, Event};
use tatami_core::manager::{Engine, FULL_SCAN_INTERVAL, GEOMETRY_POLL_INTERVAL};
use tatami_core::port;

#[tokio::main]
async fn main() -> Result<()> {
    initialize_logging();

    info!("=============================================");
    info!("Starting tatami v{}", env!("CARGO_PKG_VERSION"));
    info!("=============================================");

    let running = Arc::new(AtomicBool::new(true));
    let running_flag = running.clone();
    ctrlc::set_handler(move || {
        info!("received interrupt, shutting down");
        running_flag.store(false, Ordering::SeqCst);
    })?;

    let loader = ConfigLoader::new()?;
    let settings = match loader.load() {
        Ok(settings) => settings,
        Err(err) => {
            warn!(error = %err, "settings unreadable, starting with defaults");
            Settings::default()
        }
    };
    let (settings, problems) = ConfigValidator::sanitize(settings, &Settings::default());
    for problem in &problems {
        warn!(%problem, "settings field rejected");
    }

    let port = match port::system_port() {
        Ok(port) => port,
        Err(err) => {
            error!(error = %err, "cannot start window management");
            return Err(err.into());
        }
    };

    let (events_tx, mut events_rx) = events::channel();
    let mut engine = Engine::new(port, settings.clone(), events_tx)?;

    // Adopt everything already on screen before the loop starts.
    engine.full_scan().await;

    let mut watcher = match ConfigWatcher::new(loader.config_path().to_path_buf()) {
        Ok(watcher) => {
            info!("settings hot-reload enabled");
            Some(watcher)
        }
        Err(err) => {
            warn!(error = %err, "settings watcher unavailable");
            None
        }
    };
    let mut last_good = settings;

    let mut scan_tick = tokio::time::interval(FULL_SCAN_INTERVAL);
    let mut poll_tick = tokio::time::interval(GEOMETRY_POLL_INTERVAL);
    let mut housekeeping_tick = tokio::time::interval(Duration::from_millis(200));
    scan_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    poll_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    housekeeping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!("tatami is managing windows, press Ctrl+C to exit");

    while running.load(Ordering::SeqCst) {
        tokio::select! {
            maybe_event = events_rx.recv() => {
                match maybe_event {
                    Some(event) => engine.handle_event(event).await,
                    None => break,
                }
            }
            _ = scan_tick.tick() => engine.full_scan().await,
            _ = poll_tick.tick() => engine.geometry_poll().await,
            _ = housekeeping_tick.tick() => {
                if let Some(watcher) = watcher.as_mut() {
                    if watcher.poll_changed() {
                        match loader.load() {
                            Ok(candidate) => {
                                let (settings, problems) =
                                    ConfigValidator::sanitize(candidate, &last_good);
                                for problem in &problems {
                                    warn!(%problem, "settings field rejected");
                                }
                                last_good = settings.clone();
                                engine.handle_event(Event::SettingsChanged(settings)).await;
                            }
                            Err(err) => {
                                warn!(error = %err, "settings reload failed, keeping last good");
                            }
                        }
                    }
                }
            }
        }
    }

    engine.settle().await;
    info!("tatami stopped");
    Ok(())
}

fn initialize_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tatami_core=debug,info")),
        )
        .with_target(false)
        .init();
}
