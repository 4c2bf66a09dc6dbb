//! Settings hot-reload watcher.
//!
//! Watches the settings document's parent directory (editors replace the
//! file rather than writing in place) and reports changes on poll. The
//! caller decides what a change means; the watcher carries no settings
//! state of its own.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::time::{Duration, Instant};

/// Minimum spacing between reported changes, absorbing editor write bursts.
const CHANGE_COOLDOWN: Duration = Duration::from_millis(250);

pub struct ConfigWatcher {
    // Held for its Drop; dropping the watcher stops the notifications.
    _watcher: RecommendedWatcher,
    rx: Receiver<()>,
    config_path: PathBuf,
    last_report: Option<Instant>,
}

impl ConfigWatcher {
    pub fn new(config_path: PathBuf) -> Result<Self> {
        let (tx, rx) = channel();
        let watched_file = config_path.clone();

        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<Event>| {
                let Ok(event) = result else { return };
                let relevant = matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                );
                if relevant && event.paths.iter().any(|p| p == &watched_file) {
                    let _ = tx.send(());
                }
            })
            .context("failed to create settings watcher")?;

        let watch_root: &Path = config_path
            .parent()
            .context("settings path has no parent directory")?;
        watcher
            .watch(watch_root, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", watch_root.display()))?;

        Ok(ConfigWatcher {
            _watcher: watcher,
            rx,
            config_path,
            last_report: None,
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Drains pending notifications; returns true if the document changed
    /// since the last poll (rate-limited by the cooldown).
    pub fn poll_changed(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(()) => changed = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        if !changed {
            return false;
        }
        let now = Instant::now();
        if let Some(last) = self.last_report {
            if now.duration_since(last) < CHANGE_COOLDOWN {
                return false;
            }
        }
        self.last_report = Some(now);
        true
    }
}
