//! The engine struct and its construction.
//!
//! One engine instance owns the whole model: monitors, workspaces, the
//! ownership registry, and the classifier cache. It lives on the model loop
//! task; every mutation happens there, driven by normalized events and by
//! named commands.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::classify::Classifier;
use crate::config::Settings;
use crate::events::{Event, EventSender};
use crate::executor::PortExecutor;
use crate::geometry::Point;
use crate::ids::{WindowId, WorkspaceId};
use crate::observer::Observer;
use crate::port::AccessibilityPort;
use crate::registry::WindowRegistry;

use super::monitor::Monitor;
use super::workspace::Workspace;

pub struct Engine {
    pub(crate) port: Arc<dyn AccessibilityPort>,
    pub(crate) registry: Arc<WindowRegistry>,
    pub(crate) classifier: Classifier,
    pub(crate) monitors: Vec<Monitor>,
    pub(crate) settings: Settings,
    pub(crate) executor: PortExecutor,
    pub(crate) observer: Observer,
    pub(crate) events: EventSender,
    pub(crate) focused: Option<WindowId>,
    /// Set once the port refuses an operation; all writes stop, the
    /// classifier keeps running, commands become no-ops.
    pub(crate) writes_disabled: bool,
    /// Debounce generations per workspace; a scheduled reflow only fires if
    /// its generation is still current.
    pub(crate) reflow_generation: HashMap<WorkspaceId, u64>,
    /// Windows absent from exactly one full scan. A second consecutive
    /// absence confirms destruction.
    pub(crate) missing_scans: HashSet<WindowId>,
}

impl Engine {
    /// Build the model from the current monitor arrangement and the
    /// persisted workspace definitions.
    pub fn new(
        port: Arc<dyn AccessibilityPort>,
        settings: Settings,
        events: EventSender,
    ) -> Result<Self> {
        let descriptors = port
            .list_monitors()
            .context("monitor enumeration failed")?;
        if descriptors.is_empty() {
            anyhow::bail!("no monitors reported by the accessibility port");
        }

        let mut monitors: Vec<Monitor> = descriptors.iter().map(Monitor::new).collect();

        // Seeded workspaces go to their configured monitor, or the first one
        // if that monitor is not connected.
        for seed in &settings.workspaces {
            let index = monitors
                .iter()
                .position(|m| m.id() == seed.monitor_id)
                .unwrap_or(0);
            let mut workspace = Workspace::from_seed(seed, &settings);
            workspace.set_monitor(monitors[index].id());
            monitors[index].push_workspace(workspace);
        }

        // Every monitor gets at least one workspace.
        for monitor in &mut monitors {
            if monitor.workspace_count() == 0 {
                let workspace = Workspace::new(
                    Uuid::new_v4(),
                    "main",
                    monitor.id(),
                    settings.default_layout,
                    settings.inner_gap as f64,
                    settings.outer_gap as f64,
                );
                monitor.push_workspace(workspace);
            }
        }

        let classifier = Classifier::new(&settings);
        let executor = PortExecutor::new(Arc::clone(&port), events.clone());
        let observer = Observer::new(Arc::clone(&port), events.clone());

        tracing::info!(
            monitors = monitors.len(),
            workspaces = monitors.iter().map(|m| m.workspace_count()).sum::<usize>(),
            "engine initialized"
        );

        Ok(Engine {
            port,
            registry: Arc::new(WindowRegistry::new()),
            classifier,
            monitors,
            settings,
            executor,
            observer,
            events,
            focused: None,
            writes_disabled: false,
            reflow_generation: HashMap::new(),
            missing_scans: HashSet::new(),
        })
    }

    /// Dispatch one normalized event.
    pub async fn handle_event(&mut self, event: Event) {
        match event {
            Event::WindowCreated { window, pid, bounds } => {
                self.on_window_created(window, pid, bounds).await;
            }
            Event::WindowDestroyed { window } => self.on_window_destroyed(window).await,
            Event::WindowMoved { window, bounds } => self.on_window_moved(window, bounds),
            Event::WindowResized { window, bounds } => self.on_window_moved(window, bounds),
            Event::FocusChanged { window } => self.on_focus_changed(window),
            Event::TitleChanged { window } => self.on_title_changed(window),
            Event::AppActivated { pid } => self.on_app_activated(pid).await,
            Event::ScreenReconfigured => self.on_screen_reconfigured().await,
            Event::SettingsChanged(settings) => self.on_settings_changed(settings).await,
            Event::ReflowDue {
                workspace,
                generation,
            } => self.on_reflow_due(workspace, generation).await,
            Event::PermissionLost => self.on_permission_lost(),
        }
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn registry(&self) -> &Arc<WindowRegistry> {
        &self.registry
    }

    pub fn focused(&self) -> Option<WindowId> {
        self.focused
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// False once the port refused an operation this session.
    pub fn writes_enabled(&self) -> bool {
        !self.writes_disabled
    }

    /// Drain outstanding port work. Tests use this to observe a quiescent
    /// desktop; the switch protocol uses the executor's fence directly.
    pub async fn settle(&mut self) {
        self.executor.fence().await;
    }

    pub fn workspace(&self, id: WorkspaceId) -> Option<&Workspace> {
        self.monitors.iter().find_map(|m| m.workspace(id))
    }

    pub(crate) fn workspace_mut(&mut self, id: WorkspaceId) -> Option<&mut Workspace> {
        self.monitors.iter_mut().find_map(|m| m.workspace_mut(id))
    }

    pub fn monitor_index_of_workspace(&self, id: WorkspaceId) -> Option<usize> {
        self.monitors.iter().position(|m| m.position(id).is_some())
    }

    pub(crate) fn monitor_index_at(&self, point: Point) -> Option<usize> {
        self.monitors
            .iter()
            .position(|m| m.full_frame().contains_point(point))
    }

    /// The monitor commands act on: the one holding the focused window,
    /// falling back to the first.
    pub(crate) fn command_monitor_index(&self) -> usize {
        self.focused
            .and_then(|window| self.registry.lookup(window))
            .and_then(|ws| self.monitor_index_of_workspace(ws))
            .unwrap_or(0)
    }

    pub(crate) fn on_permission_lost(&mut self) {
        if !self.writes_disabled {
            self.writes_disabled = true;
            tracing::error!(
                "accessibility permission denied; window management disabled for this session"
            );
        }
    }

    async fn on_settings_changed(&mut self, settings: Settings) {
        let gaps_changed = settings.inner_gap != self.settings.inner_gap
            || settings.outer_gap != self.settings.outer_gap;
        self.classifier.update_rules(&settings);
        self.settings = settings;

        if gaps_changed {
            for monitor in &mut self.monitors {
                let (inner, outer) = (
                    self.settings.inner_gap as f64,
                    self.settings.outer_gap as f64,
                );
                for workspace in monitor.workspaces_mut() {
                    workspace.set_gaps(inner, outer);
                }
            }
        }

        // Classifications may have changed wholesale; re-tile what is visible.
        let active: Vec<WorkspaceId> = self.monitors.iter().filter_map(|m| m.active()).collect();
        for ws in active {
            self.apply_tiling(ws).await;
        }
    }
}
