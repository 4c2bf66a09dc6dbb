//! Screen reconfiguration: re-enumerate monitors and re-home workspaces.

use std::collections::HashMap;

use uuid::Uuid;

use crate::ids::{MonitorId, WorkspaceId};

use super::core::Engine;
use super::monitor::Monitor;
use super::workspace::Workspace;

impl Engine {
    /// Rebuild the monitor list from the port. Workspaces keep their
    /// identity: they stay on their monitor if it survived, otherwise they
    /// re-home onto the first remaining one. Then everything visible
    /// reflows.
    pub(crate) async fn on_screen_reconfigured(&mut self) {
        let descriptors = match self.port.list_monitors() {
            Ok(d) if !d.is_empty() => d,
            Ok(_) => {
                tracing::warn!("screen reconfiguration reported zero monitors, keeping model");
                return;
            }
            Err(err) => {
                tracing::warn!(error = %err, "monitor re-enumeration failed");
                return;
            }
        };

        let old_monitors = std::mem::take(&mut self.monitors);
        let mut new_monitors: Vec<Monitor> = descriptors.iter().map(Monitor::new).collect();
        let mut previous_active: HashMap<MonitorId, WorkspaceId> = HashMap::new();
        let mut orphans: Vec<Workspace> = Vec::new();

        for old in old_monitors {
            let id = old.id();
            if let Some(active) = old.active() {
                previous_active.insert(id, active);
            }
            match new_monitors.iter_mut().find(|m| m.id() == id) {
                Some(monitor) => {
                    for workspace in old.into_workspaces() {
                        monitor.push_workspace(workspace);
                    }
                }
                None => orphans.extend(old.into_workspaces()),
            }
        }

        if !orphans.is_empty() {
            let first = &mut new_monitors[0];
            tracing::info!(
                count = orphans.len(),
                monitor = %first.id(),
                "re-homing workspaces from departed monitors"
            );
            for workspace in orphans {
                first.push_workspace(workspace);
            }
        }

        for monitor in &mut new_monitors {
            if monitor.workspace_count() == 0 {
                let workspace = Workspace::new(
                    Uuid::new_v4(),
                    "main",
                    monitor.id(),
                    self.settings.default_layout,
                    self.settings.inner_gap as f64,
                    self.settings.outer_gap as f64,
                );
                monitor.push_workspace(workspace);
            }
            // Keep the previous active selection where the monitor survived
            // and the workspace is still homed on it.
            if let Some(active) = previous_active.get(&monitor.id()) {
                if monitor.position(*active).is_some() {
                    monitor.set_active(Some(*active));
                }
            }
            let id = monitor.id();
            for workspace in monitor.workspaces_mut() {
                workspace.set_monitor(id);
            }
        }

        self.monitors = new_monitors;
        tracing::info!(monitors = self.monitors.len(), "screen configuration applied");

        let active: Vec<WorkspaceId> = self.monitors.iter().filter_map(|m| m.active()).collect();
        for workspace in active {
            self.apply_tiling(workspace).await;
        }
    }
}
