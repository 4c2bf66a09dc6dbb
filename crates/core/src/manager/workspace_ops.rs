//! Workspace lifecycle: the switch protocol, creation, removal, migration.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::executor::{BatchOp, PidBatch};
use crate::geometry::SENTINEL;
use crate::ids::{Pid, WindowId, WorkspaceId};
use crate::layout::LayoutKind;

use super::core::Engine;
use super::workspace::Workspace;

impl Engine {
    /// The atomic workspace switch.
    ///
    /// Outgoing windows record their on-screen frame and park at the
    /// sentinel; a fence guarantees the parking completes before any
    /// incoming placement is enqueued; incoming floats restore their saved
    /// frames and the closing reflow places the tiles. From the user's
    /// perspective the swap is one step.
    pub async fn activate_workspace(&mut self, target: WorkspaceId) {
        let Some(monitor_index) = self.monitor_index_of_workspace(target) else {
            return;
        };
        let prev = self.monitors[monitor_index].active();
        if prev == Some(target) {
            return;
        }

        if let Some(prev_id) = prev {
            let prev_windows: Vec<WindowId> = self
                .workspace(prev_id)
                .map(|ws| ws.window_ids().to_vec())
                .unwrap_or_default();

            let mut batches: BTreeMap<Pid, Vec<BatchOp>> = BTreeMap::new();
            for window in prev_windows {
                // Live frame where possible; the record is the fallback.
                let frame = self.port.frame(window).ok();
                let Some(ws) = self.workspace_mut(prev_id) else {
                    break;
                };
                let Some(node) = ws.find_window_mut(window) else {
                    continue;
                };
                let current = frame.unwrap_or(node.last_known_frame);
                node.saved_frame = Some(current);
                node.last_known_frame = current;
                node.park();
                batches
                    .entry(node.pid)
                    .or_default()
                    .push(BatchOp::MoveTo {
                        window,
                        origin: SENTINEL,
                    });
            }
            if !self.writes_disabled {
                self.executor.submit(
                    batches
                        .into_iter()
                        .map(|(pid, ops)| PidBatch { pid, ops })
                        .collect(),
                );
            }
            // Fence: nothing from the incoming workspace may interleave
            // with the outgoing geometry.
            self.executor.fence().await;
            self.supersede_reflows(prev_id);
        }

        self.monitors[monitor_index].set_active(Some(target));

        // Reveal windows the reflow will not place: everything in a
        // float-layout workspace. Classified floats of tiled workspaces are
        // revealed by the reflow itself.
        let visible = self.monitors[monitor_index].visible_frame();
        let mut restore: BTreeMap<Pid, Vec<BatchOp>> = BTreeMap::new();
        {
            let Some(ws) = self.workspace_mut(target) else {
                return;
            };
            if ws.layout() == LayoutKind::Float {
                for window in ws.window_ids().to_vec() {
                    let Some(node) = ws.find_window_mut(window) else {
                        continue;
                    };
                    let frame = node
                        .saved_frame
                        .take()
                        .unwrap_or_else(|| visible.centered(super::layout_ops::DEFAULT_FLOAT_SIZE));
                    node.last_known_frame = frame;
                    let ops = restore.entry(node.pid).or_default();
                    ops.push(BatchOp::Place { window, frame });
                    ops.push(BatchOp::Raise { window });
                }
            }
        }
        if !self.writes_disabled && !restore.is_empty() {
            self.executor.submit(
                restore
                    .into_iter()
                    .map(|(pid, ops)| PidBatch { pid, ops })
                    .collect(),
            );
        }

        self.apply_tiling(target).await;
        tracing::info!(workspace = %target, "workspace activated");
    }

    /// Create an empty workspace on a monitor with the configured defaults.
    pub fn create_workspace(&mut self, monitor_index: usize, title: &str) -> Option<WorkspaceId> {
        let default_layout = self.settings.default_layout;
        let inner = self.settings.inner_gap as f64;
        let outer = self.settings.outer_gap as f64;
        let monitor = self.monitors.get_mut(monitor_index)?;
        let workspace = Workspace::new(
            Uuid::new_v4(),
            title,
            monitor.id(),
            default_layout,
            inner,
            outer,
        );
        let id = workspace.id();
        monitor.push_workspace(workspace);
        tracing::info!(workspace = %id, title, "workspace created");
        Some(id)
    }

    /// Remove a workspace, migrating its windows to the next one on the
    /// monitor. Removing the last workspace of a monitor is forbidden.
    pub async fn remove_workspace(&mut self, workspace_id: WorkspaceId) {
        let Some(monitor_index) = self.monitor_index_of_workspace(workspace_id) else {
            return;
        };
        if self.monitors[monitor_index].workspace_count() <= 1 {
            return;
        }
        let Some(position) = self.monitors[monitor_index].position(workspace_id) else {
            return;
        };
        let was_active = self.monitors[monitor_index].active() == Some(workspace_id);
        let successor = {
            let monitor = &self.monitors[monitor_index];
            let next = (position + 1) % monitor.workspace_count();
            // The successor index shifts by one if it sat after the removed
            // slot; resolve it by id before detaching.
            monitor.workspace_at(next).map(|ws| ws.id())
        };
        let Some(successor) = successor else { return };

        let Some(mut removed) = self.monitors[monitor_index].take_workspace(workspace_id) else {
            return;
        };
        for window in removed.window_ids().to_vec() {
            if let Some(node) = removed.remove(window) {
                self.registry.reassign(window, successor);
                if let Some(ws) = self.workspace_mut(successor) {
                    ws.insert(node);
                }
            }
        }
        self.reflow_generation.remove(&workspace_id);
        tracing::info!(workspace = %workspace_id, "workspace removed");

        if was_active {
            self.monitors[monitor_index].set_active(Some(successor));
        }
        self.apply_tiling(successor).await;
    }

    /// Atomically reassign a window to another workspace and reflow both
    /// sides.
    pub async fn move_window_to_workspace(&mut self, window: WindowId, target: WorkspaceId) {
        let Some(source) = self.registry.lookup(window) else {
            return;
        };
        if source == target || self.workspace(target).is_none() {
            return;
        }

        self.registry.reassign(window, target);
        let node = self.workspace_mut(source).and_then(|ws| ws.remove(window));
        let Some(mut node) = node else {
            // Membership had already diverged; put ownership back.
            self.registry.reassign(window, source);
            return;
        };

        let target_on_screen = self
            .monitor_index_of_workspace(target)
            .map_or(false, |i| self.monitors[i].active() == Some(target));
        if !target_on_screen {
            // Park it with the rest of its new workspace.
            let current = self.port.frame(window).unwrap_or(node.last_known_frame);
            node.saved_frame = Some(current);
            node.last_known_frame = current;
            node.park();
            let pid = node.pid;
            if !self.writes_disabled {
                self.executor.submit(vec![PidBatch {
                    pid,
                    ops: vec![BatchOp::MoveTo {
                        window,
                        origin: SENTINEL,
                    }],
                }]);
            }
        }
        if let Some(ws) = self.workspace_mut(target) {
            ws.insert(node);
        }

        tracing::debug!(%window, from = %source, to = %target, "window migrated");
        self.apply_tiling(source).await;
        self.apply_tiling(target).await;
    }

    /// Cycle to the neighbouring workspace on the command monitor.
    pub async fn activate_next_workspace(&mut self) {
        let monitor = self.command_monitor_index();
        if let Some(next) = self.monitors[monitor].next_workspace_id() {
            self.activate_workspace(next).await;
        }
    }

    pub async fn activate_prev_workspace(&mut self) {
        let monitor = self.command_monitor_index();
        if let Some(prev) = self.monitors[monitor].prev_workspace_id() {
            self.activate_workspace(prev).await;
        }
    }

    /// Activate the workspace at `index` on the command monitor.
    pub async fn activate_workspace_at(&mut self, index: usize) {
        let monitor = self.command_monitor_index();
        let target = self.monitors[monitor].workspace_at(index).map(|ws| ws.id());
        if let Some(target) = target {
            self.activate_workspace(target).await;
        }
    }
}
