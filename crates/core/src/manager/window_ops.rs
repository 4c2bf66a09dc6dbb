//! Window lifecycle reconciliation: created, destroyed, moved, focused.

use std::time::Duration;

use crate::classify::{Placement, WindowAttrs};
use crate::events::Event;
use crate::executor::{BatchOp, PidBatch};
use crate::geometry::{is_sentinel, Rect};
use crate::ids::{Pid, WindowId, WorkspaceId};
use crate::layout::LayoutKind;
use crate::port::{PortError, WindowAttr};

use super::core::Engine;
use super::window::WindowNode;

/// User-initiated moves and resizes are coalesced for this long before the
/// layout snaps the window back.
pub const REFLOW_DEBOUNCE: Duration = Duration::from_millis(200);

impl Engine {
    /// Adopt a new window: pick the monitor under the cursor (first monitor
    /// when the cursor is off-screen), assign it to that monitor's active
    /// workspace, classify, and reflow if it tiles.
    pub(crate) async fn on_window_created(&mut self, window: WindowId, pid: Pid, bounds: Rect) {
        if self.registry.lookup(window).is_some() {
            return;
        }
        // A window sitting at the hide sentinel is some other manager's
        // parked state, not a window to adopt.
        if is_sentinel(bounds.origin()) {
            return;
        }

        let monitor_index = self
            .port
            .cursor_position()
            .ok()
            .and_then(|cursor| self.monitor_index_at(cursor))
            .unwrap_or(0);
        let Some(workspace_id) = self.monitors[monitor_index].active() else {
            return;
        };

        let title = match self.port.attr(window, WindowAttr::Title) {
            Ok(value) => value.as_text().unwrap_or_default().to_string(),
            Err(_) => String::new(),
        };
        let mut node = WindowNode::new(window, pid, bounds, title);
        node.is_floating_override = self.settings.float_new_windows;
        let floating_override = node.is_floating_override;

        if !self.registry.assign(window, workspace_id) {
            return;
        }
        match self.workspace_mut(workspace_id) {
            Some(ws) => ws.insert(node),
            None => {
                self.registry.remove(window);
                return;
            }
        }

        self.observer.ensure_subscribed(pid);
        tracing::debug!(%window, %pid, workspace = %workspace_id, "window adopted");

        match self.placement_of(window, pid, floating_override) {
            Some(Placement::Tile) => self.apply_tiling(workspace_id).await,
            // Floating windows keep their OS-given frame.
            Some(Placement::Float) => {}
            None => self.on_window_destroyed(window).await,
        }
    }

    /// Confirmed disappearance: unregister, collapse the tree, reflow.
    pub(crate) async fn on_window_destroyed(&mut self, window: WindowId) {
        self.classifier.invalidate(window);
        self.missing_scans.remove(&window);
        let Some(workspace_id) = self.registry.remove(window) else {
            return;
        };

        let mut freed_pid = None;
        if let Some(ws) = self.workspace_mut(workspace_id) {
            if let Some(node) = ws.remove(window) {
                freed_pid = Some(node.pid);
            }
        }
        if self.focused == Some(window) {
            self.focused = None;
        }
        if let Some(pid) = freed_pid {
            if !self.pid_in_use(pid) {
                self.observer.forget(pid);
            }
        }

        tracing::debug!(%window, "window removed");
        self.apply_tiling(workspace_id).await;
    }

    /// A move or resize that did not originate from us. Tiled windows snap
    /// back after the debounce; floating windows just update their record.
    pub(crate) fn on_window_moved(&mut self, window: WindowId, bounds: Rect) {
        let Some(workspace_id) = self.registry.lookup(window) else {
            return;
        };
        let Some(ws) = self.workspace_mut(workspace_id) else {
            return;
        };
        let layout = ws.layout();
        let floats = ws.floating().contains(&window);
        match ws.find_window_mut(window) {
            Some(node) => {
                if node.is_hidden() {
                    // Parked off-screen; stale geometry reports are noise.
                    return;
                }
                node.last_known_frame = bounds;
            }
            None => return,
        }

        if layout != LayoutKind::Float && !floats {
            self.schedule_reflow(workspace_id);
        }
    }

    pub(crate) fn on_focus_changed(&mut self, window: WindowId) {
        self.focused = Some(window);
        let Some(workspace_id) = self.registry.lookup(window) else {
            return;
        };
        let Some(index) = self.monitor_index_of_workspace(workspace_id) else {
            return;
        };
        if self.monitors[index].active() != Some(workspace_id) {
            return;
        }
        // In a z-stack the focused window is kept on top.
        let Some(ws) = self.monitors[index].workspace(workspace_id) else {
            return;
        };
        if ws.layout() == LayoutKind::ZStack && !self.writes_disabled {
            if let Some(node) = ws.find_window(window) {
                self.executor.submit(vec![PidBatch {
                    pid: node.pid,
                    ops: vec![BatchOp::Raise { window }],
                }]);
            }
        }
    }

    pub(crate) fn on_title_changed(&mut self, window: WindowId) {
        self.classifier.invalidate(window);
        let Some(workspace_id) = self.registry.lookup(window) else {
            return;
        };
        let title = self
            .port
            .attr(window, WindowAttr::Title)
            .ok()
            .and_then(|value| value.as_text().map(str::to_string));
        if let Some(ws) = self.workspace_mut(workspace_id) {
            if let Some(node) = ws.find_window_mut(window) {
                if let Some(title) = title {
                    node.title = title;
                }
            }
        }
        // Rule 7 may now match (or stop matching); refresh on the debounce.
        self.schedule_reflow(workspace_id);
    }

    /// Bring a workspace of the activated application on screen, unless one
    /// already is.
    pub(crate) async fn on_app_activated(&mut self, pid: Pid) {
        self.observer.retry(pid);

        let mut candidate = None;
        for monitor in &self.monitors {
            for ws in monitor.workspaces() {
                let has_pid = ws
                    .window_ids()
                    .iter()
                    .filter_map(|w| ws.find_window(*w))
                    .any(|node| node.pid == pid);
                if !has_pid {
                    continue;
                }
                if monitor.active() == Some(ws.id()) {
                    return;
                }
                if candidate.is_none() {
                    candidate = Some(ws.id());
                }
            }
        }
        if let Some(workspace_id) = candidate {
            self.activate_workspace(workspace_id).await;
        }
    }

    /// Debounce a reflow for the workspace; only the latest scheduled one
    /// fires.
    pub(crate) fn schedule_reflow(&mut self, workspace: WorkspaceId) {
        let generation = self.reflow_generation.entry(workspace).or_insert(0);
        *generation += 1;
        let generation = *generation;
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(REFLOW_DEBOUNCE).await;
            let _ = events
                .send(Event::ReflowDue {
                    workspace,
                    generation,
                })
                .await;
        });
    }

    /// Invalidate every pending debounced reflow for the workspace.
    pub(crate) fn supersede_reflows(&mut self, workspace: WorkspaceId) {
        *self.reflow_generation.entry(workspace).or_insert(0) += 1;
    }

    pub(crate) async fn on_reflow_due(&mut self, workspace: WorkspaceId, generation: u64) {
        if self.reflow_generation.get(&workspace) == Some(&generation) {
            self.apply_tiling(workspace).await;
        }
    }

    /// Classify through the port. `None` means the window is gone.
    pub(crate) fn placement_of(
        &self,
        window: WindowId,
        pid: Pid,
        floating_override: bool,
    ) -> Option<Placement> {
        let attrs = match WindowAttrs::read(self.port.as_ref(), window) {
            Ok(attrs) => attrs,
            Err(PortError::Gone) => return None,
            Err(err) => {
                // Unknown attributes default tile-ward.
                tracing::debug!(%window, error = %err, "attribute read failed");
                return Some(Placement::Tile);
            }
        };
        let app_id = self.port.app_id(pid).unwrap_or(None);
        Some(
            self.classifier
                .classify(window, floating_override, &attrs.with_app_id(app_id)),
        )
    }

    fn pid_in_use(&self, pid: Pid) -> bool {
        self.monitors.iter().any(|monitor| {
            monitor.workspaces().iter().any(|ws| {
                ws.window_ids()
                    .iter()
                    .filter_map(|w| ws.find_window(*w))
                    .any(|node| node.pid == pid)
            })
        })
    }
}
