//! The tiling pipeline: classify, arrange, diff, dispatch.

use std::collections::{BTreeMap, BTreeSet};

use crate::classify::Placement;
use crate::executor::{BatchOp, PidBatch};
use crate::geometry::Size;
use crate::ids::{Pid, WindowId, WorkspaceId};
use crate::layout::LayoutKind;

use super::core::Engine;

/// Sub-pixel jitter below this is not worth a port round-trip.
const DIFF_THRESHOLD: f64 = 1.0;

/// Fallback size for a floating window revealed with no saved frame.
pub(crate) const DEFAULT_FLOAT_SIZE: Size = Size::new(800.0, 600.0);

impl Engine {
    /// One reflow of a workspace. Idempotent: with no intervening events a
    /// second call computes an empty diff and dispatches nothing.
    ///
    /// Hidden workspaces are skipped — their windows are parked and get
    /// placed by the switch protocol when they return to the screen.
    pub async fn apply_tiling(&mut self, workspace_id: WorkspaceId) {
        let Some(monitor_index) = self.monitor_index_of_workspace(workspace_id) else {
            return;
        };
        if self.monitors[monitor_index].active() != Some(workspace_id) {
            return;
        }
        let visible = self.monitors[monitor_index].visible_frame();

        // 1. Snapshot membership under the workspace.
        let members: Vec<(WindowId, Pid, bool)> = match self.workspace(workspace_id) {
            Some(ws) => ws
                .window_ids()
                .iter()
                .filter_map(|w| ws.find_window(*w))
                .map(|node| (node.window, node.pid, node.is_floating_override))
                .collect(),
            None => return,
        };

        // 2. Partition via the classifier.
        let mut tiled_order: Vec<WindowId> = Vec::new();
        let mut tiled_set: BTreeSet<WindowId> = BTreeSet::new();
        let mut floating_set: BTreeSet<WindowId> = BTreeSet::new();
        let mut gone: Vec<WindowId> = Vec::new();
        for (window, pid, floating_override) in &members {
            match self.placement_of(*window, *pid, *floating_override) {
                Some(Placement::Tile) => {
                    tiled_order.push(*window);
                    tiled_set.insert(*window);
                }
                Some(Placement::Float) => {
                    floating_set.insert(*window);
                }
                None => gone.push(*window),
            }
        }
        for window in gone {
            self.classifier.invalidate(window);
            self.registry.remove(window);
            if let Some(ws) = self.workspace_mut(workspace_id) {
                ws.remove(window);
            }
            if self.focused == Some(window) {
                self.focused = None;
            }
        }

        // 3–4. Arrange the tileable subset and diff against known frames.
        let mut batches: BTreeMap<Pid, Vec<BatchOp>> = BTreeMap::new();
        {
            let Some(ws) = self.workspace_mut(workspace_id) else {
                return;
            };
            ws.set_classifications(tiled_set.clone(), floating_set.clone());
            let frames = ws.arrange(visible, &tiled_order);

            for (window, target) in frames {
                let Some(node) = ws.find_window_mut(window) else {
                    continue;
                };
                let current = node.last_known_frame;
                let moved = (current.x - target.x).abs() >= DIFF_THRESHOLD
                    || (current.y - target.y).abs() >= DIFF_THRESHOLD;
                let resized = (current.width - target.width).abs() >= DIFF_THRESHOLD
                    || (current.height - target.height).abs() >= DIFF_THRESHOLD;
                if moved || resized {
                    node.last_known_frame = target;
                    batches
                        .entry(node.pid)
                        .or_default()
                        .push(BatchOp::Place { window, frame: target });
                }
            }

            // Floating windows still parked from a workspace switch come
            // back at their saved frame, or centered if none was recorded.
            for window in &floating_set {
                let Some(node) = ws.find_window_mut(*window) else {
                    continue;
                };
                if !node.is_hidden() {
                    continue;
                }
                let frame = node
                    .saved_frame
                    .take()
                    .unwrap_or_else(|| visible.centered(DEFAULT_FLOAT_SIZE));
                node.last_known_frame = frame;
                let ops = batches.entry(node.pid).or_default();
                ops.push(BatchOp::Place { window: *window, frame });
                ops.push(BatchOp::Raise { window: *window });
            }
        }

        // Z-stack raise order: registration order, focused window last.
        // Raises run on a single ordered worker because z-order only means
        // something executed in sequence, across processes too.
        let mut raise_sequence: Vec<PidBatch> = Vec::new();
        if let Some(ws) = self.workspace(workspace_id) {
            if ws.layout() == LayoutKind::ZStack {
                let mut order = tiled_order.clone();
                if let Some(focused) = self.focused {
                    if let Some(position) = order.iter().position(|w| *w == focused) {
                        let window = order.remove(position);
                        order.push(window);
                    }
                }
                for window in order {
                    if let Some(node) = ws.find_window(window) {
                        raise_sequence.push(PidBatch {
                            pid: node.pid,
                            ops: vec![BatchOp::Raise { window }],
                        });
                    }
                }
            }
        }

        self.assert_registry_agreement(workspace_id);

        // 5. Dispatch per-pid batches through the worker pool.
        if self.writes_disabled {
            return;
        }
        let batches: Vec<PidBatch> = batches
            .into_iter()
            .map(|(pid, ops)| PidBatch { pid, ops })
            .collect();
        self.executor.submit(batches);
        if !raise_sequence.is_empty() {
            self.executor.submit_ordered(raise_sequence);
        }
    }

    /// Swap strategy and reflow now, superseding any pending debounce.
    pub async fn set_workspace_layout(&mut self, workspace_id: WorkspaceId, kind: LayoutKind) {
        self.supersede_reflows(workspace_id);
        match self.workspace_mut(workspace_id) {
            Some(ws) => ws.set_layout(kind),
            None => return,
        }
        tracing::info!(workspace = %workspace_id, layout = %kind, "layout changed");
        self.apply_tiling(workspace_id).await;
    }

    /// Reset every BSP split ratio to 0.5.
    pub async fn equalize_workspace(&mut self, workspace_id: WorkspaceId) {
        match self.workspace_mut(workspace_id) {
            Some(ws) if ws.layout() == LayoutKind::Bsp => ws.tree_mut().rebalance(),
            _ => return,
        }
        self.apply_tiling(workspace_id).await;
    }

    /// Registry–tree agreement: the workspace's window list and the
    /// registry's ownership view must describe the same set.
    fn assert_registry_agreement(&self, workspace_id: WorkspaceId) {
        if cfg!(debug_assertions) {
            let Some(ws) = self.workspace(workspace_id) else {
                return;
            };
            let in_workspace: BTreeSet<WindowId> = ws.window_ids().iter().copied().collect();
            let owned: BTreeSet<WindowId> =
                self.registry.windows_in(workspace_id).into_iter().collect();
            debug_assert_eq!(
                in_workspace, owned,
                "workspace membership diverged from the registry"
            );
        }
    }
}
