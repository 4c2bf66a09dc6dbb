//! Workspace: a layout policy plus the windows it governs.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::{Settings, WorkspaceSeed};
use crate::geometry::Rect;
use crate::ids::{MonitorId, WindowId, WorkspaceId};
use crate::layout::{self, LayoutGaps, LayoutKind, LayoutTree};

use super::window::WindowNode;

/// One workspace: its layout tree, its window records, and the latest
/// tile/float partition.
///
/// The workspace never talks to the port; geometry leaves through the
/// engine's executor. Pairing every membership change with the matching
/// registry update is the engine's job, done under the registry lock.
#[derive(Debug)]
pub struct Workspace {
    id: WorkspaceId,
    title: String,
    monitor: MonitorId,
    layout: LayoutKind,
    gap_inner: f64,
    gap_outer: f64,
    tree: LayoutTree,
    /// Insertion order; drives the stack layouts and z-stack raise order.
    order: Vec<WindowId>,
    windows: HashMap<WindowId, WindowNode>,
    tiled: BTreeSet<WindowId>,
    floating: BTreeSet<WindowId>,
}

impl Workspace {
    pub fn new(
        id: WorkspaceId,
        title: impl Into<String>,
        monitor: MonitorId,
        layout: LayoutKind,
        gap_inner: f64,
        gap_outer: f64,
    ) -> Self {
        Workspace {
            id,
            title: title.into(),
            monitor,
            layout,
            gap_inner,
            gap_outer,
            tree: LayoutTree::new(),
            order: Vec::new(),
            windows: HashMap::new(),
            tiled: BTreeSet::new(),
            floating: BTreeSet::new(),
        }
    }

    /// Build from a persisted definition, falling back to the settings'
    /// defaults where the seed is silent.
    pub fn from_seed(seed: &WorkspaceSeed, settings: &Settings) -> Self {
        Workspace::new(
            seed.id,
            seed.name.clone(),
            seed.monitor_id,
            seed.layout_kind.unwrap_or(settings.default_layout),
            settings.inner_gap as f64,
            settings.outer_gap as f64,
        )
    }

    pub fn id(&self) -> WorkspaceId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn monitor(&self) -> MonitorId {
        self.monitor
    }

    /// Re-home onto another monitor (screen reconfiguration).
    pub fn set_monitor(&mut self, monitor: MonitorId) {
        self.monitor = monitor;
    }

    pub fn layout(&self) -> LayoutKind {
        self.layout
    }

    pub fn set_layout(&mut self, layout: LayoutKind) {
        self.layout = layout;
    }

    pub fn gaps(&self) -> (f64, f64) {
        (self.gap_inner, self.gap_outer)
    }

    pub fn set_gaps(&mut self, inner: f64, outer: f64) {
        self.gap_inner = inner.max(0.0);
        self.gap_outer = outer.max(0.0);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, window: WindowId) -> bool {
        self.windows.contains_key(&window)
    }

    /// Windows in insertion order.
    pub fn window_ids(&self) -> &[WindowId] {
        &self.order
    }

    pub fn find_window(&self, window: WindowId) -> Option<&WindowNode> {
        self.windows.get(&window)
    }

    pub fn find_window_mut(&mut self, window: WindowId) -> Option<&mut WindowNode> {
        self.windows.get_mut(&window)
    }

    /// Take membership of a window record. No-op if it is already here.
    pub fn insert(&mut self, node: WindowNode) {
        if self.windows.contains_key(&node.window) {
            return;
        }
        self.order.push(node.window);
        self.windows.insert(node.window, node);
    }

    /// Drop a window from the workspace, collapsing its BSP leaf.
    pub fn remove(&mut self, window: WindowId) -> Option<WindowNode> {
        let node = self.windows.remove(&window)?;
        self.order.retain(|w| *w != window);
        self.tree.remove_window(window);
        self.tiled.remove(&window);
        self.floating.remove(&window);
        Some(node)
    }

    /// Latest classification partition, as stored by the tiling engine.
    pub fn tiled(&self) -> &BTreeSet<WindowId> {
        &self.tiled
    }

    pub fn floating(&self) -> &BTreeSet<WindowId> {
        &self.floating
    }

    pub fn set_classifications(&mut self, tiled: BTreeSet<WindowId>, floating: BTreeSet<WindowId>) {
        self.tiled = tiled;
        self.floating = floating;
    }

    /// Run the layout strategy over `tiled` inside `available`.
    pub fn arrange(&mut self, available: Rect, tiled: &[WindowId]) -> BTreeMap<WindowId, Rect> {
        layout::arrange(
            self.layout,
            &mut self.tree,
            tiled,
            available,
            LayoutGaps::new(self.gap_inner, self.gap_outer),
        )
    }

    pub fn tree(&self) -> &LayoutTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut LayoutTree {
        &mut self.tree
    }

    /// Swap two windows in the stack order (non-BSP swap).
    pub fn swap_order(&mut self, a: WindowId, b: WindowId) -> bool {
        let (Some(ia), Some(ib)) = (
            self.order.iter().position(|w| *w == a),
            self.order.iter().position(|w| *w == b),
        ) else {
            return false;
        };
        self.order.swap(ia, ib);
        true
    }
}
