//! The per-workspace layout tree for binary space partitioning.
//!
//! Nodes live in an arena and refer to each other by index, so there are no
//! owning pointers inside nodes, no cycles, and a collapse or swap is a
//! handful of index rewrites. A leaf holds a window; a split divides its
//! rectangle between two children at a ratio along an axis.
//!
//! # Example
//!
//! ```
//! use tatami_core::layout::LayoutTree;
//! use tatami_core::ids::WindowId;
//!
//! let mut tree = LayoutTree::new();
//! tree.insert_window(WindowId(1));
//! tree.insert_window(WindowId(2));
//! assert_eq!(tree.windows(), vec![WindowId(1), WindowId(2)]);
//!
//! tree.remove_window(WindowId(1));
//! assert_eq!(tree.windows(), vec![WindowId(2)]);
//! ```

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::ids::WindowId;

/// Index of a node inside the tree's arena.
pub type NodeId = usize;

/// The direction a split divides its rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Left/right division (splits the width).
    Horizontal,
    /// Top/bottom division (splits the height).
    Vertical,
}

impl Axis {
    pub fn opposite(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Leaf {
        window: WindowId,
    },
    Split {
        axis: Axis,
        ratio: f64,
        left: NodeId,
        right: NodeId,
    },
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// Arena-backed binary layout tree.
#[derive(Debug, Clone, Default)]
pub struct LayoutTree {
    nodes: Vec<Option<Node>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
}

impl LayoutTree {
    pub fn new() -> Self {
        LayoutTree::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of windows (leaves) in the tree.
    pub fn len(&self) -> usize {
        self.windows().len()
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id] = None;
        self.free.push(id);
    }

    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id].as_ref().expect("live node id")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id].as_mut().expect("live node id")
    }

    /// Insert a window by splitting the deepest rightmost leaf.
    ///
    /// The new split runs on the axis opposite the leaf's parent split (a
    /// first split is horizontal) with ratio 0.5; the existing window keeps
    /// the left/top half. Inserting a window that is already present is a
    /// no-op returning false.
    pub fn insert_window(&mut self, window: WindowId) -> bool {
        if self.contains(window) {
            return false;
        }

        let Some(root) = self.root else {
            let id = self.alloc(Node {
                parent: None,
                kind: NodeKind::Leaf { window },
            });
            self.root = Some(id);
            return true;
        };

        // Walk to the deepest rightmost leaf.
        let mut target = root;
        while let NodeKind::Split { right, .. } = self.node(target).kind {
            target = right;
        }

        let axis = match self.node(target).parent {
            Some(parent) => match self.node(parent).kind {
                NodeKind::Split { axis, .. } => axis.opposite(),
                NodeKind::Leaf { .. } => unreachable!("parents are splits"),
            },
            None => Axis::Horizontal,
        };

        // The leaf's slot becomes the split so the parent link stays valid.
        let NodeKind::Leaf { window: existing } = self.node(target).kind else {
            unreachable!("descent ends at a leaf");
        };
        let left = self.alloc(Node {
            parent: Some(target),
            kind: NodeKind::Leaf { window: existing },
        });
        let right = self.alloc(Node {
            parent: Some(target),
            kind: NodeKind::Leaf { window },
        });
        self.node_mut(target).kind = NodeKind::Split {
            axis,
            ratio: 0.5,
            left,
            right,
        };
        true
    }

    /// Remove a window's leaf and collapse its parent split, promoting the
    /// sibling. Returns false if the window is not in the tree.
    pub fn remove_window(&mut self, window: WindowId) -> bool {
        let Some(leaf) = self.find_leaf(window) else {
            return false;
        };

        let Some(parent) = self.node(leaf).parent else {
            self.release(leaf);
            self.root = None;
            return true;
        };

        let NodeKind::Split { left, right, .. } = self.node(parent).kind else {
            unreachable!("parents are splits");
        };
        let sibling = if left == leaf { right } else { left };

        // The sibling's content moves up into the parent's slot, keeping the
        // grandparent's child index untouched.
        let sibling_kind = self.node(sibling).kind;
        if let NodeKind::Split { left, right, .. } = sibling_kind {
            self.node_mut(left).parent = Some(parent);
            self.node_mut(right).parent = Some(parent);
        }
        self.node_mut(parent).kind = sibling_kind;
        self.release(sibling);
        self.release(leaf);
        true
    }

    pub fn contains(&self, window: WindowId) -> bool {
        self.find_leaf(window).is_some()
    }

    /// Locate the leaf holding `window`.
    pub fn find_leaf(&self, window: WindowId) -> Option<NodeId> {
        self.nodes.iter().position(|slot| {
            matches!(slot, Some(Node { kind: NodeKind::Leaf { window: w }, .. }) if *w == window)
        })
    }

    /// Swap the windows held by two leaves. The split structure, and
    /// therefore both frames, stay put.
    pub fn swap_windows(&mut self, a: WindowId, b: WindowId) -> bool {
        let (Some(leaf_a), Some(leaf_b)) = (self.find_leaf(a), self.find_leaf(b)) else {
            return false;
        };
        if leaf_a == leaf_b {
            return false;
        }
        self.node_mut(leaf_a).kind = NodeKind::Leaf { window: b };
        self.node_mut(leaf_b).kind = NodeKind::Leaf { window: a };
        true
    }

    /// Adjust the ratio of the split directly above a window's leaf.
    /// Clamped away from the degenerate edges. Returns false for the root
    /// leaf or an unknown window.
    pub fn set_split_ratio(&mut self, window: WindowId, ratio: f64) -> bool {
        let Some(leaf) = self.find_leaf(window) else {
            return false;
        };
        let Some(parent) = self.node(leaf).parent else {
            return false;
        };
        if let NodeKind::Split { ratio: r, .. } = &mut self.node_mut(parent).kind {
            *r = ratio.clamp(0.05, 0.95);
            true
        } else {
            false
        }
    }

    /// Set every split ratio back to 0.5.
    pub fn rebalance(&mut self) {
        for slot in self.nodes.iter_mut() {
            if let Some(Node {
                kind: NodeKind::Split { ratio, .. },
                ..
            }) = slot
            {
                *ratio = 0.5;
            }
        }
    }

    /// Every split ratio, in arena order. Test hook for the equalize
    /// invariant.
    pub fn ratios(&self) -> Vec<f64> {
        self.nodes
            .iter()
            .filter_map(|slot| match slot {
                Some(Node {
                    kind: NodeKind::Split { ratio, .. },
                    ..
                }) => Some(*ratio),
                _ => None,
            })
            .collect()
    }

    /// Windows in traversal (left-to-right) order.
    pub fn windows(&self) -> Vec<WindowId> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.collect_windows(root, &mut out);
        }
        out
    }

    fn collect_windows(&self, id: NodeId, out: &mut Vec<WindowId>) {
        match self.node(id).kind {
            NodeKind::Leaf { window } => out.push(window),
            NodeKind::Split { left, right, .. } => {
                self.collect_windows(left, out);
                self.collect_windows(right, out);
            }
        }
    }

    /// Walk the tree over `available`, padding `inner_gap / 2` on either
    /// side of every divider, and emit each leaf's rectangle.
    ///
    /// Child rectangles are derived from the enclosing rect's far edge, so
    /// adjacent cells and the gap strip between them tile the parent
    /// exactly.
    pub fn assign_frames(&self, available: Rect, inner_gap: f64) -> Vec<(WindowId, Rect)> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.assign_node(root, available, inner_gap, &mut out);
        }
        out
    }

    fn assign_node(&self, id: NodeId, rect: Rect, gap: f64, out: &mut Vec<(WindowId, Rect)>) {
        match self.node(id).kind {
            NodeKind::Leaf { window } => out.push((window, rect)),
            NodeKind::Split {
                axis,
                ratio,
                left,
                right,
            } => {
                let pad = gap / 2.0;
                let (first, second) = match axis {
                    Axis::Horizontal => {
                        let divider = rect.x + rect.width * ratio;
                        let left_rect = Rect::new(
                            rect.x,
                            rect.y,
                            (divider - pad - rect.x).max(0.0),
                            rect.height,
                        );
                        let right_rect = Rect::new(
                            divider + pad,
                            rect.y,
                            (rect.max_x() - divider - pad).max(0.0),
                            rect.height,
                        );
                        (left_rect, right_rect)
                    }
                    Axis::Vertical => {
                        let divider = rect.y + rect.height * ratio;
                        let top_rect = Rect::new(
                            rect.x,
                            rect.y,
                            rect.width,
                            (divider - pad - rect.y).max(0.0),
                        );
                        let bottom_rect = Rect::new(
                            rect.x,
                            divider + pad,
                            rect.width,
                            (rect.max_y() - divider - pad).max(0.0),
                        );
                        (top_rect, bottom_rect)
                    }
                };
                self.assign_node(left, first, gap, out);
                self.assign_node(right, second, gap, out);
            }
        }
    }

    /// Structural consistency check used by tests: parent links match child
    /// links and every ratio is in (0, 1).
    #[cfg(test)]
    pub(crate) fn check_consistency(&self) {
        for (id, slot) in self.nodes.iter().enumerate() {
            let Some(node) = slot else { continue };
            if let NodeKind::Split {
                left, right, ratio, ..
            } = node.kind
            {
                assert!(ratio > 0.0 && ratio < 1.0, "ratio out of range");
                assert_eq!(self.node(left).parent, Some(id), "left parent link");
                assert_eq!(self.node(right).parent, Some(id), "right parent link");
            }
            if node.parent.is_none() {
                assert_eq!(self.root, Some(id), "exactly the root has no parent");
            }
        }
    }
}
