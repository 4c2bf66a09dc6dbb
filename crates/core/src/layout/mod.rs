//! Layout strategies.
//!
//! A strategy is pure geometry: given the ordered tileable windows and the
//! available rectangle, it produces a `WindowId → Rect` mapping and nothing
//! else. The closed [`LayoutKind`] variant plus the single [`arrange`]
//! dispatch function is the whole extension surface — a new strategy is one
//! new tag and one new arm.

pub mod bsp;
pub mod stack;
pub mod tree;

#[cfg(test)]
mod tree_tests;

pub use tree::{Axis, LayoutTree};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::geometry::Rect;
use crate::ids::WindowId;

/// The tiling strategy of a workspace.
///
/// # Example
///
/// ```
/// use tatami_core::layout::LayoutKind;
///
/// assert_eq!(LayoutKind::Float.cycle_next(), LayoutKind::HStack);
/// assert_eq!(LayoutKind::Bsp.cycle_next(), LayoutKind::Float);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// Binary space partitioning driven by the workspace's layout tree.
    #[default]
    Bsp,
    /// Equal columns, full height.
    #[serde(rename = "hstack")]
    HStack,
    /// Equal rows, full width.
    #[serde(rename = "vstack")]
    VStack,
    /// Every window fills the frame; focus order decides what is on top.
    #[serde(rename = "zstack")]
    ZStack,
    /// No automatic placement.
    Float,
}

impl LayoutKind {
    /// The fixed cycling order: Float → HStack → VStack → ZStack → BSP → Float.
    pub fn cycle_next(self) -> LayoutKind {
        match self {
            LayoutKind::Float => LayoutKind::HStack,
            LayoutKind::HStack => LayoutKind::VStack,
            LayoutKind::VStack => LayoutKind::ZStack,
            LayoutKind::ZStack => LayoutKind::Bsp,
            LayoutKind::Bsp => LayoutKind::Float,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LayoutKind::Bsp => "bsp",
            LayoutKind::HStack => "hstack",
            LayoutKind::VStack => "vstack",
            LayoutKind::ZStack => "zstack",
            LayoutKind::Float => "float",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Gap configuration handed to a strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutGaps {
    /// Pixels between adjacent tiles.
    pub inner: f64,
    /// Pixels between tiles and the available rect's edges.
    pub outer: f64,
}

impl LayoutGaps {
    pub const fn new(inner: f64, outer: f64) -> Self {
        LayoutGaps { inner, outer }
    }
}

/// Computes the frame for every tileable window.
///
/// The outer gap is subtracted from `available` exactly once, here; the
/// strategies only ever see the reduced rect. `windows` is the workspace's
/// insertion order and `tree` is its BSP partition — only the BSP arm reads
/// (and reconciles) the tree, the stack kinds key off the order alone.
pub fn arrange(
    kind: LayoutKind,
    tree: &mut LayoutTree,
    windows: &[WindowId],
    available: Rect,
    gaps: LayoutGaps,
) -> BTreeMap<WindowId, Rect> {
    let reduced = available.inset(gaps.outer);
    match kind {
        LayoutKind::Float => BTreeMap::new(),
        LayoutKind::HStack => stack::columns(windows, reduced, gaps.inner),
        LayoutKind::VStack => stack::rows(windows, reduced, gaps.inner),
        LayoutKind::ZStack => stack::stacked(windows, reduced),
        LayoutKind::Bsp => bsp::arrange(tree, windows, reduced, gaps.inner),
    }
}
