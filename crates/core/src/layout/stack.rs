//! Stack strategies: equal columns, equal rows, and the z-stack.
//!
//! All three key off the workspace's insertion order alone. Cell sizes are
//! computed in full precision and the final cell is pinned to the far edge
//! of the reduced rect, so the cells plus the gap strips tile it exactly
//! regardless of how the division rounds.

use std::collections::BTreeMap;

use crate::geometry::Rect;
use crate::ids::WindowId;

/// Equal-width columns separated by `inner_gap`, each spanning the full
/// height. Order is preserved left to right.
pub fn columns(windows: &[WindowId], reduced: Rect, inner_gap: f64) -> BTreeMap<WindowId, Rect> {
    let mut out = BTreeMap::new();
    let count = windows.len();
    if count == 0 {
        return out;
    }

    let total_gap = inner_gap * (count as f64 - 1.0);
    let width = ((reduced.width - total_gap) / count as f64).max(0.0);

    for (index, window) in windows.iter().enumerate() {
        let x = reduced.x + index as f64 * (width + inner_gap);
        let cell_width = if index == count - 1 {
            (reduced.max_x() - x).max(0.0)
        } else {
            width
        };
        out.insert(*window, Rect::new(x, reduced.y, cell_width, reduced.height));
    }
    out
}

/// Equal-height rows separated by `inner_gap`, each spanning the full width.
/// Order is preserved top to bottom.
pub fn rows(windows: &[WindowId], reduced: Rect, inner_gap: f64) -> BTreeMap<WindowId, Rect> {
    let mut out = BTreeMap::new();
    let count = windows.len();
    if count == 0 {
        return out;
    }

    let total_gap = inner_gap * (count as f64 - 1.0);
    let height = ((reduced.height - total_gap) / count as f64).max(0.0);

    for (index, window) in windows.iter().enumerate() {
        let y = reduced.y + index as f64 * (height + inner_gap);
        let cell_height = if index == count - 1 {
            (reduced.max_y() - y).max(0.0)
        } else {
            height
        };
        out.insert(*window, Rect::new(reduced.x, y, reduced.width, cell_height));
    }
    out
}

/// Every window gets the full reduced rect. The engine raises them in
/// registration order afterwards so the most recently focused ends on top.
pub fn stacked(windows: &[WindowId], reduced: Rect) -> BTreeMap<WindowId, Rect> {
    windows.iter().map(|w| (*w, reduced)).collect()
}
