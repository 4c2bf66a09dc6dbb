//! Binary space partitioning strategy.
//!
//! The workspace's layout tree is the source of the partition; this module
//! reconciles the tree against the current tileable window set and then
//! walks it over the reduced rect. Reconciliation is deliberately part of
//! the strategy call: the tree and the window set can disagree after any
//! create/destroy burst and the arrangement must never trust a stale leaf.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::geometry::Rect;
use crate::ids::WindowId;

use super::tree::LayoutTree;

/// Bring the tree in line with `windows`, then assign frames.
///
/// Missing windows are appended at the deepest rightmost leaf (split on the
/// axis opposite its parent's, ratio 0.5); leaves whose windows are gone are
/// dropped and their parent splits collapse.
pub fn arrange(
    tree: &mut LayoutTree,
    windows: &[WindowId],
    reduced: Rect,
    inner_gap: f64,
) -> BTreeMap<WindowId, Rect> {
    reconcile(tree, windows);
    tree.assign_frames(reduced, inner_gap).into_iter().collect()
}

fn reconcile(tree: &mut LayoutTree, windows: &[WindowId]) {
    let keep: BTreeSet<WindowId> = windows.iter().copied().collect();
    for stale in tree.windows() {
        if !keep.contains(&stale) {
            tree.remove_window(stale);
        }
    }
    for window in windows {
        tree.insert_window(*window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    const FRAME: Rect = Rect::new(0.0, 0.0, 1000.0, 1000.0);

    fn w(id: u32) -> WindowId {
        WindowId(id)
    }

    #[test]
    fn first_window_fills_the_frame() {
        let mut tree = LayoutTree::new();
        let out = arrange(&mut tree, &[w(1)], FRAME, 10.0);
        assert_eq!(out[&w(1)], FRAME);
    }

    #[test]
    fn insert_sequence_splits_alternating_axes() {
        // Spec scenario S2: A, then B (horizontal split), then C (vertical
        // split of the rightmost leaf), inner gap 10.
        let mut tree = LayoutTree::new();

        let out = arrange(&mut tree, &[w(1), w(2)], FRAME, 10.0);
        assert!(out[&w(1)].approx_eq(&Rect::new(0.0, 0.0, 495.0, 1000.0), 1e-9));
        assert!(out[&w(2)].approx_eq(&Rect::new(505.0, 0.0, 495.0, 1000.0), 1e-9));

        let out = arrange(&mut tree, &[w(1), w(2), w(3)], FRAME, 10.0);
        assert!(out[&w(1)].approx_eq(&Rect::new(0.0, 0.0, 495.0, 1000.0), 1e-9));
        assert!(out[&w(2)].approx_eq(&Rect::new(505.0, 0.0, 495.0, 495.0), 1e-9));
        assert!(out[&w(3)].approx_eq(&Rect::new(505.0, 505.0, 495.0, 495.0), 1e-9));
    }

    #[test]
    fn removal_collapses_the_empty_sibling() {
        // Spec scenario S3: removing B from the S2 arrangement gives A and C
        // a clean horizontal split again.
        let mut tree = LayoutTree::new();
        arrange(&mut tree, &[w(1), w(2), w(3)], FRAME, 10.0);

        let out = arrange(&mut tree, &[w(1), w(3)], FRAME, 10.0);
        assert!(out[&w(1)].approx_eq(&Rect::new(0.0, 0.0, 495.0, 1000.0), 1e-9));
        assert!(out[&w(3)].approx_eq(&Rect::new(505.0, 0.0, 495.0, 1000.0), 1e-9));
    }

    #[test]
    fn coverage_with_gaps_is_exact() {
        // BSP coverage: cell edges and divider strips reconstruct the frame.
        let mut tree = LayoutTree::new();
        let windows: Vec<WindowId> = (1..=5).map(w).collect();
        let out = arrange(&mut tree, &windows, FRAME, 10.0);

        assert_eq!(out.len(), 5);
        let area: f64 = out.values().map(|r| r.width * r.height).sum();
        assert!(area < FRAME.width * FRAME.height);
        for cell in out.values() {
            assert!(cell.x >= FRAME.x - 1e-9);
            assert!(cell.y >= FRAME.y - 1e-9);
            assert!(cell.max_x() <= FRAME.max_x() + 1e-9);
            assert!(cell.max_y() <= FRAME.max_y() + 1e-9);
        }
    }

    #[test]
    fn adjacent_cells_share_divider_lines() {
        let mut tree = LayoutTree::new();
        let out = arrange(&mut tree, &[w(1), w(2)], FRAME, 10.0);
        let a = out[&w(1)];
        let b = out[&w(2)];
        // Exactly the gap separates them and together they span the frame.
        assert!((b.x - a.max_x() - 10.0).abs() < 1e-9);
        assert!((a.x - FRAME.x).abs() < 1e-9);
        assert!((b.max_x() - FRAME.max_x()).abs() < 1e-9);
    }

    #[test]
    fn empty_window_set_clears_the_tree() {
        let mut tree = LayoutTree::new();
        arrange(&mut tree, &[w(1), w(2)], FRAME, 0.0);
        let out = arrange(&mut tree, &[], FRAME, 0.0);
        assert!(out.is_empty());
        assert!(tree.is_empty());
    }

    #[test]
    fn reconcile_is_stable_for_unchanged_sets() {
        let mut tree = LayoutTree::new();
        let windows = [w(1), w(2), w(3)];
        let first = arrange(&mut tree, &windows, FRAME, 10.0);
        let second = arrange(&mut tree, &windows, FRAME, 10.0);
        assert_eq!(first, second);
    }
}
