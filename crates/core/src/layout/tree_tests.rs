//! Structural tests for the arena layout tree.

use super::tree::LayoutTree;
use crate::geometry::Rect;
use crate::ids::WindowId;

fn w(id: u32) -> WindowId {
    WindowId(id)
}

#[test]
fn empty_tree() {
    let tree = LayoutTree::new();
    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    assert!(tree.windows().is_empty());
    assert!(tree.assign_frames(Rect::new(0.0, 0.0, 100.0, 100.0), 0.0).is_empty());
}

#[test]
fn insert_preserves_traversal_order() {
    let mut tree = LayoutTree::new();
    for id in 1..=5 {
        assert!(tree.insert_window(w(id)));
    }
    assert_eq!(tree.windows(), (1..=5).map(w).collect::<Vec<_>>());
    tree.check_consistency();
}

#[test]
fn duplicate_insert_is_a_noop() {
    let mut tree = LayoutTree::new();
    assert!(tree.insert_window(w(1)));
    assert!(!tree.insert_window(w(1)));
    assert_eq!(tree.len(), 1);
}

#[test]
fn remove_last_window_empties_the_tree() {
    let mut tree = LayoutTree::new();
    tree.insert_window(w(1));
    assert!(tree.remove_window(w(1)));
    assert!(tree.is_empty());
}

#[test]
fn remove_missing_window_returns_false() {
    let mut tree = LayoutTree::new();
    tree.insert_window(w(1));
    assert!(!tree.remove_window(w(9)));
    assert_eq!(tree.len(), 1);
}

#[test]
fn remove_collapses_parent_and_keeps_others() {
    let mut tree = LayoutTree::new();
    for id in 1..=4 {
        tree.insert_window(w(id));
    }
    assert!(tree.remove_window(w(2)));
    assert_eq!(tree.windows(), vec![w(1), w(3), w(4)]);
    tree.check_consistency();

    assert!(tree.remove_window(w(4)));
    assert_eq!(tree.windows(), vec![w(1), w(3)]);
    tree.check_consistency();
}

#[test]
fn remove_and_reinsert_reuses_arena_slots() {
    let mut tree = LayoutTree::new();
    for id in 1..=3 {
        tree.insert_window(w(id));
    }
    tree.remove_window(w(3));
    tree.insert_window(w(4));
    assert_eq!(tree.windows(), vec![w(1), w(2), w(4)]);
    tree.check_consistency();
}

#[test]
fn swap_exchanges_leaf_payloads_in_place() {
    let mut tree = LayoutTree::new();
    for id in 1..=3 {
        tree.insert_window(w(id));
    }
    let before = tree.assign_frames(Rect::new(0.0, 0.0, 1000.0, 1000.0), 0.0);
    assert!(tree.swap_windows(w(1), w(3)));
    let after = tree.assign_frames(Rect::new(0.0, 0.0, 1000.0, 1000.0), 0.0);

    let frame_of = |frames: &[(WindowId, Rect)], id: WindowId| {
        frames.iter().find(|(win, _)| *win == id).map(|(_, r)| *r).unwrap()
    };
    assert_eq!(frame_of(&before, w(1)), frame_of(&after, w(3)));
    assert_eq!(frame_of(&before, w(3)), frame_of(&after, w(1)));
    assert_eq!(frame_of(&before, w(2)), frame_of(&after, w(2)));
}

#[test]
fn swap_with_missing_window_fails() {
    let mut tree = LayoutTree::new();
    tree.insert_window(w(1));
    assert!(!tree.swap_windows(w(1), w(2)));
}

#[test]
fn rebalance_resets_every_ratio() {
    let mut tree = LayoutTree::new();
    for id in 1..=6 {
        tree.insert_window(w(id));
    }
    assert!(tree.set_split_ratio(w(2), 0.7));
    assert!(tree.set_split_ratio(w(5), 0.25));
    assert!(tree.ratios().iter().any(|r| *r != 0.5));

    tree.rebalance();
    let ratios = tree.ratios();
    assert_eq!(ratios.len(), 5);
    assert!(ratios.iter().all(|r| *r == 0.5));
}

#[test]
fn set_split_ratio_clamps_and_rejects_root() {
    let mut tree = LayoutTree::new();
    tree.insert_window(w(1));
    // A lone root leaf has no split above it.
    assert!(!tree.set_split_ratio(w(1), 0.7));

    tree.insert_window(w(2));
    assert!(tree.set_split_ratio(w(2), 1.5));
    assert_eq!(tree.ratios(), vec![0.95]);
}

#[test]
fn first_split_is_horizontal_then_alternates() {
    let mut tree = LayoutTree::new();
    let frame = Rect::new(0.0, 0.0, 1000.0, 1000.0);
    tree.insert_window(w(1));
    tree.insert_window(w(2));

    let frames = tree.assign_frames(frame, 0.0);
    // Horizontal first: the two cells sit side by side.
    assert_eq!(frames[0].1.y, frames[1].1.y);
    assert!(frames[0].1.x < frames[1].1.x);

    tree.insert_window(w(3));
    let frames = tree.assign_frames(frame, 0.0);
    // The second split divides the right cell vertically.
    assert_eq!(frames[1].1.x, frames[2].1.x);
    assert!(frames[1].1.y < frames[2].1.y);
}

#[test]
fn find_leaf_tracks_membership() {
    let mut tree = LayoutTree::new();
    tree.insert_window(w(1));
    tree.insert_window(w(2));
    assert!(tree.contains(w(1)));
    assert!(tree.contains(w(2)));
    assert!(!tree.contains(w(3)));
    tree.remove_window(w(1));
    assert!(!tree.contains(w(1)));
}
