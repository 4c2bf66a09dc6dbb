//! Per-window record kept by a workspace.

use crate::geometry::{Point, Rect, SENTINEL};
use crate::ids::{Pid, WindowId};

/// What a workspace remembers about one of its windows.
///
/// The OS window handle itself is borrowed, never owned: any port operation
/// on it may discover the window is gone, and the engine treats that as a
/// destruction signal rather than an error.
#[derive(Debug, Clone)]
pub struct WindowNode {
    pub window: WindowId,
    pub pid: Pid,
    /// Cached title, refreshed on title-change events.
    pub title: String,
    /// User-requested floating state; classifier rule 1.
    pub is_floating_override: bool,
    /// The frame the engine last saw or assigned. Diffs against computed
    /// layouts are taken from here.
    pub last_known_frame: Rect,
    /// On-screen frame recorded when the window was hidden during a
    /// workspace switch; restored for floating windows on reveal.
    pub saved_frame: Option<Rect>,
}

impl WindowNode {
    pub fn new(window: WindowId, pid: Pid, frame: Rect, title: String) -> Self {
        WindowNode {
            window,
            pid,
            title,
            is_floating_override: false,
            last_known_frame: frame,
            saved_frame: None,
        }
    }

    pub fn center(&self) -> Point {
        self.last_known_frame.center()
    }

    /// True while the window is parked at the hide sentinel.
    pub fn is_hidden(&self) -> bool {
        crate::geometry::is_sentinel(self.last_known_frame.origin())
    }

    /// Park the frame at the sentinel, keeping the size so attribute-based
    /// classification stays meaningful while hidden.
    pub fn park(&mut self) {
        self.last_known_frame = Rect::new(
            SENTINEL.x,
            SENTINEL.y,
            self.last_known_frame.width,
            self.last_known_frame.height,
        );
    }
}
