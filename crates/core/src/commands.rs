//! Named commands, as delivered by the hotkey dispatcher.
//!
//! The dispatcher hands the engine a string action name from a closed set;
//! unknown names are ignored with a debug log. Commands whose preconditions
//! fail (no focused window, a single window, float layout) are silent
//! no-ops — a hotkey must never produce a visible error. The only output
//! besides window side effects is an optional transient HUD message.

use crate::executor::{BatchOp, PidBatch};
use crate::geometry::Point;
use crate::ids::{WindowId, WorkspaceId};
use crate::layout::LayoutKind;
use crate::manager::Engine;

/// Direction for focus and swap navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// Every action the engine answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    FocusDirection(Direction),
    SwapDirection(Direction),
    ToggleFloat,
    Equalize,
    CycleLayout,
    SetLayout(LayoutKind),
    MoveToWorkspace(usize),
    ActivateWorkspace(usize),
    NextWorkspace,
    PrevWorkspace,
}

impl Command {
    /// Parse an action name from the closed set.
    ///
    /// # Example
    ///
    /// ```
    /// use tatami_core::commands::{Command, Direction};
    ///
    /// assert_eq!(Command::parse("focus_left"), Some(Command::FocusDirection(Direction::Left)));
    /// assert_eq!(Command::parse("move_to_workspace_2"), Some(Command::MoveToWorkspace(2)));
    /// assert_eq!(Command::parse("make_coffee"), None);
    /// ```
    pub fn parse(name: &str) -> Option<Command> {
        let command = match name {
            "focus_left" => Command::FocusDirection(Direction::Left),
            "focus_right" => Command::FocusDirection(Direction::Right),
            "focus_up" => Command::FocusDirection(Direction::Up),
            "focus_down" => Command::FocusDirection(Direction::Down),
            "swap_left" => Command::SwapDirection(Direction::Left),
            "swap_right" => Command::SwapDirection(Direction::Right),
            "swap_up" => Command::SwapDirection(Direction::Up),
            "swap_down" => Command::SwapDirection(Direction::Down),
            "toggle_float" => Command::ToggleFloat,
            "equalize" => Command::Equalize,
            "cycle_layout" => Command::CycleLayout,
            "set_layout_bsp" => Command::SetLayout(LayoutKind::Bsp),
            "set_layout_hstack" => Command::SetLayout(LayoutKind::HStack),
            "set_layout_vstack" => Command::SetLayout(LayoutKind::VStack),
            "set_layout_zstack" => Command::SetLayout(LayoutKind::ZStack),
            "set_layout_float" => Command::SetLayout(LayoutKind::Float),
            "next_workspace" => Command::NextWorkspace,
            "prev_workspace" => Command::PrevWorkspace,
            other => {
                if let Some(index) = other.strip_prefix("move_to_workspace_") {
                    return index.parse().ok().map(Command::MoveToWorkspace);
                }
                if let Some(index) = other.strip_prefix("activate_workspace_") {
                    return index.parse().ok().map(Command::ActivateWorkspace);
                }
                return None;
            }
        };
        Some(command)
    }
}

/// Pick the best candidate strictly in `direction` from `current`.
///
/// Score is euclidean distance plus twice the perpendicular offset; ties go
/// to the smaller perpendicular offset, then the lower window id.
pub(crate) fn select_in_direction(
    current: Point,
    candidates: &[(WindowId, Point)],
    direction: Direction,
) -> Option<WindowId> {
    let mut best: Option<(f64, f64, WindowId)> = None;
    for (window, center) in candidates {
        let ahead = match direction {
            Direction::Left => center.x < current.x,
            Direction::Right => center.x > current.x,
            Direction::Up => center.y < current.y,
            Direction::Down => center.y > current.y,
        };
        if !ahead {
            continue;
        }
        let dx = center.x - current.x;
        let dy = center.y - current.y;
        let euclidean = (dx * dx + dy * dy).sqrt();
        let perpendicular = match direction {
            Direction::Left | Direction::Right => dy.abs(),
            Direction::Up | Direction::Down => dx.abs(),
        };
        let score = euclidean + 2.0 * perpendicular;
        let better = match &best {
            None => true,
            Some((best_score, best_perp, best_id)) => {
                score < *best_score
                    || (score == *best_score && perpendicular < *best_perp)
                    || (score == *best_score && perpendicular == *best_perp && *window < *best_id)
            }
        };
        if better {
            best = Some((score, perpendicular, *window));
        }
    }
    best.map(|(_, _, window)| window)
}

/// Wrap selection: the farthest window toward the opposite edge along
/// `direction`. Ties go to the lower window id.
pub(crate) fn wrap_opposite(
    candidates: &[(WindowId, Point)],
    direction: Direction,
) -> Option<WindowId> {
    let key = |center: &Point| match direction {
        // Focusing right with nothing to the right wraps to the leftmost.
        Direction::Right => center.x,
        Direction::Left => -center.x,
        Direction::Down => center.y,
        Direction::Up => -center.y,
    };
    let mut best: Option<(f64, WindowId)> = None;
    for (window, center) in candidates {
        let k = key(center);
        let better = match &best {
            None => true,
            Some((best_key, best_id)) => k < *best_key || (k == *best_key && *window < *best_id),
        };
        if better {
            best = Some((k, *window));
        }
    }
    best.map(|(_, window)| window)
}

impl Engine {
    /// Entry point for the hotkey dispatcher. Returns the HUD message, if
    /// the command produced one.
    pub async fn execute_action(&mut self, name: &str) -> Option<String> {
        match Command::parse(name) {
            Some(command) => self.execute(command).await,
            None => {
                tracing::debug!(action = name, "ignoring unknown action");
                None
            }
        }
    }

    pub async fn execute(&mut self, command: Command) -> Option<String> {
        if self.writes_disabled {
            return None;
        }
        match command {
            Command::FocusDirection(direction) => {
                self.focus_direction(direction);
                None
            }
            Command::SwapDirection(direction) => {
                self.swap_direction(direction).await;
                None
            }
            Command::ToggleFloat => {
                self.toggle_float_focused().await;
                None
            }
            Command::Equalize => {
                if let Some(ws) = self.command_workspace() {
                    self.equalize_workspace(ws).await;
                }
                None
            }
            Command::CycleLayout => {
                let ws = self.command_workspace()?;
                let next = self.workspace(ws)?.layout().cycle_next();
                self.set_workspace_layout(ws, next).await;
                Some(format!("layout changed to {next}"))
            }
            Command::SetLayout(kind) => {
                let ws = self.command_workspace()?;
                self.set_workspace_layout(ws, kind).await;
                Some(format!("layout changed to {kind}"))
            }
            Command::MoveToWorkspace(index) => {
                let window = self.focused?;
                let monitor = self.command_monitor_index();
                let target = self.monitors[monitor].workspace_at(index).map(|ws| ws.id());
                if let Some(target) = target {
                    self.move_window_to_workspace(window, target).await;
                }
                None
            }
            Command::ActivateWorkspace(index) => {
                self.activate_workspace_at(index).await;
                None
            }
            Command::NextWorkspace => {
                self.activate_next_workspace().await;
                None
            }
            Command::PrevWorkspace => {
                self.activate_prev_workspace().await;
                None
            }
        }
    }

    /// Directional focus among the visible tileable windows.
    fn focus_direction(&mut self, direction: Direction) {
        let Some((focused, current, others)) = self.directional_context() else {
            return;
        };
        let target = select_in_direction(current, &others, direction)
            .or_else(|| wrap_opposite(&others, direction));
        let Some(target) = target else { return };
        debug_assert_ne!(target, focused);
        self.focus_window(target);
    }

    /// Swap the focused window with its directional neighbour; the swap
    /// exchanges tree leaves (BSP) or stack positions, and focus stays on
    /// the original window.
    async fn swap_direction(&mut self, direction: Direction) {
        let Some((focused, current, others)) = self.directional_context() else {
            return;
        };
        let target = select_in_direction(current, &others, direction)
            .or_else(|| wrap_opposite(&others, direction));
        let Some(target) = target else { return };

        let Some(workspace_id) = self.registry.lookup(focused) else {
            return;
        };
        let swapped = match self.workspace_mut(workspace_id) {
            Some(ws) if ws.layout() == LayoutKind::Bsp => {
                ws.tree_mut().swap_windows(focused, target)
            }
            Some(ws) => ws.swap_order(focused, target),
            None => false,
        };
        if swapped {
            self.apply_tiling(workspace_id).await;
        }
    }

    /// Flip the focused window's floating override.
    async fn toggle_float_focused(&mut self) {
        let Some(window) = self.focused else { return };
        let Some(workspace_id) = self.registry.lookup(window) else {
            return;
        };
        let flipped = self
            .workspace_mut(workspace_id)
            .and_then(|ws| ws.find_window_mut(window))
            .map(|node| {
                node.is_floating_override = !node.is_floating_override;
            });
        if flipped.is_some() {
            self.classifier.invalidate(window);
            self.apply_tiling(workspace_id).await;
        }
    }

    /// The workspace commands act on: the active one on the command
    /// monitor.
    fn command_workspace(&self) -> Option<WorkspaceId> {
        self.monitors[self.command_monitor_index()].active()
    }

    /// Focused window, its center, and the centers of the other visible
    /// tileable windows of the command workspace. `None` when the focused
    /// window is missing or not tiled there.
    fn directional_context(&self) -> Option<(WindowId, Point, Vec<(WindowId, Point)>)> {
        let focused = self.focused?;
        let workspace_id = self.registry.lookup(focused)?;
        if self.command_workspace() != Some(workspace_id) {
            return None;
        }
        let ws = self.workspace(workspace_id)?;
        if !ws.tiled().contains(&focused) {
            return None;
        }
        let current = ws.find_window(focused)?.center();
        let others: Vec<(WindowId, Point)> = ws
            .tiled()
            .iter()
            .filter(|w| **w != focused)
            .filter_map(|w| ws.find_window(*w))
            .map(|node| (node.window, node.center()))
            .collect();
        if others.is_empty() {
            return None;
        }
        Some((focused, current, others))
    }

    /// Focus through the port and optimistically update the model; the
    /// focus-changed notification confirms it.
    fn focus_window(&mut self, window: WindowId) {
        let Some(workspace_id) = self.registry.lookup(window) else {
            return;
        };
        let pid = self
            .workspace(workspace_id)
            .and_then(|ws| ws.find_window(window))
            .map(|node| node.pid);
        let Some(pid) = pid else { return };
        self.executor.submit(vec![PidBatch {
            pid,
            ops: vec![BatchOp::Focus { window }, BatchOp::Raise { window }],
        }]);
        self.focused = Some(window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(id: u32) -> WindowId {
        WindowId(id)
    }

    #[test]
    fn parse_covers_the_closed_set() {
        assert_eq!(Command::parse("swap_down"), Some(Command::SwapDirection(Direction::Down)));
        assert_eq!(Command::parse("toggle_float"), Some(Command::ToggleFloat));
        assert_eq!(Command::parse("equalize"), Some(Command::Equalize));
        assert_eq!(Command::parse("cycle_layout"), Some(Command::CycleLayout));
        assert_eq!(
            Command::parse("set_layout_zstack"),
            Some(Command::SetLayout(LayoutKind::ZStack))
        );
        assert_eq!(Command::parse("activate_workspace_0"), Some(Command::ActivateWorkspace(0)));
        assert_eq!(Command::parse("next_workspace"), Some(Command::NextWorkspace));
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("move_to_workspace_x"), None);
    }

    #[test]
    fn selection_prefers_smaller_perpendicular_offset() {
        // Spec scenario S5: from (250,500), candidates at (750,500) and
        // (750,900); focusing right picks the aligned one.
        let candidates = vec![
            (w(1), Point::new(750.0, 500.0)),
            (w(2), Point::new(750.0, 900.0)),
        ];
        let picked = select_in_direction(Point::new(250.0, 500.0), &candidates, Direction::Right);
        assert_eq!(picked, Some(w(1)));
    }

    #[test]
    fn selection_is_strictly_directional() {
        let candidates = vec![(w(1), Point::new(100.0, 500.0))];
        assert_eq!(
            select_in_direction(Point::new(100.0, 500.0), &candidates, Direction::Right),
            None
        );
        assert_eq!(
            select_in_direction(Point::new(50.0, 500.0), &candidates, Direction::Right),
            Some(w(1))
        );
    }

    #[test]
    fn selection_ties_break_by_lower_window_id() {
        let candidates = vec![
            (w(9), Point::new(600.0, 400.0)),
            (w(3), Point::new(600.0, 400.0)),
        ];
        let picked = select_in_direction(Point::new(200.0, 400.0), &candidates, Direction::Right);
        assert_eq!(picked, Some(w(3)));
    }

    #[test]
    fn selection_weighs_perpendicular_offset_double() {
        // A nearer center can lose to a farther, better-aligned one.
        let aligned_far = (w(1), Point::new(900.0, 500.0));
        let offset_near = (w(2), Point::new(500.0, 800.0));
        let picked = select_in_direction(
            Point::new(200.0, 500.0),
            &[aligned_far, offset_near],
            Direction::Right,
        );
        // Far: distance 700, offset 0, score 700.
        // Near: distance ~424, offset 300, score ~1024.
        assert_eq!(picked, Some(w(1)));
    }

    #[test]
    fn wrap_picks_the_farthest_on_the_opposite_edge() {
        let candidates = vec![
            (w(1), Point::new(100.0, 500.0)),
            (w(2), Point::new(400.0, 500.0)),
        ];
        assert_eq!(wrap_opposite(&candidates, Direction::Right), Some(w(1)));
        assert_eq!(wrap_opposite(&candidates, Direction::Left), Some(w(2)));
    }

    #[test]
    fn wrap_vertical_edges() {
        let candidates = vec![
            (w(1), Point::new(500.0, 100.0)),
            (w(2), Point::new(500.0, 800.0)),
        ];
        assert_eq!(wrap_opposite(&candidates, Direction::Down), Some(w(1)));
        assert_eq!(wrap_opposite(&candidates, Direction::Up), Some(w(2)));
    }
}
