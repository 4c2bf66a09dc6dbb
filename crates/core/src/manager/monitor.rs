//! Monitor: ordered workspaces and one active workspace.

use crate::geometry::Rect;
use crate::ids::{MonitorId, WorkspaceId};
use crate::port::MonitorDescriptor;

use super::workspace::Workspace;

/// A connected monitor and the workspaces homed on it.
///
/// Invariant: `active`, when set, names a workspace in `workspaces`, and
/// after engine initialization every monitor holds at least one workspace.
#[derive(Debug)]
pub struct Monitor {
    id: MonitorId,
    name: String,
    full_frame: Rect,
    visible_frame: Rect,
    workspaces: Vec<Workspace>,
    active: Option<WorkspaceId>,
}

impl Monitor {
    pub fn new(descriptor: &MonitorDescriptor) -> Self {
        Monitor {
            id: descriptor.id,
            name: descriptor.name.clone(),
            full_frame: descriptor.full_frame,
            visible_frame: descriptor.visible_frame,
            workspaces: Vec::new(),
            active: None,
        }
    }

    pub fn id(&self) -> MonitorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_frame(&self) -> Rect {
        self.full_frame
    }

    pub fn visible_frame(&self) -> Rect {
        self.visible_frame
    }

    pub fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    pub fn workspaces_mut(&mut self) -> &mut [Workspace] {
        &mut self.workspaces
    }

    pub fn workspace_count(&self) -> usize {
        self.workspaces.len()
    }

    pub fn push_workspace(&mut self, workspace: Workspace) {
        if self.active.is_none() {
            self.active = Some(workspace.id());
        }
        self.workspaces.push(workspace);
    }

    /// Detach a workspace, fixing `active` if it pointed at it.
    pub fn take_workspace(&mut self, id: WorkspaceId) -> Option<Workspace> {
        let index = self.position(id)?;
        let workspace = self.workspaces.remove(index);
        if self.active == Some(id) {
            self.active = self.workspaces.first().map(|ws| ws.id());
        }
        Some(workspace)
    }

    pub fn into_workspaces(self) -> Vec<Workspace> {
        self.workspaces
    }

    pub fn workspace(&self, id: WorkspaceId) -> Option<&Workspace> {
        self.workspaces.iter().find(|ws| ws.id() == id)
    }

    pub fn workspace_mut(&mut self, id: WorkspaceId) -> Option<&mut Workspace> {
        self.workspaces.iter_mut().find(|ws| ws.id() == id)
    }

    pub fn workspace_at(&self, index: usize) -> Option<&Workspace> {
        self.workspaces.get(index)
    }

    pub fn position(&self, id: WorkspaceId) -> Option<usize> {
        self.workspaces.iter().position(|ws| ws.id() == id)
    }

    pub fn active(&self) -> Option<WorkspaceId> {
        self.active
    }

    /// Point `active` at a workspace of this monitor. The switch protocol
    /// lives in the engine; this only moves the pointer.
    pub fn set_active(&mut self, id: Option<WorkspaceId>) {
        debug_assert!(
            id.map_or(true, |id| self.position(id).is_some()),
            "active workspace must belong to the monitor"
        );
        self.active = id;
    }

    pub fn active_workspace(&self) -> Option<&Workspace> {
        self.active.and_then(|id| self.workspace(id))
    }

    pub fn active_workspace_mut(&mut self) -> Option<&mut Workspace> {
        let id = self.active?;
        self.workspace_mut(id)
    }

    /// Workspace after the active one, wrapping.
    pub fn next_workspace_id(&self) -> Option<WorkspaceId> {
        let index = self.position(self.active?)?;
        let next = (index + 1) % self.workspaces.len();
        Some(self.workspaces[next].id())
    }

    /// Workspace before the active one, wrapping.
    pub fn prev_workspace_id(&self) -> Option<WorkspaceId> {
        let index = self.position(self.active?)?;
        let prev = (index + self.workspaces.len() - 1) % self.workspaces.len();
        Some(self.workspaces[prev].id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutKind;
    use uuid::Uuid;

    fn monitor() -> Monitor {
        Monitor::new(&MonitorDescriptor {
            id: MonitorId(1),
            name: "test".to_string(),
            full_frame: Rect::new(0.0, 0.0, 1000.0, 1000.0),
            visible_frame: Rect::new(0.0, 0.0, 1000.0, 1000.0),
        })
    }

    fn workspace(name: &str) -> Workspace {
        Workspace::new(Uuid::new_v4(), name, MonitorId(1), LayoutKind::Bsp, 0.0, 0.0)
    }

    #[test]
    fn first_workspace_becomes_active() {
        let mut monitor = monitor();
        let ws = workspace("one");
        let id = ws.id();
        monitor.push_workspace(ws);
        monitor.push_workspace(workspace("two"));
        assert_eq!(monitor.active(), Some(id));
    }

    #[test]
    fn take_active_workspace_falls_back_to_first() {
        let mut monitor = monitor();
        let first = workspace("one");
        let second = workspace("two");
        let first_id = first.id();
        let second_id = second.id();
        monitor.push_workspace(first);
        monitor.push_workspace(second);

        monitor.take_workspace(first_id).unwrap();
        assert_eq!(monitor.active(), Some(second_id));
        assert_eq!(monitor.workspace_count(), 1);
    }

    #[test]
    fn next_and_prev_wrap_around() {
        let mut monitor = monitor();
        let ids: Vec<WorkspaceId> = (0..3)
            .map(|i| {
                let ws = workspace(&format!("ws{i}"));
                let id = ws.id();
                monitor.push_workspace(ws);
                id
            })
            .collect();

        assert_eq!(monitor.next_workspace_id(), Some(ids[1]));
        assert_eq!(monitor.prev_workspace_id(), Some(ids[2]));

        monitor.set_active(Some(ids[2]));
        assert_eq!(monitor.next_workspace_id(), Some(ids[0]));
    }
}
