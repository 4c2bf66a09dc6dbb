//! Process-wide window ownership registry.
//!
//! The single source of truth for which workspace owns which window. Every
//! tree mutation in a workspace is paired with a registry update inside the
//! same critical section; when both the registry and a workspace must be
//! locked, the registry is always taken first.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::ids::{WindowId, WorkspaceId};

/// `WindowId → WorkspaceId` under one mutex.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    inner: Mutex<HashMap<WindowId, WorkspaceId>>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        WindowRegistry::default()
    }

    /// Record ownership of a window. Returns false (and changes nothing) if
    /// the window is already owned by any workspace — use [`reassign`] to
    /// migrate.
    ///
    /// [`reassign`]: WindowRegistry::reassign
    pub fn assign(&self, window: WindowId, workspace: WorkspaceId) -> bool {
        let mut map = self.inner.lock().unwrap();
        match map.get(&window) {
            Some(_) => false,
            None => {
                map.insert(window, workspace);
                true
            }
        }
    }

    /// Atomically move a window to a new owner, returning the previous one.
    pub fn reassign(&self, window: WindowId, workspace: WorkspaceId) -> Option<WorkspaceId> {
        self.inner.lock().unwrap().insert(window, workspace)
    }

    pub fn lookup(&self, window: WindowId) -> Option<WorkspaceId> {
        self.inner.lock().unwrap().get(&window).copied()
    }

    pub fn remove(&self, window: WindowId) -> Option<WorkspaceId> {
        self.inner.lock().unwrap().remove(&window)
    }

    /// All windows owned by `workspace`, in unspecified order.
    pub fn windows_in(&self, workspace: WorkspaceId) -> Vec<WindowId> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, ws)| **ws == workspace)
            .map(|(w, _)| *w)
            .collect()
    }

    /// Snapshot of every (window, owner) pair.
    pub fn entries(&self) -> Vec<(WindowId, WorkspaceId)> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .map(|(w, ws)| (*w, *ws))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}
