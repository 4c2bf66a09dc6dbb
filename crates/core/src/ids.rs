//! Identifier newtypes used throughout the engine.
//!
//! Window and monitor handles coming out of the accessibility port are plain
//! integers; wrapping them keeps the maps in the registry and the layout tree
//! honest about what they are keyed by. Workspace ids are UUIDs because they
//! outlive a session (the settings store persists workspace definitions).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a top-level window, stable for the window's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Operating system process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pid(pub i32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid{}", self.0)
    }
}

/// Identifier of a connected monitor, stable within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonitorId(pub u32);

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "display{}", self.0)
    }
}

/// Persistent workspace identifier.
pub type WorkspaceId = uuid::Uuid;
