//! Settings schema.
//!
//! The settings store owns the document on disk; the engine consumes the
//! parsed structure read-only. Every field is defaulted so a partial or
//! empty document still yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::ids::MonitorId;
use crate::layout::LayoutKind;

/// Root settings structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Layout kind for newly created workspaces.
    #[serde(default)]
    pub default_layout: LayoutKind,

    /// Gap between adjacent tiles (pixels).
    #[serde(default = "default_inner_gap")]
    pub inner_gap: u32,

    /// Gap between tiles and the monitor's visible frame (pixels).
    #[serde(default = "default_outer_gap")]
    pub outer_gap: u32,

    /// When true, new windows start with their floating override set.
    #[serde(default)]
    pub float_new_windows: bool,

    /// Application ids whose windows always float.
    #[serde(default)]
    pub floating_app_ids: BTreeSet<String>,

    /// Case-insensitive title substrings whose windows always float.
    #[serde(default)]
    pub floating_title_patterns: Vec<String>,

    /// Persistent workspace definitions.
    #[serde(default)]
    pub workspaces: Vec<WorkspaceSeed>,
}

fn default_inner_gap() -> u32 {
    10
}

fn default_outer_gap() -> u32 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_layout: LayoutKind::default(),
            inner_gap: default_inner_gap(),
            outer_gap: default_outer_gap(),
            float_new_windows: false,
            floating_app_ids: BTreeSet::new(),
            floating_title_patterns: Vec::new(),
            workspaces: Vec::new(),
        }
    }
}

/// A persisted workspace definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSeed {
    pub id: Uuid,
    pub name: String,
    pub monitor_id: MonitorId,
    #[serde(default)]
    pub layout_kind: Option<LayoutKind>,
}
