//! Window classification: tile or float.
//!
//! The rule chain is fixed and first-match-wins; it is pure with respect to
//! the compiled rule set and the attribute snapshot taken at call time.
//! Results are cached per window in a lock-free map and invalidated on title
//! change, subrole change, or a rule-set update. Windows parked at the hide
//! sentinel are never classified — their on-screen attributes are stale.

use dashmap::DashMap;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;

use crate::config::Settings;
use crate::geometry::Size;
use crate::ids::WindowId;
use crate::port::{AccessibilityPort, PortError, PortResult, WindowAttr, STANDARD_WINDOW_SUBROLE};

/// Verdict of the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Managed by the active layout strategy.
    Tile,
    /// Left where the user (or the OS) put it.
    Float,
}

/// Windows smaller than this in both dimensions are considered utility
/// surfaces and float.
const MIN_TILE_WIDTH: f64 = 300.0;
const MIN_TILE_HEIGHT: f64 = 300.0;

/// Short-wide strips (completion popups, search bars) float.
const SHORT_WIDE_MAX_HEIGHT: f64 = 150.0;
const SHORT_WIDE_MIN_WIDTH: f64 = 300.0;

/// Attribute snapshot a classification is computed from.
///
/// Missing attributes take the tile-ward safe default: an unknown subrole is
/// treated as a standard window and an unknown resizability as resizable.
#[derive(Debug, Clone)]
pub struct WindowAttrs {
    pub title: Option<String>,
    pub subrole: Option<String>,
    pub app_id: Option<String>,
    pub modal: bool,
    pub minimized: bool,
    pub resizable: bool,
    pub size: Size,
}

impl WindowAttrs {
    /// Read the snapshot through the port. Per-attribute `AttributeMissing`
    /// degrades to the safe default; `Gone` (and anything else) propagates.
    pub fn read(port: &dyn AccessibilityPort, window: WindowId) -> PortResult<WindowAttrs> {
        let frame = port.frame(window)?;

        let text = |attr: WindowAttr| -> PortResult<Option<String>> {
            match port.attr(window, attr) {
                Ok(value) => Ok(value.as_text().map(str::to_string)),
                Err(PortError::AttributeMissing(_)) => Ok(None),
                Err(err) => Err(err),
            }
        };
        let flag = |attr: WindowAttr, default: bool| -> PortResult<bool> {
            match port.attr(window, attr) {
                Ok(value) => Ok(value.as_bool().unwrap_or(default)),
                Err(PortError::AttributeMissing(_)) => Ok(default),
                Err(err) => Err(err),
            }
        };

        Ok(WindowAttrs {
            title: text(WindowAttr::Title)?,
            subrole: text(WindowAttr::Subrole)?,
            app_id: None,
            modal: flag(WindowAttr::Modal, false)?,
            minimized: flag(WindowAttr::Minimized, false)?,
            resizable: flag(WindowAttr::Resizable, true)?,
            size: frame.size(),
        })
    }

    pub fn with_app_id(mut self, app_id: Option<String>) -> Self {
        self.app_id = app_id;
        self
    }
}

/// Rule set compiled from settings. Title patterns become case-insensitive
/// literal matchers; compilation of an escaped literal cannot fail.
#[derive(Debug, Default)]
struct CompiledRules {
    floating_app_ids: BTreeSet<String>,
    title_patterns: Vec<Regex>,
}

impl CompiledRules {
    fn from_settings(settings: &Settings) -> CompiledRules {
        let title_patterns = settings
            .floating_title_patterns
            .iter()
            .filter_map(|pattern| {
                RegexBuilder::new(&regex::escape(pattern))
                    .case_insensitive(true)
                    .build()
                    .ok()
            })
            .collect();
        CompiledRules {
            floating_app_ids: settings.floating_app_ids.clone(),
            title_patterns,
        }
    }
}

/// The classifier with its per-window verdict cache.
pub struct Classifier {
    rules: CompiledRules,
    cache: DashMap<WindowId, Placement>,
}

impl Classifier {
    pub fn new(settings: &Settings) -> Self {
        Classifier {
            rules: CompiledRules::from_settings(settings),
            cache: DashMap::new(),
        }
    }

    /// Swap in a new rule set; every cached verdict is invalidated.
    pub fn update_rules(&mut self, settings: &Settings) {
        self.rules = CompiledRules::from_settings(settings);
        self.cache.clear();
    }

    /// Classify a window, consulting the cache first.
    pub fn classify(
        &self,
        window: WindowId,
        floating_override: bool,
        attrs: &WindowAttrs,
    ) -> Placement {
        if let Some(cached) = self.cache.get(&window) {
            return *cached;
        }
        let placement = evaluate(&self.rules, floating_override, attrs);
        self.cache.insert(window, placement);
        placement
    }

    /// Drop one cached verdict (title change, override flip, destruction).
    pub fn invalidate(&self, window: WindowId) {
        self.cache.remove(&window);
    }

    pub fn invalidate_all(&self) {
        self.cache.clear();
    }
}

/// The rule chain itself, first match wins.
fn evaluate(rules: &CompiledRules, floating_override: bool, attrs: &WindowAttrs) -> Placement {
    // 1. Explicit per-window override.
    if floating_override {
        return Placement::Float;
    }
    // 2. Minimized windows are excluded from tiling, not repositioned.
    if attrs.minimized {
        return Placement::Float;
    }
    // 3. Always-float applications.
    if let Some(app_id) = &attrs.app_id {
        if rules.floating_app_ids.contains(app_id) {
            return Placement::Float;
        }
    }
    // 4. Dialogs, sheets, and other non-standard subroles.
    if let Some(subrole) = &attrs.subrole {
        if subrole != STANDARD_WINDOW_SUBROLE {
            return Placement::Float;
        }
    }
    // 5. Modal windows.
    if attrs.modal {
        return Placement::Float;
    }
    // 6. Size heuristics: tiny utility windows and short-wide strips.
    if attrs.size.width < MIN_TILE_WIDTH && attrs.size.height < MIN_TILE_HEIGHT {
        return Placement::Float;
    }
    if attrs.size.height < SHORT_WIDE_MAX_HEIGHT && attrs.size.width > SHORT_WIDE_MIN_WIDTH {
        return Placement::Float;
    }
    // 7. Configured title patterns.
    if let Some(title) = &attrs.title {
        if rules.title_patterns.iter().any(|p| p.is_match(title)) {
            return Placement::Float;
        }
    }
    // 8. Fixed-size windows cannot be tiled.
    if !attrs.resizable {
        return Placement::Float;
    }
    // 9. Everything else tiles.
    Placement::Tile
}
