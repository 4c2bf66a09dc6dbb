//! Accessibility port: the contract between the engine and the OS.
//!
//! The engine never talks to the window server directly; every read or write
//! of window state goes through [`AccessibilityPort`]. Implementations are
//! OS-specific — the macOS backend lives in the `macos` module — and the
//! in-memory [`fake::FakePort`] stands in for the OS in tests.
//!
//! Handle resolution is the port's problem: the engine addresses windows by
//! [`WindowId`] and the backend caches whatever element handles it needs.
//! Any operation may fail with [`PortError::Gone`]; the engine treats that as
//! a destruction signal, never as a bug.

mod error;
pub mod fake;
#[cfg(target_os = "macos")]
pub mod macos;

pub use error::{PortError, PortResult};

use crate::events::EventSender;
use crate::geometry::{Point, Rect, Size};
use crate::ids::{MonitorId, Pid, WindowId};

/// One row of a full window enumeration.
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    pub window: WindowId,
    pub pid: Pid,
    pub bounds: Rect,
    pub title: Option<String>,
    /// Window-server layer. Only layer 0 windows are candidates for tiling.
    pub layer: i32,
}

/// One connected monitor as reported by the host.
#[derive(Debug, Clone)]
pub struct MonitorDescriptor {
    pub id: MonitorId,
    pub name: String,
    /// The full pixel area of the monitor.
    pub full_frame: Rect,
    /// The area not covered by system-reserved strips (menu bar, dock).
    pub visible_frame: Rect,
}

/// Attributes readable (and partly writable) through the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowAttr {
    Title,
    Role,
    Subrole,
    Modal,
    Minimized,
    Focused,
    Fullscreen,
    Resizable,
    /// Host-side assistive animation flag. Disabled around geometry batches
    /// so frame changes apply without bounce.
    EnhancedUi,
}

impl WindowAttr {
    pub fn name(&self) -> &'static str {
        match self {
            WindowAttr::Title => "title",
            WindowAttr::Role => "role",
            WindowAttr::Subrole => "subrole",
            WindowAttr::Modal => "modal",
            WindowAttr::Minimized => "minimized",
            WindowAttr::Focused => "focused",
            WindowAttr::Fullscreen => "fullscreen",
            WindowAttr::Resizable => "resizable",
            WindowAttr::EnhancedUi => "enhanced-ui",
        }
    }
}

/// Attribute values are either flags or text.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Text(String),
}

impl AttrValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            AttrValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Bool(_) => None,
        }
    }
}

/// Handle for a per-process event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// The subrole value of an ordinary, tileable document window.
pub const STANDARD_WINDOW_SUBROLE: &str = "AXStandardWindow";

/// Contract over the OS window-control API.
///
/// Geometry calls may block (they round-trip to the target process) and are
/// therefore only invoked from the executor's worker pool, never from the
/// model loop.
pub trait AccessibilityPort: Send + Sync {
    /// Cheap snapshot of all on-screen windows.
    fn list_visible_windows(&self) -> PortResult<Vec<WindowSnapshot>>;

    /// Enumerate connected monitors.
    fn list_monitors(&self) -> PortResult<Vec<MonitorDescriptor>>;

    /// Current pointer position in global coordinates.
    fn cursor_position(&self) -> PortResult<Point>;

    /// Stable identifier of the application owning `pid` (bundle id on
    /// macOS). `None` for processes without one.
    fn app_id(&self, pid: Pid) -> PortResult<Option<String>>;

    /// Read a window's current frame.
    fn frame(&self, window: WindowId) -> PortResult<Rect>;

    /// Move and resize in one logical operation.
    fn set_frame(&self, window: WindowId, frame: Rect) -> PortResult<()>;

    /// Move without resizing.
    fn set_position(&self, window: WindowId, origin: Point) -> PortResult<()>;

    /// Resize without moving.
    fn set_size(&self, window: WindowId, size: Size) -> PortResult<()>;

    /// Read an attribute. `AttributeMissing` is an expected outcome for
    /// windows that do not expose the attribute.
    fn attr(&self, window: WindowId, attr: WindowAttr) -> PortResult<AttrValue>;

    /// Write an attribute (minimized, fullscreen, enhanced-UI).
    fn set_attr(&self, window: WindowId, attr: WindowAttr, value: AttrValue) -> PortResult<()>;

    /// Give the window input focus.
    fn focus(&self, window: WindowId) -> PortResult<()>;

    /// Bring the window to the front of its layer without focusing it.
    fn raise(&self, window: WindowId) -> PortResult<()>;

    /// Register for the process's window notifications. Events are delivered
    /// into `sink` already normalized.
    fn subscribe(&self, pid: Pid, sink: EventSender) -> PortResult<SubscriptionId>;

    /// Drop a subscription. Safe to call with a stale id.
    fn unsubscribe(&self, subscription: SubscriptionId);

    /// Enter or leave resize-friendly mode for a process: suppresses
    /// host-side animation around frame changes. Callers must guarantee the
    /// flag is restored on all exit paths; the executor wraps this in an
    /// RAII scope.
    fn set_resize_friendly(&self, pid: Pid, enabled: bool) -> PortResult<()>;
}

/// The host backend for this platform.
#[cfg(target_os = "macos")]
pub fn system_port() -> PortResult<std::sync::Arc<dyn AccessibilityPort>> {
    Ok(std::sync::Arc::new(macos::MacosPort::new()?))
}

/// There is no host backend on this platform; the engine can still be
/// driven against [`fake::FakePort`].
#[cfg(not(target_os = "macos"))]
pub fn system_port() -> PortResult<std::sync::Arc<dyn AccessibilityPort>> {
    Err(PortError::Unsupported(
        "no accessibility backend for this platform",
    ))
}
