//! In-memory accessibility port for tests.
//!
//! `FakePort` models a small desktop: a set of windows with frames and
//! attributes, a monitor arrangement, and a cursor. Every write is applied to
//! the model *and* appended to an operation log so tests can assert on the
//! exact port traffic (the idempotence property is "second reflow produces no
//! ops"). Failure injection covers the `Gone` and `PermissionDenied` paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use crate::events::{Event, EventSender};
use crate::geometry::{Point, Rect, Size};
use crate::ids::{MonitorId, Pid, WindowId};

use super::{
    AccessibilityPort, AttrValue, MonitorDescriptor, PortError, PortResult, SubscriptionId,
    WindowAttr, WindowSnapshot, STANDARD_WINDOW_SUBROLE,
};

/// One simulated window.
#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub pid: Pid,
    pub frame: Rect,
    pub title: String,
    pub subrole: String,
    pub modal: bool,
    pub minimized: bool,
    pub resizable: bool,
    pub fullscreen: bool,
    pub focused: bool,
    pub enhanced_ui: bool,
    pub layer: i32,
}

impl FakeWindow {
    /// A plain resizable document window.
    pub fn standard(pid: Pid, frame: Rect, title: &str) -> Self {
        FakeWindow {
            pid,
            frame,
            title: title.to_string(),
            subrole: STANDARD_WINDOW_SUBROLE.to_string(),
            modal: false,
            minimized: false,
            resizable: true,
            fullscreen: false,
            focused: false,
            enhanced_ui: false,
            layer: 0,
        }
    }
}

/// A logged port write.
#[derive(Debug, Clone, PartialEq)]
pub enum PortOp {
    SetFrame(WindowId, Rect),
    SetPosition(WindowId, Point),
    SetSize(WindowId, Size),
    Raise(WindowId),
    Focus(WindowId),
    ResizeFriendly(Pid, bool),
}

#[derive(Default)]
struct FakeState {
    windows: BTreeMap<WindowId, FakeWindow>,
    monitors: Vec<MonitorDescriptor>,
    cursor: Point,
    ops: Vec<PortOp>,
    app_ids: BTreeMap<Pid, String>,
    gone: HashSet<WindowId>,
    deny_all: bool,
    fail_subscribe: HashSet<Pid>,
    sinks: Vec<EventSender>,
    next_subscription: u64,
}

/// In-memory port. Cheap to clone state out of; all mutation goes through
/// the trait plus the test helpers below.
pub struct FakePort {
    state: Mutex<FakeState>,
}

impl FakePort {
    /// Empty desktop with no monitors.
    pub fn new() -> Self {
        FakePort {
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Desktop with a single monitor whose full and visible frames are both
    /// `frame`.
    pub fn with_monitor(frame: Rect) -> Self {
        let port = FakePort::new();
        port.add_monitor(MonitorId(1), "Fake Display", frame, frame);
        port
    }

    pub fn add_monitor(&self, id: MonitorId, name: &str, full: Rect, visible: Rect) {
        self.state.lock().unwrap().monitors.push(MonitorDescriptor {
            id,
            name: name.to_string(),
            full_frame: full,
            visible_frame: visible,
        });
    }

    pub fn set_monitors(&self, monitors: Vec<MonitorDescriptor>) {
        self.state.lock().unwrap().monitors = monitors;
    }

    pub fn set_cursor(&self, point: Point) {
        self.state.lock().unwrap().cursor = point;
    }

    pub fn set_app_id(&self, pid: Pid, app_id: &str) {
        self.state
            .lock()
            .unwrap()
            .app_ids
            .insert(pid, app_id.to_string());
    }

    pub fn add_window(&self, id: WindowId, window: FakeWindow) {
        let mut state = self.state.lock().unwrap();
        state.gone.remove(&id);
        state.windows.insert(id, window);
    }

    /// Remove the window from the desktop; subsequent operations on it fail
    /// with `Gone`.
    pub fn close_window(&self, id: WindowId) {
        let mut state = self.state.lock().unwrap();
        state.windows.remove(&id);
        state.gone.insert(id);
    }

    /// Make every subsequent operation fail with `PermissionDenied`.
    pub fn revoke_permission(&self) {
        self.state.lock().unwrap().deny_all = true;
    }

    /// Make `subscribe` fail for this pid.
    pub fn fail_subscriptions_for(&self, pid: Pid) {
        self.state.lock().unwrap().fail_subscribe.insert(pid);
    }

    pub fn allow_subscriptions_for(&self, pid: Pid) {
        self.state.lock().unwrap().fail_subscribe.remove(&pid);
    }

    /// Current frame as the fake desktop sees it.
    pub fn window_frame(&self, id: WindowId) -> Option<Rect> {
        self.state.lock().unwrap().windows.get(&id).map(|w| w.frame)
    }

    pub fn set_window_title(&self, id: WindowId, title: &str) {
        if let Some(w) = self.state.lock().unwrap().windows.get_mut(&id) {
            w.title = title.to_string();
        }
    }

    /// Drain the operation log.
    pub fn take_ops(&self) -> Vec<PortOp> {
        std::mem::take(&mut self.state.lock().unwrap().ops)
    }

    /// Number of logged geometry writes (frames, positions, sizes), ignoring
    /// raises and scope toggles.
    pub fn geometry_op_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .ops
            .iter()
            .filter(|op| {
                matches!(
                    op,
                    PortOp::SetFrame(..) | PortOp::SetPosition(..) | PortOp::SetSize(..)
                )
            })
            .count()
    }

    /// Deliver an event to every subscribed sink, as an OS callback would.
    pub fn emit(&self, event: Event) {
        let sinks = self.state.lock().unwrap().sinks.clone();
        for sink in sinks {
            let _ = sink.try_send(event.clone());
        }
    }

    fn check<'a>(
        state: &'a mut FakeState,
        window: WindowId,
    ) -> PortResult<&'a mut FakeWindow> {
        if state.deny_all {
            return Err(PortError::PermissionDenied);
        }
        if state.gone.contains(&window) {
            return Err(PortError::Gone);
        }
        state.windows.get_mut(&window).ok_or(PortError::Gone)
    }
}

impl Default for FakePort {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessibilityPort for FakePort {
    fn list_visible_windows(&self) -> PortResult<Vec<WindowSnapshot>> {
        let state = self.state.lock().unwrap();
        if state.deny_all {
            return Err(PortError::PermissionDenied);
        }
        Ok(state
            .windows
            .iter()
            .filter(|(_, w)| !w.minimized)
            .map(|(id, w)| WindowSnapshot {
                window: *id,
                pid: w.pid,
                bounds: w.frame,
                title: Some(w.title.clone()),
                layer: w.layer,
            })
            .collect())
    }

    fn list_monitors(&self) -> PortResult<Vec<MonitorDescriptor>> {
        Ok(self.state.lock().unwrap().monitors.clone())
    }

    fn cursor_position(&self) -> PortResult<Point> {
        Ok(self.state.lock().unwrap().cursor)
    }

    fn app_id(&self, pid: Pid) -> PortResult<Option<String>> {
        Ok(self.state.lock().unwrap().app_ids.get(&pid).cloned())
    }

    fn frame(&self, window: WindowId) -> PortResult<Rect> {
        let mut state = self.state.lock().unwrap();
        Self::check(&mut state, window).map(|w| w.frame)
    }

    fn set_frame(&self, window: WindowId, frame: Rect) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check(&mut state, window)?.frame = frame;
        state.ops.push(PortOp::SetFrame(window, frame));
        Ok(())
    }

    fn set_position(&self, window: WindowId, origin: Point) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        let w = Self::check(&mut state, window)?;
        w.frame.x = origin.x;
        w.frame.y = origin.y;
        state.ops.push(PortOp::SetPosition(window, origin));
        Ok(())
    }

    fn set_size(&self, window: WindowId, size: Size) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        let w = Self::check(&mut state, window)?;
        w.frame.width = size.width;
        w.frame.height = size.height;
        state.ops.push(PortOp::SetSize(window, size));
        Ok(())
    }

    fn attr(&self, window: WindowId, attr: WindowAttr) -> PortResult<AttrValue> {
        let mut state = self.state.lock().unwrap();
        let w = Self::check(&mut state, window)?;
        Ok(match attr {
            WindowAttr::Title => AttrValue::Text(w.title.clone()),
            WindowAttr::Role => AttrValue::Text("AXWindow".to_string()),
            WindowAttr::Subrole => AttrValue::Text(w.subrole.clone()),
            WindowAttr::Modal => AttrValue::Bool(w.modal),
            WindowAttr::Minimized => AttrValue::Bool(w.minimized),
            WindowAttr::Focused => AttrValue::Bool(w.focused),
            WindowAttr::Fullscreen => AttrValue::Bool(w.fullscreen),
            WindowAttr::Resizable => AttrValue::Bool(w.resizable),
            WindowAttr::EnhancedUi => AttrValue::Bool(w.enhanced_ui),
        })
    }

    fn set_attr(&self, window: WindowId, attr: WindowAttr, value: AttrValue) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        let w = Self::check(&mut state, window)?;
        match (attr, value) {
            (WindowAttr::Minimized, AttrValue::Bool(b)) => w.minimized = b,
            (WindowAttr::Fullscreen, AttrValue::Bool(b)) => w.fullscreen = b,
            (WindowAttr::EnhancedUi, AttrValue::Bool(b)) => w.enhanced_ui = b,
            _ => return Err(PortError::Unsupported("attribute is read-only")),
        }
        Ok(())
    }

    fn focus(&self, window: WindowId) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check(&mut state, window)?.focused = true;
        for (id, w) in state.windows.iter_mut() {
            if *id != window {
                w.focused = false;
            }
        }
        state.ops.push(PortOp::Focus(window));
        Ok(())
    }

    fn raise(&self, window: WindowId) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check(&mut state, window)?;
        state.ops.push(PortOp::Raise(window));
        Ok(())
    }

    fn subscribe(&self, pid: Pid, sink: EventSender) -> PortResult<SubscriptionId> {
        let mut state = self.state.lock().unwrap();
        if state.fail_subscribe.contains(&pid) {
            return Err(PortError::SubscriptionFailed(pid));
        }
        state.sinks.push(sink);
        state.next_subscription += 1;
        Ok(SubscriptionId(state.next_subscription))
    }

    fn unsubscribe(&self, _subscription: SubscriptionId) {}

    fn set_resize_friendly(&self, pid: Pid, enabled: bool) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.deny_all {
            return Err(PortError::PermissionDenied);
        }
        state.ops.push(PortOp::ResizeFriendly(pid, enabled));
        Ok(())
    }
}
