//! macOS accessibility backend.
//!
//! Window enumeration comes from the CoreGraphics window list; geometry and
//! attributes go through `AXUIElement`; per-process notifications come from
//! an `AXObserver` scheduled on a dedicated run-loop thread. Resize-friendly
//! mode toggles the application's `AXEnhancedUserInterface` flag, which is
//! what makes batched frame changes land without assistive animation.
//!
//! Element handles are cached per window and dropped the moment the API
//! reports them invalid; the engine treats the resulting `Gone` as a
//! destruction signal.

#![allow(non_upper_case_globals)]

use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use core_foundation::array::CFArray;
use core_foundation::base::{CFType, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::bundle::CFBundle;
use core_foundation::dictionary::CFDictionary;
use core_foundation::number::CFNumber;
use core_foundation::runloop::{kCFRunLoopDefaultMode, CFRunLoop};
use core_foundation::string::{CFString, CFStringRef};
use core_foundation::url::CFURL;
use core_graphics::display::{CGDisplay, CGRect};
use core_graphics::event::CGEvent;
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::{CGPoint, CGSize};
use core_graphics::window as cg_window;

use crate::events::{Event, EventSender};
use crate::geometry::{Point, Rect, Size};
use crate::ids::{MonitorId, Pid, WindowId};

use super::{
    AccessibilityPort, AttrValue, MonitorDescriptor, PortError, PortResult, SubscriptionId,
    WindowAttr, WindowSnapshot,
};

type AXUIElementRef = *mut c_void;
type AXObserverRef = *mut c_void;
type CFTypeRef = *mut c_void;

const kAXErrorSuccess: i32 = 0;
const kAXErrorAttributeUnsupported: i32 = -25205;
const kAXErrorNoValue: i32 = -25212;
const kAXErrorInvalidUIElement: i32 = -25202;
const kAXErrorCannotComplete: i32 = -25204;
const kAXErrorNotificationUnsupported: i32 = -25207;
const kAXErrorAPIDisabled: i32 = -25211;

const kAXValueTypeCGPoint: u32 = 1;
const kAXValueTypeCGSize: u32 = 2;

type AXObserverCallback = unsafe extern "C" fn(
    observer: AXObserverRef,
    element: AXUIElementRef,
    notification: CFStringRef,
    refcon: *mut c_void,
);

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn AXUIElementCreateApplication(pid: i32) -> AXUIElementRef;
    fn AXUIElementCopyAttributeValue(
        element: AXUIElementRef,
        attribute: CFStringRef,
        value: *mut CFTypeRef,
    ) -> i32;
    fn AXUIElementSetAttributeValue(
        element: AXUIElementRef,
        attribute: CFStringRef,
        value: CFTypeRef,
    ) -> i32;
    fn AXUIElementIsAttributeSettable(
        element: AXUIElementRef,
        attribute: CFStringRef,
        settable: *mut bool,
    ) -> i32;
    fn AXUIElementPerformAction(element: AXUIElementRef, action: CFStringRef) -> i32;
    fn AXValueCreate(value_type: u32, value: *const c_void) -> CFTypeRef;
    fn AXValueGetValue(value: CFTypeRef, value_type: u32, out: *mut c_void) -> bool;
    fn AXObserverCreate(
        pid: i32,
        callback: AXObserverCallback,
        observer: *mut AXObserverRef,
    ) -> i32;
    fn AXObserverAddNotification(
        observer: AXObserverRef,
        element: AXUIElementRef,
        notification: CFStringRef,
        refcon: *mut c_void,
    ) -> i32;
    fn AXObserverGetRunLoopSource(observer: AXObserverRef) -> *mut c_void;
    // Maps an AX window element to its CGWindowID. Private but stable; every
    // macOS tiling manager leans on it.
    fn _AXUIElementGetWindow(element: AXUIElementRef, window: *mut u32) -> i32;
    fn CFRetain(cf: CFTypeRef) -> CFTypeRef;
    fn CFRelease(cf: CFTypeRef);
    fn CFRunLoopAddSource(rl: *mut c_void, source: *mut c_void, mode: CFStringRef);
    fn proc_pidpath(pid: i32, buffer: *mut c_void, buffersize: u32) -> i32;
}

mod attr_names {
    pub const TITLE: &str = "AXTitle";
    pub const ROLE: &str = "AXRole";
    pub const SUBROLE: &str = "AXSubrole";
    pub const MODAL: &str = "AXModal";
    pub const MINIMIZED: &str = "AXMinimized";
    pub const MAIN: &str = "AXMain";
    pub const FULLSCREEN: &str = "AXFullScreen";
    pub const SIZE: &str = "AXSize";
    pub const POSITION: &str = "AXPosition";
    pub const WINDOWS: &str = "AXWindows";
    pub const FRONTMOST: &str = "AXFrontmost";
    pub const ENHANCED_UI: &str = "AXEnhancedUserInterface";
    pub const RAISE_ACTION: &str = "AXRaise";
}

/// Notifications the backend subscribes to per application.
const APP_NOTIFICATIONS: &[(&str, NotificationKind)] = &[
    ("AXWindowCreated", NotificationKind::Created),
    ("AXUIElementDestroyed", NotificationKind::Destroyed),
    ("AXWindowMoved", NotificationKind::Moved),
    ("AXWindowResized", NotificationKind::Resized),
    ("AXFocusedWindowChanged", NotificationKind::Focused),
    ("AXTitleChanged", NotificationKind::Title),
    ("AXApplicationActivated", NotificationKind::Activated),
];

#[derive(Clone, Copy)]
enum NotificationKind {
    Created,
    Destroyed,
    Moved,
    Resized,
    Focused,
    Title,
    Activated,
}

fn ax_err(code: i32) -> PortError {
    match code {
        kAXErrorAPIDisabled => PortError::PermissionDenied,
        kAXErrorInvalidUIElement | kAXErrorCannotComplete => PortError::Gone,
        kAXErrorAttributeUnsupported | kAXErrorNoValue => PortError::AttributeMissing("attribute"),
        _ => PortError::Unsupported("accessibility call failed"),
    }
}

/// Owned `AXUIElementRef`.
struct AxElement(AXUIElementRef);

// SAFETY: AXUIElement is documented as safe to use from any thread.
unsafe impl Send for AxElement {}
unsafe impl Sync for AxElement {}

impl Drop for AxElement {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { CFRelease(self.0) };
        }
    }
}

impl AxElement {
    fn application(pid: Pid) -> Self {
        AxElement(unsafe { AXUIElementCreateApplication(pid.0) })
    }

    fn copy_attr(&self, name: &str) -> PortResult<CFType> {
        let attr = CFString::new(name);
        let mut value: CFTypeRef = ptr::null_mut();
        let code = unsafe {
            AXUIElementCopyAttributeValue(self.0, attr.as_concrete_TypeRef(), &mut value)
        };
        if code != kAXErrorSuccess {
            return Err(ax_err(code));
        }
        if value.is_null() {
            return Err(PortError::AttributeMissing("attribute"));
        }
        Ok(unsafe { CFType::wrap_under_create_rule(value.cast()) })
    }

    fn string_attr(&self, name: &str) -> PortResult<String> {
        let value = self.copy_attr(name)?;
        value
            .downcast::<CFString>()
            .map(|s| s.to_string())
            .ok_or(PortError::AttributeMissing("attribute"))
    }

    fn bool_attr(&self, name: &str) -> PortResult<bool> {
        let value = self.copy_attr(name)?;
        value
            .downcast::<CFBoolean>()
            .map(Into::into)
            .ok_or(PortError::AttributeMissing("attribute"))
    }

    fn set_bool_attr(&self, name: &str, value: bool) -> PortResult<()> {
        let attr = CFString::new(name);
        let flag = CFBoolean::from(value);
        let code = unsafe {
            AXUIElementSetAttributeValue(
                self.0,
                attr.as_concrete_TypeRef(),
                flag.as_concrete_TypeRef() as CFTypeRef,
            )
        };
        if code == kAXErrorSuccess {
            Ok(())
        } else {
            Err(ax_err(code))
        }
    }

    fn is_settable(&self, name: &str) -> PortResult<bool> {
        let attr = CFString::new(name);
        let mut settable = false;
        let code =
            unsafe { AXUIElementIsAttributeSettable(self.0, attr.as_concrete_TypeRef(), &mut settable) };
        if code == kAXErrorSuccess {
            Ok(settable)
        } else {
            Err(ax_err(code))
        }
    }

    fn position(&self) -> PortResult<Point> {
        let value = self.copy_attr(attr_names::POSITION)?;
        let mut point = CGPoint::new(0.0, 0.0);
        let ok = unsafe {
            AXValueGetValue(
                value.as_CFTypeRef() as CFTypeRef,
                kAXValueTypeCGPoint,
                (&mut point as *mut CGPoint).cast(),
            )
        };
        if ok {
            Ok(Point::new(point.x, point.y))
        } else {
            Err(PortError::AttributeMissing("position"))
        }
    }

    fn size(&self) -> PortResult<Size> {
        let value = self.copy_attr(attr_names::SIZE)?;
        let mut size = CGSize::new(0.0, 0.0);
        let ok = unsafe {
            AXValueGetValue(
                value.as_CFTypeRef() as CFTypeRef,
                kAXValueTypeCGSize,
                (&mut size as *mut CGSize).cast(),
            )
        };
        if ok {
            Ok(Size::new(size.width, size.height))
        } else {
            Err(PortError::AttributeMissing("size"))
        }
    }

    fn set_position(&self, point: Point) -> PortResult<()> {
        let cg = CGPoint::new(point.x, point.y);
        let value = unsafe { AXValueCreate(kAXValueTypeCGPoint, (&cg as *const CGPoint).cast()) };
        if value.is_null() {
            return Err(PortError::Unsupported("AXValueCreate failed"));
        }
        let attr = CFString::new(attr_names::POSITION);
        let code = unsafe { AXUIElementSetAttributeValue(self.0, attr.as_concrete_TypeRef(), value) };
        unsafe { CFRelease(value) };
        if code == kAXErrorSuccess {
            Ok(())
        } else {
            Err(ax_err(code))
        }
    }

    fn set_size(&self, size: Size) -> PortResult<()> {
        let cg = CGSize::new(size.width, size.height);
        let value = unsafe { AXValueCreate(kAXValueTypeCGSize, (&cg as *const CGSize).cast()) };
        if value.is_null() {
            return Err(PortError::Unsupported("AXValueCreate failed"));
        }
        let attr = CFString::new(attr_names::SIZE);
        let code = unsafe { AXUIElementSetAttributeValue(self.0, attr.as_concrete_TypeRef(), value) };
        unsafe { CFRelease(value) };
        if code == kAXErrorSuccess {
            Ok(())
        } else {
            Err(ax_err(code))
        }
    }

    fn perform(&self, action: &str) -> PortResult<()> {
        let name = CFString::new(action);
        let code = unsafe { AXUIElementPerformAction(self.0, name.as_concrete_TypeRef()) };
        if code == kAXErrorSuccess {
            Ok(())
        } else {
            Err(ax_err(code))
        }
    }

    fn window_id(&self) -> Option<WindowId> {
        let mut id: u32 = 0;
        let code = unsafe { _AXUIElementGetWindow(self.0, &mut id) };
        (code == kAXErrorSuccess && id != 0).then_some(WindowId(id))
    }
}

struct ObserverContext {
    sink: EventSender,
    pid: Pid,
}

struct SubscriptionHandle {
    run_loop: CFRunLoop,
    // Keeps the refcon alive for as long as the observer can fire.
    _context: Arc<ObserverContext>,
    observer: SendPtr,
}

struct SendPtr(*mut c_void);
// SAFETY: the pointer is only released after its run loop stopped.
unsafe impl Send for SendPtr {}

unsafe extern "C" fn observer_callback(
    _observer: AXObserverRef,
    element: AXUIElementRef,
    notification: CFStringRef,
    refcon: *mut c_void,
) {
    if refcon.is_null() {
        return;
    }
    let context = &*(refcon as *const ObserverContext);
    let name = CFString::wrap_under_get_rule(notification).to_string();

    // The element is borrowed from the callback; read what we need and
    // forget it so the drop impl does not over-release.
    let element = AxElement(element);
    let window = element.window_id();
    let frame = element.position().ok().zip(element.size().ok()).map(
        |(origin, size)| Rect::new(origin.x, origin.y, size.width, size.height),
    );
    std::mem::forget(element);

    let kind = APP_NOTIFICATIONS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, kind)| *kind);
    let Some(kind) = kind else { return };

    let event = match (kind, window) {
        (NotificationKind::Activated, _) => Event::AppActivated { pid: context.pid },
        (NotificationKind::Destroyed, Some(window)) => Event::WindowDestroyed { window },
        (NotificationKind::Focused, Some(window)) => Event::FocusChanged { window },
        (NotificationKind::Title, Some(window)) => Event::TitleChanged { window },
        (NotificationKind::Created, Some(window)) => match frame {
            Some(bounds) => Event::WindowCreated {
                window,
                pid: context.pid,
                bounds,
            },
            None => return,
        },
        (NotificationKind::Moved, Some(window)) => match frame {
            Some(bounds) => Event::WindowMoved { window, bounds },
            None => return,
        },
        (NotificationKind::Resized, Some(window)) => match frame {
            Some(bounds) => Event::WindowResized { window, bounds },
            None => return,
        },
        _ => return,
    };
    let _ = context.sink.try_send(event);
}

/// The macOS accessibility port.
pub struct MacosPort {
    app_elements: Mutex<HashMap<Pid, Arc<AxElement>>>,
    window_elements: Mutex<HashMap<WindowId, (Pid, Arc<AxElement>)>>,
    bundle_ids: Mutex<HashMap<Pid, Option<String>>>,
    subscriptions: Mutex<HashMap<SubscriptionId, SubscriptionHandle>>,
    next_subscription: AtomicU64,
}

impl MacosPort {
    pub fn new() -> PortResult<Self> {
        if !unsafe { AXIsProcessTrusted() } {
            return Err(PortError::PermissionDenied);
        }
        Ok(MacosPort {
            app_elements: Mutex::new(HashMap::new()),
            window_elements: Mutex::new(HashMap::new()),
            bundle_ids: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        })
    }

    fn app_element(&self, pid: Pid) -> Arc<AxElement> {
        self.app_elements
            .lock()
            .unwrap()
            .entry(pid)
            .or_insert_with(|| Arc::new(AxElement::application(pid)))
            .clone()
    }

    /// Resolve a window id to its AX element, consulting the cache first.
    fn window_element(&self, window: WindowId) -> PortResult<Arc<AxElement>> {
        if let Some((_, element)) = self.window_elements.lock().unwrap().get(&window) {
            return Ok(element.clone());
        }

        // Find the owning pid in the window list, then match the element by
        // its CGWindowID.
        let pid = self
            .list_visible_windows()?
            .into_iter()
            .find(|row| row.window == window)
            .map(|row| row.pid)
            .ok_or(PortError::Gone)?;

        let app = self.app_element(pid);
        let windows = app.copy_attr(attr_names::WINDOWS)?;
        let array = windows.downcast::<CFArray<CFType>>().ok_or(PortError::Gone)?;
        for item in array.iter() {
            let element = AxElement(item.as_CFTypeRef() as AXUIElementRef);
            let found = element.window_id() == Some(window);
            // Items are borrowed from the array.
            std::mem::forget(element);
            if found {
                let owned = AxElement(unsafe { CFRetain(item.as_CFTypeRef() as CFTypeRef) });
                let owned = Arc::new(owned);
                self.window_elements
                    .lock()
                    .unwrap()
                    .insert(window, (pid, owned.clone()));
                return Ok(owned);
            }
        }
        Err(PortError::Gone)
    }

    fn evict(&self, window: WindowId) {
        self.window_elements.lock().unwrap().remove(&window);
    }

    /// Drop the cached element when the API says it is stale, so the next
    /// call re-resolves instead of failing forever.
    fn with_window<T>(
        &self,
        window: WindowId,
        op: impl Fn(&AxElement) -> PortResult<T>,
    ) -> PortResult<T> {
        let element = self.window_element(window)?;
        match op(&element) {
            Err(PortError::Gone) => {
                self.evict(window);
                Err(PortError::Gone)
            }
            other => other,
        }
    }

    fn bundle_id_uncached(pid: Pid) -> Option<String> {
        let mut buffer = vec![0u8; 4096];
        let len = unsafe { proc_pidpath(pid.0, buffer.as_mut_ptr().cast(), buffer.len() as u32) };
        if len <= 0 {
            return None;
        }
        buffer.truncate(len as usize);
        let path = String::from_utf8(buffer).ok()?;
        // "/Applications/Safari.app/Contents/MacOS/Safari" -> the .app root.
        let app_root = path.find(".app/").map(|idx| &path[..idx + 4])?;
        let url = CFURL::from_path(app_root, true)?;
        let bundle = CFBundle::new(url)?;
        let info = bundle.info_dictionary();
        let key = CFString::from_static_string("CFBundleIdentifier");
        info.find(&key)
            .and_then(|value| value.downcast::<CFString>())
            .map(|s| s.to_string())
    }
}

impl AccessibilityPort for MacosPort {
    fn list_visible_windows(&self) -> PortResult<Vec<WindowSnapshot>> {
        let options = cg_window::kCGWindowListOptionOnScreenOnly
            | cg_window::kCGWindowListExcludeDesktopElements;
        let info = cg_window::copy_window_info(options, cg_window::kCGNullWindowID)
            .ok_or(PortError::Unsupported("window list unavailable"))?;

        let mut out = Vec::new();
        for item in info.iter() {
            let dict =
                unsafe { CFDictionary::<CFString, CFType>::wrap_under_get_rule((*item).cast()) };

            let number = |key: &'static str| -> Option<i64> {
                dict.find(CFString::from_static_string(key))
                    .and_then(|v| v.downcast::<CFNumber>())
                    .and_then(|n| n.to_i64())
            };

            let Some(window) = number("kCGWindowNumber") else { continue };
            let Some(pid) = number("kCGWindowOwnerPID") else { continue };
            let layer = number("kCGWindowLayer").unwrap_or(0);

            let bounds = dict
                .find(CFString::from_static_string("kCGWindowBounds"))
                .and_then(|v| v.downcast::<CFDictionary>())
                .and_then(|d| CGRect::from_dict_representation(&d.to_untyped()));
            let Some(bounds) = bounds else { continue };

            let title = dict
                .find(CFString::from_static_string("kCGWindowName"))
                .and_then(|v| v.downcast::<CFString>())
                .map(|s| s.to_string());

            out.push(WindowSnapshot {
                window: WindowId(window as u32),
                pid: Pid(pid as i32),
                bounds: Rect::new(
                    bounds.origin.x,
                    bounds.origin.y,
                    bounds.size.width,
                    bounds.size.height,
                ),
                title,
                layer: layer as i32,
            });
        }
        Ok(out)
    }

    fn list_monitors(&self) -> PortResult<Vec<MonitorDescriptor>> {
        let displays = CGDisplay::active_displays()
            .map_err(|_| PortError::Unsupported("display enumeration failed"))?;
        let main_id = CGDisplay::main().id;

        let mut out = Vec::new();
        for id in displays {
            let display = CGDisplay::new(id);
            let bounds = display.bounds();
            let full = Rect::new(
                bounds.origin.x,
                bounds.origin.y,
                bounds.size.width,
                bounds.size.height,
            );
            // The menu bar reserves the top strip of the main display; the
            // visible frame for secondary displays matches the full frame.
            let visible = if id == main_id {
                const MENU_BAR_HEIGHT: f64 = 24.0;
                Rect::new(
                    full.x,
                    full.y + MENU_BAR_HEIGHT,
                    full.width,
                    (full.height - MENU_BAR_HEIGHT).max(0.0),
                )
            } else {
                full
            };
            out.push(MonitorDescriptor {
                id: MonitorId(id),
                name: format!("display {id}"),
                full_frame: full,
                visible_frame: visible,
            });
        }
        Ok(out)
    }

    fn cursor_position(&self) -> PortResult<Point> {
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| PortError::Unsupported("event source unavailable"))?;
        let event =
            CGEvent::new(source).map_err(|_| PortError::Unsupported("cursor read failed"))?;
        let location = event.location();
        Ok(Point::new(location.x, location.y))
    }

    fn app_id(&self, pid: Pid) -> PortResult<Option<String>> {
        if let Some(cached) = self.bundle_ids.lock().unwrap().get(&pid) {
            return Ok(cached.clone());
        }
        let bundle_id = Self::bundle_id_uncached(pid);
        self.bundle_ids.lock().unwrap().insert(pid, bundle_id.clone());
        Ok(bundle_id)
    }

    fn frame(&self, window: WindowId) -> PortResult<Rect> {
        self.with_window(window, |element| {
            let origin = element.position()?;
            let size = element.size()?;
            Ok(Rect::new(origin.x, origin.y, size.width, size.height))
        })
    }

    fn set_frame(&self, window: WindowId, frame: Rect) -> PortResult<()> {
        self.with_window(window, |element| {
            element.set_size(frame.size())?;
            element.set_position(frame.origin())?;
            Ok(())
        })
    }

    fn set_position(&self, window: WindowId, origin: Point) -> PortResult<()> {
        self.with_window(window, |element| element.set_position(origin))
    }

    fn set_size(&self, window: WindowId, size: Size) -> PortResult<()> {
        self.with_window(window, |element| element.set_size(size))
    }

    fn attr(&self, window: WindowId, attr: WindowAttr) -> PortResult<AttrValue> {
        self.with_window(window, |element| match attr {
            WindowAttr::Title => element.string_attr(attr_names::TITLE).map(AttrValue::Text),
            WindowAttr::Role => element.string_attr(attr_names::ROLE).map(AttrValue::Text),
            WindowAttr::Subrole => element.string_attr(attr_names::SUBROLE).map(AttrValue::Text),
            WindowAttr::Modal => element.bool_attr(attr_names::MODAL).map(AttrValue::Bool),
            WindowAttr::Minimized => element.bool_attr(attr_names::MINIMIZED).map(AttrValue::Bool),
            WindowAttr::Focused => element.bool_attr(attr_names::MAIN).map(AttrValue::Bool),
            WindowAttr::Fullscreen => {
                element.bool_attr(attr_names::FULLSCREEN).map(AttrValue::Bool)
            }
            WindowAttr::Resizable => element.is_settable(attr_names::SIZE).map(AttrValue::Bool),
            WindowAttr::EnhancedUi => {
                // Lives on the application element.
                Err(PortError::AttributeMissing("enhanced-ui"))
            }
        })
    }

    fn set_attr(&self, window: WindowId, attr: WindowAttr, value: AttrValue) -> PortResult<()> {
        let flag = value
            .as_bool()
            .ok_or(PortError::Unsupported("expected a boolean attribute"))?;
        self.with_window(window, |element| match attr {
            WindowAttr::Minimized => element.set_bool_attr(attr_names::MINIMIZED, flag),
            WindowAttr::Fullscreen => element.set_bool_attr(attr_names::FULLSCREEN, flag),
            _ => Err(PortError::Unsupported("attribute is read-only")),
        })
    }

    fn focus(&self, window: WindowId) -> PortResult<()> {
        let pid = self
            .window_elements
            .lock()
            .unwrap()
            .get(&window)
            .map(|(pid, _)| *pid);
        self.with_window(window, |element| {
            element.set_bool_attr(attr_names::MAIN, true)?;
            element.perform(attr_names::RAISE_ACTION)
        })?;
        if let Some(pid) = pid {
            let _ = self.app_element(pid).set_bool_attr(attr_names::FRONTMOST, true);
        }
        Ok(())
    }

    fn raise(&self, window: WindowId) -> PortResult<()> {
        self.with_window(window, |element| element.perform(attr_names::RAISE_ACTION))
    }

    fn subscribe(&self, pid: Pid, sink: EventSender) -> PortResult<SubscriptionId> {
        let context = Arc::new(ObserverContext { sink, pid });
        let refcon = Arc::as_ptr(&context) as *mut c_void;

        let mut observer: AXObserverRef = ptr::null_mut();
        let code = unsafe { AXObserverCreate(pid.0, observer_callback, &mut observer) };
        if code != kAXErrorSuccess || observer.is_null() {
            return Err(PortError::SubscriptionFailed(pid));
        }

        let app = AxElement::application(pid);
        let mut registered = 0;
        for (name, _) in APP_NOTIFICATIONS {
            let notification = CFString::new(name);
            let code = unsafe {
                AXObserverAddNotification(
                    observer,
                    app.0,
                    notification.as_concrete_TypeRef(),
                    refcon,
                )
            };
            if code == kAXErrorSuccess {
                registered += 1;
            } else if code != kAXErrorNotificationUnsupported {
                tracing::debug!(%pid, name, code, "notification registration failed");
            }
        }
        if registered == 0 {
            unsafe { CFRelease(observer) };
            return Err(PortError::SubscriptionFailed(pid));
        }

        // Schedule the observer on a dedicated run loop so callbacks never
        // land on the model thread.
        let source = SendPtr(unsafe { AXObserverGetRunLoopSource(observer) });
        let (loop_tx, loop_rx) = std::sync::mpsc::channel::<CFRunLoop>();
        std::thread::Builder::new()
            .name(format!("ax-observer-{}", pid.0))
            .spawn(move || {
                let run_loop = CFRunLoop::get_current();
                unsafe {
                    CFRunLoopAddSource(
                        run_loop.as_concrete_TypeRef() as *mut c_void,
                        source.0,
                        kCFRunLoopDefaultMode,
                    );
                }
                let _ = loop_tx.send(run_loop);
                CFRunLoop::run_current();
            })
            .map_err(|_| PortError::SubscriptionFailed(pid))?;
        let run_loop = loop_rx
            .recv()
            .map_err(|_| PortError::SubscriptionFailed(pid))?;

        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.lock().unwrap().insert(
            id,
            SubscriptionHandle {
                run_loop,
                _context: context,
                observer: SendPtr(observer),
            },
        );
        Ok(id)
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        if let Some(handle) = self.subscriptions.lock().unwrap().remove(&subscription) {
            handle.run_loop.stop();
            unsafe { CFRelease(handle.observer.0) };
        }
    }

    fn set_resize_friendly(&self, pid: Pid, enabled: bool) -> PortResult<()> {
        // Disabling the assistive-animation flag makes frame writes land
        // immediately; the executor restores it after each batch.
        self.app_element(pid)
            .set_bool_attr(attr_names::ENHANCED_UI, !enabled)
    }
}
