//! Normalized engine events.
//!
//! Every change signal — accessibility notifications, poll deltas, config
//! reloads, debounce expirations — funnels into one bounded channel consumed
//! by the model loop. A single ingress keeps events for any given window in
//! source order.

use crate::config::Settings;
use crate::geometry::Rect;
use crate::ids::{Pid, WindowId, WorkspaceId};

/// Sender half of the engine's event channel. Port backends and pollers hold
/// clones of this.
pub type EventSender = tokio::sync::mpsc::Sender<Event>;

/// Receiver half, owned by the model loop.
pub type EventReceiver = tokio::sync::mpsc::Receiver<Event>;

/// Capacity of the event channel. Deep enough to absorb notification bursts
/// from a full-screen drag without backpressuring the OS callback thread.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates the engine's event channel.
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

/// A normalized event, as consumed by the model loop.
#[derive(Debug, Clone)]
pub enum Event {
    /// A new top-level window appeared.
    WindowCreated {
        window: WindowId,
        pid: Pid,
        bounds: Rect,
    },
    /// A window disappeared (observed close, process exit, or confirmed by
    /// two consecutive full scans).
    WindowDestroyed { window: WindowId },
    /// A window was moved, by the user or by another program.
    WindowMoved { window: WindowId, bounds: Rect },
    /// A window was resized.
    WindowResized { window: WindowId, bounds: Rect },
    /// Input focus moved to a window.
    FocusChanged { window: WindowId },
    /// A window's title changed. Invalidates its cached classification.
    TitleChanged { window: WindowId },
    /// An application came to the foreground.
    AppActivated { pid: Pid },
    /// The monitor arrangement changed.
    ScreenReconfigured,
    /// The settings document was reloaded.
    SettingsChanged(Settings),
    /// Internal: a debounced reflow timer expired. Stale generations are
    /// dropped so only the latest scheduled reflow for a workspace runs.
    ReflowDue {
        workspace: WorkspaceId,
        generation: u64,
    },
    /// Internal: the port refused an operation for lack of accessibility
    /// permission. Disables all port writes for the session.
    PermissionLost,
}
