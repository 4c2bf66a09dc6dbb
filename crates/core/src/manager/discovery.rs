//! Polling safety nets: the full-enumeration scan and the geometry poll.
//!
//! Notifications get lost — processes die without saying goodbye, hooks
//! drop events under load. The full scan adopts windows we never heard
//! about and confirms destruction after two consecutive absences; the short
//! geometry poll turns frame drift into synthetic move/resize events.

use std::collections::HashSet;
use std::time::Duration;

use crate::events::Event;
use crate::geometry::{is_sentinel, Rect};
use crate::ids::WindowId;
use crate::port::PortError;

use super::core::Engine;

/// Cadence of the full-enumeration safety net.
pub const FULL_SCAN_INTERVAL: Duration = Duration::from_millis(1500);

/// Cadence of the frame-drift poll.
pub const GEOMETRY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Frame drift below this many pixels is ignored.
const DRIFT_THRESHOLD: f64 = 2.0;

impl Engine {
    /// Reconcile the model against a full window enumeration.
    pub async fn full_scan(&mut self) {
        let snapshot = match self.port.list_visible_windows() {
            Ok(snapshot) => snapshot,
            Err(PortError::PermissionDenied) => {
                self.on_permission_lost();
                return;
            }
            Err(err) => {
                tracing::debug!(error = %err, "window enumeration failed");
                return;
            }
        };

        let mut seen: HashSet<WindowId> = HashSet::new();
        for row in &snapshot {
            if row.layer == 0 {
                seen.insert(row.window);
            }
        }

        // Adopt windows that never produced a creation event.
        for row in snapshot {
            if row.layer != 0 {
                continue;
            }
            if self.registry.lookup(row.window).is_some() {
                continue;
            }
            if is_sentinel(row.bounds.origin()) {
                continue;
            }
            self.on_window_created(row.window, row.pid, row.bounds).await;
        }

        // Absence in two consecutive scans confirms destruction. Windows
        // parked off-screen by a workspace switch are expected to be absent.
        let mut confirmed: Vec<WindowId> = Vec::new();
        for (window, workspace_id) in self.registry.entries() {
            if seen.contains(&window) {
                self.missing_scans.remove(&window);
                continue;
            }
            let parked = self
                .workspace(workspace_id)
                .and_then(|ws| ws.find_window(window))
                .map_or(false, |node| node.is_hidden());
            if parked {
                self.missing_scans.remove(&window);
                continue;
            }
            if !self.missing_scans.insert(window) {
                // Second strike.
                self.missing_scans.remove(&window);
                confirmed.push(window);
            }
        }
        for window in confirmed {
            tracing::debug!(%window, "destruction confirmed by scan");
            self.on_window_destroyed(window).await;
        }
    }

    /// Compare visible windows' frames against the model and synthesize
    /// move/resize events for anything that drifted.
    pub async fn geometry_poll(&mut self) {
        let mut targets: Vec<(WindowId, Rect)> = Vec::new();
        for monitor in &self.monitors {
            if let Some(ws) = monitor.active_workspace() {
                for window in ws.window_ids() {
                    if let Some(node) = ws.find_window(*window) {
                        if !node.is_hidden() {
                            targets.push((*window, node.last_known_frame));
                        }
                    }
                }
            }
        }

        for (window, last) in targets {
            match self.port.frame(window) {
                Ok(frame) => {
                    let moved = (frame.x - last.x).abs() > DRIFT_THRESHOLD
                        || (frame.y - last.y).abs() > DRIFT_THRESHOLD;
                    let resized = (frame.width - last.width).abs() > DRIFT_THRESHOLD
                        || (frame.height - last.height).abs() > DRIFT_THRESHOLD;
                    // Through the event channel, so poll results obey the
                    // same per-window ordering as real notifications.
                    if resized {
                        let _ = self
                            .events
                            .try_send(Event::WindowResized { window, bounds: frame });
                    } else if moved {
                        let _ = self
                            .events
                            .try_send(Event::WindowMoved { window, bounds: frame });
                    }
                }
                Err(PortError::Gone) => {
                    let _ = self.events.try_send(Event::WindowDestroyed { window });
                }
                Err(PortError::PermissionDenied) => {
                    self.on_permission_lost();
                    return;
                }
                Err(_) => {}
            }
        }
    }
}
