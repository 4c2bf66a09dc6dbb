//! Per-process event subscription bookkeeping.
//!
//! The port delivers notifications per process; this tracks which pids are
//! subscribed and which fell back to polling after a failed registration.
//! A poll-only pid gets another chance whenever its application activates —
//! processes often finish launching between the first window appearing and
//! the user switching to them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::events::EventSender;
use crate::ids::Pid;
use crate::port::{AccessibilityPort, SubscriptionId};

pub struct Observer {
    port: Arc<dyn AccessibilityPort>,
    events: EventSender,
    subscriptions: HashMap<Pid, SubscriptionId>,
    poll_only: HashSet<Pid>,
}

impl Observer {
    pub fn new(port: Arc<dyn AccessibilityPort>, events: EventSender) -> Self {
        Observer {
            port,
            events,
            subscriptions: HashMap::new(),
            poll_only: HashSet::new(),
        }
    }

    /// Subscribe to `pid` if we have not already. A failure downgrades the
    /// pid to poll-only; the periodic scans still cover it.
    pub fn ensure_subscribed(&mut self, pid: Pid) {
        if self.subscriptions.contains_key(&pid) || self.poll_only.contains(&pid) {
            return;
        }
        match self.port.subscribe(pid, self.events.clone()) {
            Ok(subscription) => {
                self.subscriptions.insert(pid, subscription);
            }
            Err(err) => {
                tracing::warn!(%pid, error = %err, "event subscription failed, polling instead");
                self.poll_only.insert(pid);
            }
        }
    }

    /// Retry a previously failed subscription (called on app activation).
    pub fn retry(&mut self, pid: Pid) {
        if self.poll_only.remove(&pid) {
            self.ensure_subscribed(pid);
        }
    }

    /// Drop the subscription for a pid whose last window is gone.
    pub fn forget(&mut self, pid: Pid) {
        if let Some(subscription) = self.subscriptions.remove(&pid) {
            self.port.unsubscribe(subscription);
        }
        self.poll_only.remove(&pid);
    }

    pub fn is_poll_only(&self, pid: Pid) -> bool {
        self.poll_only.contains(&pid)
    }

    pub fn is_subscribed(&self, pid: Pid) -> bool {
        self.subscriptions.contains_key(&pid)
    }
}
