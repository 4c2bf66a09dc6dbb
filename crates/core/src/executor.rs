//! Port executor: the bounded worker pool for geometry and focus calls.
//!
//! The model loop never blocks on the port. It hands the executor
//! self-contained per-pid batches; every pid has its own FIFO queue and a
//! single consumer, so operations for one process execute in submission
//! order while different processes proceed concurrently. A semaphore bounds
//! total in-flight port work. A batch opens the port's resize-friendly
//! scope before touching frames and is guaranteed to close it on every exit
//! path.
//!
//! `fence` waits for everything submitted so far; the workspace switch
//! protocol uses it so no operation from the outgoing workspace can
//! interleave with the incoming one's.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::sync::{Notify, Semaphore};

use crate::events::{Event, EventSender};
use crate::geometry::{Point, Rect};
use crate::ids::{Pid, WindowId};
use crate::port::{AccessibilityPort, PortError};

/// Bound on concurrently executing port calls.
pub const WORKER_LIMIT: usize = 6;

/// One operation inside a pid batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Resize then move to the target frame. Resize-before-move produces
    /// fewer intermediate repaints.
    Place { window: WindowId, frame: Rect },
    /// Move only, keeping the current size (sentinel parking).
    MoveTo { window: WindowId, origin: Point },
    Raise { window: WindowId },
    Focus { window: WindowId },
}

impl BatchOp {
    fn target(&self) -> WindowId {
        match self {
            BatchOp::Place { window, .. }
            | BatchOp::MoveTo { window, .. }
            | BatchOp::Raise { window }
            | BatchOp::Focus { window } => *window,
        }
    }
}

/// All operations destined for one process, executed in order.
#[derive(Debug, Clone)]
pub struct PidBatch {
    pub pid: Pid,
    pub ops: Vec<BatchOp>,
}

/// Executes batches against the port from a bounded pool.
pub struct PortExecutor {
    port: Arc<dyn AccessibilityPort>,
    events: EventSender,
    semaphore: Arc<Semaphore>,
    /// Queue per process; its consumer serializes that process's batches.
    queues: HashMap<Pid, UnboundedSender<PidBatch>>,
    /// Queue whose consumer runs batch *sequences* in order, across pids.
    ordered_queue: Option<UnboundedSender<Vec<PidBatch>>>,
    pending: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl PortExecutor {
    pub fn new(port: Arc<dyn AccessibilityPort>, events: EventSender) -> Self {
        PortExecutor {
            port,
            events,
            semaphore: Arc::new(Semaphore::new(WORKER_LIMIT)),
            queues: HashMap::new(),
            ordered_queue: None,
            pending: Arc::new(AtomicUsize::new(0)),
            drained: Arc::new(Notify::new()),
        }
    }

    /// Enqueue batches. Returns immediately; failures surface as synthetic
    /// events (`WindowDestroyed` for `Gone`, `PermissionLost` for a
    /// refusal). Batches for one pid run in submission order.
    pub fn submit(&mut self, batches: Vec<PidBatch>) {
        for batch in batches {
            if batch.ops.is_empty() {
                continue;
            }
            let pid = batch.pid;
            self.pending.fetch_add(1, Ordering::AcqRel);
            let queue = self.pid_queue(pid);
            if queue.send(batch).is_err() {
                self.settle_one();
            }
        }
    }

    /// Run a sequence of batches strictly in order on one consumer. Used
    /// where cross-process ordering matters — a z-stack raise sequence is
    /// only meaningful executed in order.
    pub fn submit_ordered(&mut self, batches: Vec<PidBatch>) {
        let batches: Vec<PidBatch> = batches.into_iter().filter(|b| !b.ops.is_empty()).collect();
        if batches.is_empty() {
            return;
        }
        self.pending.fetch_add(1, Ordering::AcqRel);
        let queue = self.ordered_queue();
        if queue.send(batches).is_err() {
            self.settle_one();
        }
    }

    /// Wait for everything submitted so far to finish.
    pub async fn fence(&mut self) {
        loop {
            let drained = self.drained.notified();
            tokio::pin!(drained);
            // Register interest before re-checking, so a decrement landing
            // in between cannot be missed.
            drained.as_mut().enable();
            if self.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            drained.await;
        }
    }

    fn pid_queue(&mut self, pid: Pid) -> UnboundedSender<PidBatch> {
        if let Some(queue) = self.queues.get(&pid) {
            if !queue.is_closed() {
                return queue.clone();
            }
        }
        let (tx, mut rx) = unbounded_channel::<PidBatch>();
        let port = Arc::clone(&self.port);
        let events = self.events.clone();
        let semaphore = Arc::clone(&self.semaphore);
        let pending = Arc::clone(&self.pending);
        let drained = Arc::clone(&self.drained);
        tokio::spawn(async move {
            while let Some(batch) = rx.recv().await {
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };
                let port = Arc::clone(&port);
                let events = events.clone();
                let join = tokio::task::spawn_blocking(move || {
                    run_batch(port.as_ref(), &batch, &events);
                })
                .await;
                drop(permit);
                if let Err(err) = join {
                    tracing::error!(error = %err, "port batch worker panicked");
                }
                if pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                    drained.notify_waiters();
                }
            }
        });
        self.queues.insert(pid, tx.clone());
        tx
    }

    fn ordered_queue(&mut self) -> UnboundedSender<Vec<PidBatch>> {
        if let Some(queue) = &self.ordered_queue {
            if !queue.is_closed() {
                return queue.clone();
            }
        }
        let (tx, mut rx) = unbounded_channel::<Vec<PidBatch>>();
        let port = Arc::clone(&self.port);
        let events = self.events.clone();
        let semaphore = Arc::clone(&self.semaphore);
        let pending = Arc::clone(&self.pending);
        let drained = Arc::clone(&self.drained);
        tokio::spawn(async move {
            while let Some(batches) = rx.recv().await {
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };
                let port = Arc::clone(&port);
                let events = events.clone();
                let join = tokio::task::spawn_blocking(move || {
                    for batch in &batches {
                        run_batch(port.as_ref(), batch, &events);
                    }
                })
                .await;
                drop(permit);
                if let Err(err) = join {
                    tracing::error!(error = %err, "port batch worker panicked");
                }
                if pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                    drained.notify_waiters();
                }
            }
        });
        self.ordered_queue = Some(tx.clone());
        tx
    }

    fn settle_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

fn run_batch(port: &dyn AccessibilityPort, batch: &PidBatch, events: &EventSender) {
    let needs_geometry = batch
        .ops
        .iter()
        .any(|op| matches!(op, BatchOp::Place { .. } | BatchOp::MoveTo { .. }));
    let _scope = needs_geometry.then(|| ResizeFriendlyScope::enter(port, batch.pid));

    for op in &batch.ops {
        let result = match op {
            BatchOp::Place { window, frame } => port
                .set_size(*window, frame.size())
                .and_then(|()| port.set_position(*window, frame.origin())),
            BatchOp::MoveTo { window, origin } => port.set_position(*window, *origin),
            BatchOp::Raise { window } => port.raise(*window),
            BatchOp::Focus { window } => port.focus(*window),
        };
        match result {
            Ok(()) => {}
            Err(PortError::Gone) => {
                // The window died under us; report it and drop its ops.
                let _ = events.try_send(Event::WindowDestroyed { window: op.target() });
            }
            Err(PortError::PermissionDenied) => {
                let _ = events.try_send(Event::PermissionLost);
                return;
            }
            Err(err) => {
                tracing::debug!(window = %op.target(), error = %err, "port operation failed");
            }
        }
    }
}

/// RAII wrapper around the port's resize-friendly mode. Restores the flag on
/// drop, which covers every exit path out of a batch.
struct ResizeFriendlyScope<'a> {
    port: &'a dyn AccessibilityPort,
    pid: Pid,
    engaged: bool,
}

impl<'a> ResizeFriendlyScope<'a> {
    fn enter(port: &'a dyn AccessibilityPort, pid: Pid) -> Self {
        let engaged = match port.set_resize_friendly(pid, true) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(%pid, error = %err, "could not enter resize-friendly mode");
                false
            }
        };
        ResizeFriendlyScope { port, pid, engaged }
    }
}

impl Drop for ResizeFriendlyScope<'_> {
    fn drop(&mut self) {
        if self.engaged {
            let _ = self.port.set_resize_friendly(self.pid, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;
    use crate::port::fake::{FakePort, FakeWindow, PortOp};

    fn place(window: u32, x: f64) -> BatchOp {
        BatchOp::Place {
            window: WindowId(window),
            frame: Rect::new(x, 0.0, 500.0, 500.0),
        }
    }

    #[tokio::test]
    async fn batch_wraps_geometry_in_resize_friendly_scope() {
        let port = Arc::new(FakePort::with_monitor(Rect::new(0.0, 0.0, 1000.0, 1000.0)));
        port.add_window(
            WindowId(1),
            FakeWindow::standard(Pid(10), Rect::new(0.0, 0.0, 100.0, 100.0), "a"),
        );
        let (tx, _rx) = events::channel();
        let mut executor = PortExecutor::new(port.clone(), tx);

        executor.submit(vec![PidBatch {
            pid: Pid(10),
            ops: vec![place(1, 0.0)],
        }]);
        executor.fence().await;

        let ops = port.take_ops();
        assert_eq!(ops.first(), Some(&PortOp::ResizeFriendly(Pid(10), true)));
        assert_eq!(ops.last(), Some(&PortOp::ResizeFriendly(Pid(10), false)));
        // Resize lands before the move.
        let size_idx = ops
            .iter()
            .position(|op| matches!(op, PortOp::SetSize(..)))
            .unwrap();
        let pos_idx = ops
            .iter()
            .position(|op| matches!(op, PortOp::SetPosition(..)))
            .unwrap();
        assert!(size_idx < pos_idx);
    }

    #[tokio::test]
    async fn same_pid_batches_run_in_submission_order() {
        let port = Arc::new(FakePort::with_monitor(Rect::new(0.0, 0.0, 1000.0, 1000.0)));
        port.add_window(
            WindowId(1),
            FakeWindow::standard(Pid(10), Rect::new(0.0, 0.0, 100.0, 100.0), "a"),
        );
        let (tx, _rx) = events::channel();
        let mut executor = PortExecutor::new(port.clone(), tx);

        for step in 0..16 {
            executor.submit(vec![PidBatch {
                pid: Pid(10),
                ops: vec![place(1, step as f64 * 10.0)],
            }]);
        }
        executor.fence().await;

        // The last submitted frame wins.
        assert_eq!(port.window_frame(WindowId(1)).unwrap().x, 150.0);
    }

    #[tokio::test]
    async fn gone_window_produces_synthetic_destroy() {
        let port = Arc::new(FakePort::with_monitor(Rect::new(0.0, 0.0, 1000.0, 1000.0)));
        let (tx, mut rx) = events::channel();
        let mut executor = PortExecutor::new(port.clone(), tx);

        executor.submit(vec![PidBatch {
            pid: Pid(10),
            ops: vec![place(99, 0.0)],
        }]);
        executor.fence().await;

        match rx.try_recv() {
            Ok(Event::WindowDestroyed { window }) => assert_eq!(window, WindowId(99)),
            other => panic!("expected synthetic destroy, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn raise_only_batch_skips_resize_friendly_mode() {
        let port = Arc::new(FakePort::with_monitor(Rect::new(0.0, 0.0, 1000.0, 1000.0)));
        port.add_window(
            WindowId(1),
            FakeWindow::standard(Pid(10), Rect::new(0.0, 0.0, 100.0, 100.0), "a"),
        );
        let (tx, _rx) = events::channel();
        let mut executor = PortExecutor::new(port.clone(), tx);

        executor.submit(vec![PidBatch {
            pid: Pid(10),
            ops: vec![BatchOp::Raise { window: WindowId(1) }],
        }]);
        executor.fence().await;

        let ops = port.take_ops();
        assert_eq!(ops, vec![PortOp::Raise(WindowId(1))]);
    }

    #[tokio::test]
    async fn ordered_sequence_preserves_cross_pid_order() {
        let port = Arc::new(FakePort::with_monitor(Rect::new(0.0, 0.0, 1000.0, 1000.0)));
        for id in 1..=3u32 {
            port.add_window(
                WindowId(id),
                FakeWindow::standard(Pid(id as i32), Rect::new(0.0, 0.0, 100.0, 100.0), "w"),
            );
        }
        let (tx, _rx) = events::channel();
        let mut executor = PortExecutor::new(port.clone(), tx);

        executor.submit_ordered(
            (1..=3u32)
                .map(|id| PidBatch {
                    pid: Pid(id as i32),
                    ops: vec![BatchOp::Raise { window: WindowId(id) }],
                })
                .collect(),
        );
        executor.fence().await;

        let raises: Vec<WindowId> = port
            .take_ops()
            .into_iter()
            .filter_map(|op| match op {
                PortOp::Raise(window) => Some(window),
                _ => None,
            })
            .collect();
        assert_eq!(raises, vec![WindowId(1), WindowId(2), WindowId(3)]);
    }
}
