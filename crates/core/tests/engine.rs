//! End-to-end engine scenarios against the in-memory port.
//!
//! One 1000x1000 monitor throughout, matching the literal scenarios from
//! the design discussions: stack arithmetic, BSP insert/remove, the
//! workspace switch protocol, reflow idempotence, and the failure policies.

use std::sync::Arc;

use uuid::Uuid;

use tatami_core::config::{Settings, WorkspaceSeed};
use tatami_core::events::{self, Event, EventReceiver};
use tatami_core::geometry::{is_sentinel, Point, Rect};
use tatami_core::ids::{MonitorId, Pid, WindowId};
use tatami_core::layout::LayoutKind;
use tatami_core::manager::Engine;
use tatami_core::port::fake::{FakePort, FakeWindow, PortOp};
use tatami_core::port::AccessibilityPort;

const MONITOR: Rect = Rect::new(0.0, 0.0, 1000.0, 1000.0);
const EPS: f64 = 0.01;

fn w(id: u32) -> WindowId {
    WindowId(id)
}

fn settings_with(layout: LayoutKind, inner_gap: u32, outer_gap: u32) -> Settings {
    let mut settings = Settings::default();
    settings.default_layout = layout;
    settings.inner_gap = inner_gap;
    settings.outer_gap = outer_gap;
    settings
}

fn two_workspace_settings(layout: LayoutKind) -> Settings {
    let mut settings = settings_with(layout, 10, 0);
    settings.workspaces = vec![
        WorkspaceSeed {
            id: Uuid::new_v4(),
            name: "one".to_string(),
            monitor_id: MonitorId(1),
            layout_kind: None,
        },
        WorkspaceSeed {
            id: Uuid::new_v4(),
            name: "two".to_string(),
            monitor_id: MonitorId(1),
            layout_kind: None,
        },
    ];
    settings
}

fn new_engine(port: &Arc<FakePort>, settings: Settings) -> (Engine, EventReceiver) {
    let (tx, rx) = events::channel();
    let dyn_port: Arc<dyn AccessibilityPort> = port.clone();
    let engine = Engine::new(dyn_port, settings, tx).expect("engine init");
    (engine, rx)
}

/// Create a standard window on the fake desktop and feed the creation event
/// through the engine.
async fn spawn_window(port: &FakePort, engine: &mut Engine, id: u32, pid: i32) {
    let frame = Rect::new(50.0, 50.0, 640.0, 480.0);
    port.add_window(w(id), FakeWindow::standard(Pid(pid), frame, &format!("window {id}")));
    engine
        .handle_event(Event::WindowCreated {
            window: w(id),
            pid: Pid(pid),
            bounds: frame,
        })
        .await;
}

/// Drain queued events (synthetic destroys, debounced reflows) into the
/// engine, like the model loop would.
async fn pump(engine: &mut Engine, rx: &mut EventReceiver) {
    engine.settle().await;
    while let Ok(event) = rx.try_recv() {
        engine.handle_event(event).await;
    }
    engine.settle().await;
}

fn assert_frame(port: &FakePort, id: u32, expected: Rect) {
    let actual = port.window_frame(w(id)).expect("window exists");
    assert!(
        actual.approx_eq(&expected, EPS),
        "window {id}: expected {expected:?}, got {actual:?}"
    );
}

#[tokio::test]
async fn s1_hstack_three_windows() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::HStack, 10, 0));

    for id in 1..=3 {
        spawn_window(&port, &mut engine, id, 100 + id as i32).await;
    }
    pump(&mut engine, &mut rx).await;

    let width = 980.0 / 3.0;
    assert_frame(&port, 1, Rect::new(0.0, 0.0, width, 1000.0));
    assert_frame(&port, 2, Rect::new(width + 10.0, 0.0, width, 1000.0));
    assert_frame(&port, 3, Rect::new(2.0 * (width + 10.0), 0.0, width, 1000.0));
    // The last column is pinned to the monitor's right edge.
    let last = port.window_frame(w(3)).unwrap();
    assert!((last.max_x() - 1000.0).abs() < 1e-9);
}

#[tokio::test]
async fn s2_bsp_insert_sequence() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::Bsp, 10, 0));

    spawn_window(&port, &mut engine, 1, 101).await;
    pump(&mut engine, &mut rx).await;
    assert_frame(&port, 1, MONITOR);

    spawn_window(&port, &mut engine, 2, 102).await;
    pump(&mut engine, &mut rx).await;
    assert_frame(&port, 1, Rect::new(0.0, 0.0, 495.0, 1000.0));
    assert_frame(&port, 2, Rect::new(505.0, 0.0, 495.0, 1000.0));

    spawn_window(&port, &mut engine, 3, 103).await;
    pump(&mut engine, &mut rx).await;
    assert_frame(&port, 1, Rect::new(0.0, 0.0, 495.0, 1000.0));
    assert_frame(&port, 2, Rect::new(505.0, 0.0, 495.0, 495.0));
    assert_frame(&port, 3, Rect::new(505.0, 505.0, 495.0, 495.0));
}

#[tokio::test]
async fn s3_bsp_remove_collapses() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::Bsp, 10, 0));

    for id in 1..=3 {
        spawn_window(&port, &mut engine, id, 100 + id as i32).await;
    }
    pump(&mut engine, &mut rx).await;

    port.close_window(w(2));
    engine.handle_event(Event::WindowDestroyed { window: w(2) }).await;
    pump(&mut engine, &mut rx).await;

    assert_frame(&port, 1, Rect::new(0.0, 0.0, 495.0, 1000.0));
    assert_frame(&port, 3, Rect::new(505.0, 0.0, 495.0, 1000.0));
}

#[tokio::test]
async fn s4_workspace_switch_hides_and_restores() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, two_workspace_settings(LayoutKind::Bsp));

    spawn_window(&port, &mut engine, 1, 101).await;
    spawn_window(&port, &mut engine, 2, 102).await;
    pump(&mut engine, &mut rx).await;

    engine.execute_action("activate_workspace_1").await;
    pump(&mut engine, &mut rx).await;

    assert!(is_sentinel(port.window_frame(w(1)).unwrap().origin()));
    assert!(is_sentinel(port.window_frame(w(2)).unwrap().origin()));

    spawn_window(&port, &mut engine, 3, 103).await;
    pump(&mut engine, &mut rx).await;
    assert_frame(&port, 3, MONITOR);

    engine.execute_action("activate_workspace_0").await;
    pump(&mut engine, &mut rx).await;

    // The first workspace's tiles are back, the other workspace is parked.
    assert_frame(&port, 1, Rect::new(0.0, 0.0, 495.0, 1000.0));
    assert_frame(&port, 2, Rect::new(505.0, 0.0, 495.0, 1000.0));
    assert!(is_sentinel(port.window_frame(w(3)).unwrap().origin()));

    // Switch safety: nothing owned by the revealed workspace is parked.
    let monitors = engine.monitors();
    let active = monitors[0].active_workspace().unwrap();
    for window in active.window_ids() {
        assert!(!is_sentinel(port.window_frame(*window).unwrap().origin()));
    }
}

#[tokio::test]
async fn reflow_is_idempotent() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::Bsp, 10, 0));

    for id in 1..=3 {
        spawn_window(&port, &mut engine, id, 100 + id as i32).await;
    }
    pump(&mut engine, &mut rx).await;
    port.take_ops();

    let workspace = engine.monitors()[0].active().unwrap();
    engine.apply_tiling(workspace).await;
    pump(&mut engine, &mut rx).await;

    assert_eq!(
        port.geometry_op_count(),
        0,
        "a reflow with no intervening events must dispatch nothing"
    );
}

#[tokio::test]
async fn registry_and_workspaces_agree() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, two_workspace_settings(LayoutKind::Bsp));

    for id in 1..=4 {
        spawn_window(&port, &mut engine, id, 200 + id as i32).await;
    }
    pump(&mut engine, &mut rx).await;

    // Move the focused window to the second workspace.
    engine.handle_event(Event::FocusChanged { window: w(4) }).await;
    engine.execute_action("move_to_workspace_1").await;
    pump(&mut engine, &mut rx).await;

    let mut seen = std::collections::HashSet::new();
    for monitor in engine.monitors() {
        for workspace in monitor.workspaces() {
            let owned: std::collections::BTreeSet<WindowId> = engine
                .registry()
                .windows_in(workspace.id())
                .into_iter()
                .collect();
            let members: std::collections::BTreeSet<WindowId> =
                workspace.window_ids().iter().copied().collect();
            assert_eq!(owned, members, "workspace {}", workspace.title());
            for window in members {
                assert!(seen.insert(window), "{window} owned twice");
            }
        }
    }
    assert_eq!(seen.len(), 4);

    let second = engine.monitors()[0].workspaces()[1].id();
    assert_eq!(engine.registry().lookup(w(4)), Some(second));
}

#[tokio::test]
async fn user_move_snaps_back_after_debounce() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::HStack, 0, 0));

    spawn_window(&port, &mut engine, 1, 101).await;
    spawn_window(&port, &mut engine, 2, 102).await;
    pump(&mut engine, &mut rx).await;
    let tiled = port.window_frame(w(1)).unwrap();

    // The user drags window 1 somewhere else.
    let dragged = Rect::new(300.0, 300.0, 400.0, 400.0);
    port.add_window(w(1), FakeWindow::standard(Pid(101), dragged, "window 1"));
    engine
        .handle_event(Event::WindowMoved {
            window: w(1),
            bounds: dragged,
        })
        .await;

    // Wait out the debounce, then deliver the due reflow.
    tokio::time::sleep(tatami_core::manager::REFLOW_DEBOUNCE + std::time::Duration::from_millis(50))
        .await;
    while let Ok(event) = rx.try_recv() {
        engine.handle_event(event).await;
    }
    engine.settle().await;

    assert_frame(&port, 1, tiled);
}

#[tokio::test]
async fn floating_window_keeps_its_frame() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::Bsp, 10, 0));

    spawn_window(&port, &mut engine, 1, 101).await;

    // A small dialog (scenario S6's float half).
    let dialog_frame = Rect::new(400.0, 400.0, 200.0, 150.0);
    let mut dialog = FakeWindow::standard(Pid(102), dialog_frame, "Untitled");
    dialog.subrole = "AXDialog".to_string();
    port.add_window(w(2), dialog);
    engine
        .handle_event(Event::WindowCreated {
            window: w(2),
            pid: Pid(102),
            bounds: dialog_frame,
        })
        .await;
    pump(&mut engine, &mut rx).await;

    // The standard window tiles the full frame; the dialog floats untouched.
    assert_frame(&port, 1, MONITOR);
    assert_frame(&port, 2, dialog_frame);

    let workspace = engine.monitors()[0].active_workspace().unwrap();
    assert!(workspace.tiled().contains(&w(1)));
    assert!(workspace.floating().contains(&w(2)));
}

#[tokio::test]
async fn toggle_float_reflows_the_remainder() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::Bsp, 0, 0));

    spawn_window(&port, &mut engine, 1, 101).await;
    spawn_window(&port, &mut engine, 2, 102).await;
    pump(&mut engine, &mut rx).await;

    engine.handle_event(Event::FocusChanged { window: w(2) }).await;
    engine.execute_action("toggle_float").await;
    pump(&mut engine, &mut rx).await;

    // Window 1 reclaims the whole frame; window 2 floats where it was.
    assert_frame(&port, 1, MONITOR);
    let workspace = engine.monitors()[0].active_workspace().unwrap();
    assert!(workspace.floating().contains(&w(2)));

    engine.execute_action("toggle_float").await;
    pump(&mut engine, &mut rx).await;
    assert_frame(&port, 1, Rect::new(0.0, 0.0, 500.0, 1000.0));
    assert_frame(&port, 2, Rect::new(500.0, 0.0, 500.0, 1000.0));
}

#[tokio::test]
async fn focus_right_picks_aligned_candidate() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::HStack, 0, 0));

    spawn_window(&port, &mut engine, 1, 101).await;
    spawn_window(&port, &mut engine, 2, 102).await;
    pump(&mut engine, &mut rx).await;

    engine.handle_event(Event::FocusChanged { window: w(1) }).await;
    port.take_ops();

    engine.execute_action("focus_right").await;
    engine.settle().await;

    let ops = port.take_ops();
    assert!(
        ops.contains(&PortOp::Focus(w(2))),
        "expected a focus op for window 2, got {ops:?}"
    );
    assert_eq!(engine.focused(), Some(w(2)));
}

#[tokio::test]
async fn focus_wraps_to_the_opposite_edge() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::HStack, 0, 0));

    for id in 1..=3 {
        spawn_window(&port, &mut engine, id, 100 + id as i32).await;
    }
    pump(&mut engine, &mut rx).await;

    // Focused on the rightmost column; focusing right wraps to the leftmost.
    engine.handle_event(Event::FocusChanged { window: w(3) }).await;
    port.take_ops();
    engine.execute_action("focus_right").await;
    engine.settle().await;

    assert_eq!(engine.focused(), Some(w(1)));
}

#[tokio::test]
async fn swap_exchanges_tiles_and_keeps_focus() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::Bsp, 0, 0));

    spawn_window(&port, &mut engine, 1, 101).await;
    spawn_window(&port, &mut engine, 2, 102).await;
    pump(&mut engine, &mut rx).await;

    let left = port.window_frame(w(1)).unwrap();
    let right = port.window_frame(w(2)).unwrap();

    engine.handle_event(Event::FocusChanged { window: w(1) }).await;
    engine.execute_action("swap_right").await;
    pump(&mut engine, &mut rx).await;

    assert_frame(&port, 1, right);
    assert_frame(&port, 2, left);
    assert_eq!(engine.focused(), Some(w(1)));
}

#[tokio::test]
async fn cycle_layout_follows_the_fixed_order() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::Float, 0, 0));

    spawn_window(&port, &mut engine, 1, 101).await;
    pump(&mut engine, &mut rx).await;

    let expected = ["hstack", "vstack", "zstack", "bsp", "float"];
    for name in expected {
        let hud = engine.execute_action("cycle_layout").await;
        assert_eq!(hud, Some(format!("layout changed to {name}")));
        pump(&mut engine, &mut rx).await;
    }
}

#[tokio::test]
async fn equalize_resets_bsp_ratios() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::Bsp, 0, 0));

    for id in 1..=4 {
        spawn_window(&port, &mut engine, id, 100 + id as i32).await;
    }
    pump(&mut engine, &mut rx).await;

    engine.execute_action("equalize").await;
    pump(&mut engine, &mut rx).await;

    let workspace = engine.monitors()[0].active_workspace().unwrap();
    let ratios = workspace.tree().ratios();
    assert!(!ratios.is_empty());
    assert!(ratios.iter().all(|r| *r == 0.5));
}

#[tokio::test]
async fn two_scan_absence_confirms_destruction() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::Bsp, 0, 0));

    spawn_window(&port, &mut engine, 1, 101).await;
    pump(&mut engine, &mut rx).await;
    assert_eq!(engine.registry().len(), 1);

    // The process died without a destruction notification.
    port.close_window(w(1));

    engine.full_scan().await;
    pump(&mut engine, &mut rx).await;
    assert_eq!(engine.registry().len(), 1, "one absence is not proof");

    engine.full_scan().await;
    pump(&mut engine, &mut rx).await;
    assert_eq!(engine.registry().len(), 0, "two absences are");
}

#[tokio::test]
async fn full_scan_adopts_unannounced_windows() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::Bsp, 0, 0));

    port.add_window(
        w(7),
        FakeWindow::standard(Pid(70), Rect::new(10.0, 10.0, 600.0, 600.0), "quiet"),
    );
    engine.full_scan().await;
    pump(&mut engine, &mut rx).await;

    assert_eq!(engine.registry().len(), 1);
    assert_frame(&port, 7, MONITOR);
}

#[tokio::test]
async fn gone_during_reflow_synthesizes_destroy() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::HStack, 0, 0));

    spawn_window(&port, &mut engine, 1, 101).await;
    spawn_window(&port, &mut engine, 2, 102).await;
    pump(&mut engine, &mut rx).await;

    // Window 2 dies right before the reflow reads its attributes.
    port.close_window(w(2));
    let workspace = engine.monitors()[0].active().unwrap();
    engine.apply_tiling(workspace).await;
    pump(&mut engine, &mut rx).await;

    assert_eq!(engine.registry().lookup(w(2)), None);
    assert_frame(&port, 1, MONITOR);
}

#[tokio::test]
async fn permission_denial_disables_writes_once() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::Bsp, 0, 0));

    spawn_window(&port, &mut engine, 1, 101).await;
    pump(&mut engine, &mut rx).await;
    assert!(engine.writes_enabled());

    port.revoke_permission();
    engine.full_scan().await;
    pump(&mut engine, &mut rx).await;
    assert!(!engine.writes_enabled());

    // Commands are silent no-ops now.
    assert_eq!(engine.execute_action("cycle_layout").await, None);
    assert_eq!(engine.execute_action("focus_right").await, None);
}

#[tokio::test]
async fn zstack_raises_in_order_with_focused_on_top() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::ZStack, 0, 0));

    for id in 1..=3 {
        spawn_window(&port, &mut engine, id, 100 + id as i32).await;
    }
    pump(&mut engine, &mut rx).await;

    engine.handle_event(Event::FocusChanged { window: w(2) }).await;
    // Let the focus-triggered raise drain before observing the reflow.
    engine.settle().await;
    port.take_ops();

    let workspace = engine.monitors()[0].active().unwrap();
    engine.apply_tiling(workspace).await;
    engine.settle().await;

    let raises: Vec<WindowId> = port
        .take_ops()
        .into_iter()
        .filter_map(|op| match op {
            PortOp::Raise(window) => Some(window),
            _ => None,
        })
        .collect();
    assert_eq!(raises.last(), Some(&w(2)), "focused window raised last");
    assert_eq!(raises.len(), 3);

    // Every window occupies the full frame.
    for id in 1..=3 {
        assert_frame(&port, id, MONITOR);
    }
}

#[tokio::test]
async fn screen_reconfiguration_rehomes_workspaces() {
    let port = Arc::new(FakePort::new());
    port.add_monitor(MonitorId(1), "primary", MONITOR, MONITOR);
    let second = Rect::new(1000.0, 0.0, 800.0, 600.0);
    port.add_monitor(MonitorId(2), "secondary", second, second);

    let mut settings = settings_with(LayoutKind::Bsp, 0, 0);
    settings.workspaces = vec![
        WorkspaceSeed {
            id: Uuid::new_v4(),
            name: "first".to_string(),
            monitor_id: MonitorId(1),
            layout_kind: None,
        },
        WorkspaceSeed {
            id: Uuid::new_v4(),
            name: "second".to_string(),
            monitor_id: MonitorId(2),
            layout_kind: None,
        },
    ];
    let (mut engine, mut rx) = new_engine(&port, settings);
    assert_eq!(engine.monitors().len(), 2);

    // The second monitor goes away.
    port.set_monitors(vec![tatami_core::port::MonitorDescriptor {
        id: MonitorId(1),
        name: "primary".to_string(),
        full_frame: MONITOR,
        visible_frame: MONITOR,
    }]);
    engine.handle_event(Event::ScreenReconfigured).await;
    pump(&mut engine, &mut rx).await;

    assert_eq!(engine.monitors().len(), 1);
    let titles: Vec<&str> = engine.monitors()[0]
        .workspaces()
        .iter()
        .map(|ws| ws.title())
        .collect();
    assert!(titles.contains(&"first"));
    assert!(titles.contains(&"second"), "orphaned workspace re-homed");
}

#[tokio::test]
async fn cursor_position_picks_the_target_monitor() {
    let port = Arc::new(FakePort::new());
    port.add_monitor(MonitorId(1), "primary", MONITOR, MONITOR);
    let second = Rect::new(1000.0, 0.0, 1000.0, 1000.0);
    port.add_monitor(MonitorId(2), "secondary", second, second);
    port.set_cursor(Point::new(1500.0, 500.0));

    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::Bsp, 0, 0));

    spawn_window(&port, &mut engine, 1, 101).await;
    pump(&mut engine, &mut rx).await;

    let second_ws = engine.monitors()[1].active().unwrap();
    assert_eq!(engine.registry().lookup(w(1)), Some(second_ws));
    assert_frame(&port, 1, second);
}

#[tokio::test]
async fn removing_a_workspace_migrates_its_windows() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, mut rx) = new_engine(&port, settings_with(LayoutKind::Bsp, 0, 0));

    spawn_window(&port, &mut engine, 1, 101).await;
    spawn_window(&port, &mut engine, 2, 102).await;
    pump(&mut engine, &mut rx).await;

    let original = engine.monitors()[0].active().unwrap();

    // The only workspace on the monitor cannot be removed.
    engine.remove_workspace(original).await;
    assert_eq!(engine.monitors()[0].workspace_count(), 1);

    let extra = engine.create_workspace(0, "scratch").unwrap();
    engine.remove_workspace(original).await;
    pump(&mut engine, &mut rx).await;

    assert_eq!(engine.monitors()[0].workspace_count(), 1);
    assert_eq!(engine.monitors()[0].active(), Some(extra));
    assert_eq!(engine.registry().lookup(w(1)), Some(extra));
    assert_eq!(engine.registry().lookup(w(2)), Some(extra));
    // The migrated windows are tiled on the surviving workspace.
    assert_frame(&port, 1, Rect::new(0.0, 0.0, 500.0, 1000.0));
    assert_frame(&port, 2, Rect::new(500.0, 0.0, 500.0, 1000.0));
}

#[tokio::test]
async fn unknown_actions_are_ignored() {
    let port = Arc::new(FakePort::with_monitor(MONITOR));
    let (mut engine, _rx) = new_engine(&port, Settings::default());
    assert_eq!(engine.execute_action("do_a_barrel_roll").await, None);
}
