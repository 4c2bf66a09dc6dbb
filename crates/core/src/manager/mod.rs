//! The tiling engine: model ownership and per-event reconciliation.
//!
//! [`Engine`] owns monitors, workspaces, the ownership registry, and the
//! classifier. The implementation is split by concern the way the data
//! flows: window lifecycle (`window_ops`), the tiling pipeline
//! (`layout_ops`), workspace switching and migration (`workspace_ops`),
//! screen reconfiguration (`monitor_ops`), and the polling safety nets
//! (`discovery`).

pub mod monitor;
pub mod window;
pub mod workspace;

mod core;
mod discovery;
mod layout_ops;
mod monitor_ops;
mod window_ops;
mod workspace_ops;

pub use self::core::Engine;
pub use discovery::{FULL_SCAN_INTERVAL, GEOMETRY_POLL_INTERVAL};
pub use monitor::Monitor;
pub use window::WindowNode;
pub use window_ops::REFLOW_DEBOUNCE;
pub use workspace::Workspace;
