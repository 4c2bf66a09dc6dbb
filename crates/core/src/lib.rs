//! tatami: a tiling window manager core.
//!
//! The layout and lifecycle engine behind a keyboard-driven tiling window
//! manager: a model of monitors, workspaces, and windows; pure layout
//! strategies (BSP, stacks, float); a classifier deciding what tiles; an
//! event-driven reconciler keeping the model in sync with the OS; and a
//! command layer for the hotkey dispatcher. All OS access goes through the
//! [`port::AccessibilityPort`] contract.

pub mod classify;
pub mod commands;
pub mod config;
pub mod events;
pub mod executor;
pub mod geometry;
pub mod ids;
pub mod layout;
pub mod manager;
pub mod observer;
pub mod port;
pub mod registry;

pub use manager::Engine;
