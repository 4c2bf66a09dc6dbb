//! Configuration: schema, loading, validation, and hot reload.

mod loader;
mod schema;
mod validator;
mod watcher;

pub use loader::ConfigLoader;
pub use schema::{Settings, WorkspaceSeed};
pub use validator::{ConfigError, ConfigValidator};
pub use watcher::ConfigWatcher;
