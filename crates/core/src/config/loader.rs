//! Settings document loading.
//!
//! The document lives at `<user config dir>/tatami/settings.json`. A missing
//! file is not an error — defaults apply — but a file that exists and fails
//! to parse is, so a typo never silently resets the configuration.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::Settings;

/// Loads the settings document from the user's config directory.
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Loader for the default path.
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir().context("could not determine user config directory")?;
        Ok(ConfigLoader {
            config_path: config_dir.join("tatami").join("settings.json"),
        })
    }

    /// Loader for an explicit path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        ConfigLoader {
            config_path: path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Read and parse the document. Missing file yields defaults.
    pub fn load(&self) -> Result<Settings> {
        if !self.config_path.exists() {
            tracing::info!(path = %self.config_path.display(), "no settings document, using defaults");
            return Ok(Settings::default());
        }

        let raw = std::fs::read_to_string(&self.config_path)
            .with_context(|| format!("failed to read {}", self.config_path.display()))?;
        let settings: Settings = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", self.config_path.display()))?;
        Ok(settings)
    }
}
