//! Application paths for config and settings.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Application paths.
pub struct AppPaths {
    /// Configuration directory, holding both the config and settings files.
    pub config: PathBuf,
}

impl AppPaths {
    /// Create paths for the copilot-usage application.
    #[must_use]
    pub fn new() -> Self {
        let config = ProjectDirs::from("com", "copilot-usage", "copilot-usage").map_or_else(
            || {
                // Fallback to home directory
                directories::BaseDirs::new()
                    .map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf())
                    .join(".config/copilot-usage")
            },
            |dirs| dirs.config_dir().to_path_buf(),
        );
        Self { config }
    }

    /// Path to the TOML config file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Path to the persisted settings (endpoint) file.
    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.config.join("settings.json")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
