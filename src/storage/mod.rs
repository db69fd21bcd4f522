//! Storage for configuration and persisted settings.

pub mod config;
pub mod paths;
pub mod store;

pub use config::{
    BackendConfig, Config, ConfigSource, ConfigSources, ENV_CONFIG, ENV_FORMAT, ENV_INTERVAL,
    ENV_SETTINGS, ENV_TIMEOUT, ResolvedConfig,
};
pub use paths::AppPaths;
pub use store::{ENDPOINT_KEY, FileSettingsStore, MemorySettingsStore, SettingsStore};
