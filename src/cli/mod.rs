//! CLI argument parsing and command dispatch.

pub mod args;
pub mod backend;
pub mod endpoint;
pub mod status;
pub mod watch;

pub use args::{Cli, Commands, EndpointCommand, OutputFormat, WatchArgs};

use crate::core::endpoint::EndpointConfig;
use crate::core::fetcher::UsageFetcher;
use crate::core::monitor::UsageMonitor;
use crate::core::settings::EndpointSettings;
use crate::error::Result;
use crate::storage::{FileSettingsStore, ResolvedConfig};

/// Open the usage monitor against the configured settings file.
pub(crate) fn open_monitor(config: &ResolvedConfig) -> Result<UsageMonitor> {
    let store = FileSettingsStore::open(&config.settings_path)?;
    UsageMonitor::open(
        Box::new(store),
        UsageFetcher::factory(config.timeout),
        config.refresh_interval,
    )
}

/// Active endpoint from the settings file, repairing it if needed.
pub(crate) fn load_endpoint(config: &ResolvedConfig) -> Result<EndpointConfig> {
    let mut store = FileSettingsStore::open(&config.settings_path)?;
    Ok(EndpointSettings::load_active(&mut store))
}
