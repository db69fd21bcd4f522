//! Fixtures for integration tests.
#![allow(dead_code)]

use assert_cmd::Command;
use copilot_usage::test_utils::TestDir;

/// Environment variables the binary reads; cleared for isolation.
const APP_ENV: &[&str] = &[
    "COPILOT_USAGE_INTERVAL",
    "COPILOT_USAGE_TIMEOUT",
    "COPILOT_USAGE_FORMAT",
    "COPILOT_USAGE_LOG",
    "COPILOT_USAGE_LOG_FORMAT",
    "COPILOT_USAGE_LOG_FILE",
    "RUST_LOG",
];

/// Settings file name inside a [`TestDir`].
pub const SETTINGS_FILE: &str = "settings.json";

/// Config file name inside a [`TestDir`].
pub const CONFIG_FILE: &str = "config.toml";

/// The binary, pointed at config and settings files inside `dir`.
///
/// # Panics
///
/// Panics if the binary has not been built.
#[allow(deprecated)]
pub fn app(dir: &TestDir) -> Command {
    let mut cmd = Command::cargo_bin("copilot-usage").expect("binary built");
    for var in APP_ENV {
        cmd.env_remove(var);
    }
    cmd.env("COPILOT_USAGE_SETTINGS", dir.file_path(SETTINGS_FILE))
        .env("COPILOT_USAGE_CONFIG", dir.file_path(CONFIG_FILE));
    cmd
}

/// Settings file content with a stored endpoint.
pub fn settings_json(endpoint: &str) -> String {
    serde_json::json!({ "endpoint_url": endpoint }).to_string()
}
