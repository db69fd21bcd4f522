//! Configuration file loading and management.
//!
//! Loads configuration from `config.toml` in the platform config directory
//! (e.g. `~/.config/copilot-usage/config.toml` on Linux).
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `COPILOT_USAGE_INTERVAL`: Refresh interval in seconds
//! - `COPILOT_USAGE_TIMEOUT`: Per-request timeout in seconds
//! - `COPILOT_USAGE_FORMAT`: Output format (human, json)
//! - `COPILOT_USAGE_CONFIG`: Override config file path
//! - `COPILOT_USAGE_SETTINGS`: Override persisted settings file path

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::cli::args::{Cli, OutputFormat, WatchArgs};
use crate::error::{Result, UsageError};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable for the refresh interval in seconds.
pub const ENV_INTERVAL: &str = "COPILOT_USAGE_INTERVAL";
/// Environment variable for the request timeout in seconds.
pub const ENV_TIMEOUT: &str = "COPILOT_USAGE_TIMEOUT";
/// Environment variable for output format.
pub const ENV_FORMAT: &str = "COPILOT_USAGE_FORMAT";
/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "COPILOT_USAGE_CONFIG";
/// Environment variable to override the settings file path.
pub const ENV_SETTINGS: &str = "COPILOT_USAGE_SETTINGS";

const MAX_INTERVAL_SECS: u64 = 86_400;
const MAX_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Time between background refreshes.
    pub refresh_interval: Duration,
    /// Per-attempt HTTP timeout.
    pub timeout: Duration,
    /// Output format.
    pub format: OutputFormat,
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
    /// Whether `watch` launches the backend helper.
    pub auto_start_backend: bool,
    /// Backend helper command line.
    pub backend: BackendConfig,
    /// Log level from the config file, if any.
    pub log_level: Option<String>,
    /// Persisted settings file.
    pub settings_path: PathBuf,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub refresh_interval: ConfigSource,
    pub timeout: ConfigSource,
    pub format: ConfigSource,
    pub pretty: ConfigSource,
    pub auto_start_backend: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve final configuration from CLI args, environment variables, and config file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file exists but is invalid
    /// - Any resolved value is out of range
    pub fn resolve(cli: &Cli, watch_args: Option<&WatchArgs>) -> Result<Self> {
        let config = Self::load_config()?;
        config.validate()?;
        Self::resolve_with(cli, watch_args, &config)
    }

    /// Resolve against an already-loaded config file.
    ///
    /// # Errors
    ///
    /// Returns an error if a CLI or environment value is out of range.
    pub fn resolve_with(
        cli: &Cli,
        watch_args: Option<&WatchArgs>,
        config: &Config,
    ) -> Result<Self> {
        let mut sources = ConfigSources::default();

        let refresh_interval =
            Self::resolve_interval(watch_args, config, &mut sources.refresh_interval)?;
        let timeout = Self::resolve_timeout(cli, config, &mut sources.timeout)?;
        let format = Self::resolve_format(cli, config, &mut sources.format)?;
        let pretty = Self::resolve_pretty(cli, config, &mut sources.pretty);
        let auto_start_backend =
            Self::resolve_auto_start(watch_args, config, &mut sources.auto_start_backend);

        let settings_path = std::env::var(ENV_SETTINGS)
            .map_or_else(|_| AppPaths::new().settings_file(), PathBuf::from);

        Ok(Self {
            refresh_interval,
            timeout,
            format,
            pretty,
            auto_start_backend,
            backend: config.backend.clone(),
            log_level: config.general.log_level.clone(),
            settings_path,
            sources,
        })
    }

    /// Load config file, respecting `COPILOT_USAGE_CONFIG` override.
    fn load_config() -> Result<Config> {
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            Config::load_from(Path::new(&path))
        } else {
            Config::load()
        }
    }

    /// Resolve refresh interval setting.
    fn resolve_interval(
        watch_args: Option<&WatchArgs>,
        config: &Config,
        source: &mut ConfigSource,
    ) -> Result<Duration> {
        // 1. CLI --interval flag
        if let Some(secs) = watch_args.and_then(|args| args.interval) {
            *source = ConfigSource::Cli;
            return seconds_in_range("interval", secs, MAX_INTERVAL_SECS);
        }

        // 2. Environment variable
        if let Some(secs) = env_seconds(ENV_INTERVAL)? {
            *source = ConfigSource::Env;
            return seconds_in_range(ENV_INTERVAL, secs, MAX_INTERVAL_SECS);
        }

        // 3. Config file (defaults already applied by serde)
        let default_secs = GeneralConfig::default().refresh_interval_seconds;
        *source = if config.general.refresh_interval_seconds == default_secs {
            ConfigSource::Default
        } else {
            ConfigSource::ConfigFile
        };
        Ok(Duration::from_secs(config.general.refresh_interval_seconds))
    }

    /// Resolve timeout setting.
    fn resolve_timeout(cli: &Cli, config: &Config, source: &mut ConfigSource) -> Result<Duration> {
        // 1. CLI --timeout flag
        if let Some(secs) = cli.timeout {
            *source = ConfigSource::Cli;
            return seconds_in_range("timeout", secs, MAX_TIMEOUT_SECS);
        }

        // 2. Environment variable
        if let Some(secs) = env_seconds(ENV_TIMEOUT)? {
            *source = ConfigSource::Env;
            return seconds_in_range(ENV_TIMEOUT, secs, MAX_TIMEOUT_SECS);
        }

        // 3. Config file
        *source = if config.general.timeout_seconds == GeneralConfig::default().timeout_seconds {
            ConfigSource::Default
        } else {
            ConfigSource::ConfigFile
        };
        Ok(Duration::from_secs(config.general.timeout_seconds))
    }

    /// Resolve output format setting.
    fn resolve_format(
        cli: &Cli,
        config: &Config,
        source: &mut ConfigSource,
    ) -> Result<OutputFormat> {
        // 1. CLI --json flag (shorthand)
        if cli.json {
            *source = ConfigSource::Cli;
            return Ok(OutputFormat::Json);
        }

        // 2. Environment variable
        if let Ok(format_env) = std::env::var(ENV_FORMAT) {
            *source = ConfigSource::Env;
            return parse_format(&format_env);
        }

        // clap supplies a default, so only a non-default value counts as explicit.
        if cli.format != OutputFormat::Human {
            *source = ConfigSource::Cli;
            return Ok(cli.format);
        }

        // 3. Config file
        if let Some(ref format_str) = config.output.format {
            *source = ConfigSource::ConfigFile;
            return parse_format(format_str);
        }

        // 4. Default
        *source = ConfigSource::Default;
        Ok(OutputFormat::Human)
    }

    /// Resolve pretty setting.
    fn resolve_pretty(cli: &Cli, config: &Config, source: &mut ConfigSource) -> bool {
        if cli.pretty {
            *source = ConfigSource::Cli;
            return true;
        }

        if config.output.pretty {
            *source = ConfigSource::ConfigFile;
            return true;
        }

        *source = ConfigSource::Default;
        false
    }

    /// Resolve backend auto-start setting.
    fn resolve_auto_start(
        watch_args: Option<&WatchArgs>,
        config: &Config,
        source: &mut ConfigSource,
    ) -> bool {
        if watch_args.is_some_and(|args| args.backend) {
            *source = ConfigSource::Cli;
            return true;
        }

        if config.backend.auto_start {
            *source = ConfigSource::ConfigFile;
            return true;
        }

        *source = ConfigSource::Default;
        false
    }
}

/// Parse a format string into `OutputFormat`.
fn parse_format(s: &str) -> Result<OutputFormat> {
    match s.trim().to_lowercase().as_str() {
        "human" => Ok(OutputFormat::Human),
        "json" => Ok(OutputFormat::Json),
        _ => Err(UsageError::Config(format!(
            "Invalid format '{s}'. Valid formats: human, json"
        ))),
    }
}

fn env_seconds(var: &str) -> Result<Option<u64>> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| {
                UsageError::Config(format!("{var} must be a number of seconds, got '{value}'"))
            }),
        _ => Ok(None),
    }
}

fn seconds_in_range(name: &str, secs: u64, max: u64) -> Result<Duration> {
    if secs == 0 || secs > max {
        return Err(UsageError::Config(format!(
            "{name} must be between 1 and {max} seconds"
        )));
    }
    Ok(Duration::from_secs(secs))
}

// =============================================================================
// Config File
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Backend helper settings.
    pub backend: BackendConfig,
    /// Output settings.
    pub output: OutputConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Seconds between background refreshes.
    pub refresh_interval_seconds: u64,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// Default log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
}

/// Backend helper process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Launch the helper when `watch` starts.
    pub auto_start: bool,
    /// Program to run.
    pub command: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (human, json).
    pub format: Option<String>,
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: 60,
            timeout_seconds: 15,
            log_level: None,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            auto_start: false,
            command: "npx".to_string(),
            args: vec!["copilot-api@latest".to_string(), "start".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error only if the file exists but is invalid.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().config_file())
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| UsageError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns error if the interval, timeout, format or backend command is invalid.
    pub fn validate(&self) -> Result<()> {
        seconds_in_range(
            "refresh_interval_seconds",
            self.general.refresh_interval_seconds,
            MAX_INTERVAL_SECS,
        )?;
        seconds_in_range("timeout_seconds", self.general.timeout_seconds, MAX_TIMEOUT_SECS)?;

        if let Some(format) = &self.output.format {
            parse_format(format)?;
        }

        if self.backend.command.trim().is_empty() {
            return Err(UsageError::Config(
                "backend.command must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.general.refresh_interval_seconds, 60);
        assert_eq!(config.general.timeout_seconds, 15);
        assert_eq!(config.backend.command, "npx");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_missing_file_returns_default() {
        let config = Config::load_from(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.general.refresh_interval_seconds, 60);
    }

    #[test]
    fn load_valid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[general]
refresh_interval_seconds = 120
timeout_seconds = 5

[backend]
auto_start = true
command = "/opt/homebrew/bin/npx"

[output]
format = "json"
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.general.refresh_interval_seconds, 120);
        assert_eq!(config.general.timeout_seconds, 5);
        assert!(config.backend.auto_start);
        assert_eq!(config.backend.command, "/opt/homebrew/bin/npx");
        assert_eq!(config.backend.args, BackendConfig::default().args);
        assert_eq!(config.output.format.as_deref(), Some("json"));
    }

    #[test]
    fn load_invalid_toml_returns_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, UsageError::ConfigParse { .. }));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[general]\nrefresh_interval_seconds = 300\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.general.refresh_interval_seconds, 300);
        assert_eq!(loaded.general.timeout_seconds, 15);
        assert_eq!(loaded.backend.command, "npx");
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = Config::default();
        config.general.timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.general.refresh_interval_seconds = MAX_INTERVAL_SECS + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.format = Some("yaml".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.backend.command = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn cli_flags_take_precedence_over_config_file() {
        let cli = Cli::parse_from([
            "copilot-usage",
            "--timeout",
            "7",
            "--json",
            "watch",
            "--interval",
            "30",
        ]);
        let Some(crate::cli::args::Commands::Watch(ref watch)) = cli.command else {
            panic!("expected watch command");
        };

        let mut config = Config::default();
        config.general.refresh_interval_seconds = 90;
        config.general.timeout_seconds = 20;

        let resolved = ResolvedConfig::resolve_with(&cli, Some(watch), &config).unwrap();
        assert_eq!(resolved.refresh_interval, Duration::from_secs(30));
        assert_eq!(resolved.sources.refresh_interval, ConfigSource::Cli);
        assert_eq!(resolved.timeout, Duration::from_secs(7));
        assert_eq!(resolved.format, OutputFormat::Json);
    }

    #[test]
    fn config_file_values_used_without_flags() {
        let cli = Cli::parse_from(["copilot-usage", "status"]);
        let mut config = Config::default();
        config.general.timeout_seconds = 20;
        config.backend.auto_start = true;

        let resolved = ResolvedConfig::resolve_with(&cli, None, &config).unwrap();
        assert_eq!(resolved.timeout, Duration::from_secs(20));
        assert_eq!(resolved.sources.timeout, ConfigSource::ConfigFile);
        assert!(resolved.auto_start_backend);
    }

    #[test]
    fn cli_interval_out_of_range_is_rejected() {
        let cli = Cli::parse_from(["copilot-usage", "watch", "--interval", "0"]);
        let Some(crate::cli::args::Commands::Watch(ref watch)) = cli.command else {
            panic!("expected watch command");
        };
        assert!(ResolvedConfig::resolve_with(&cli, Some(watch), &Config::default()).is_err());
    }
}
