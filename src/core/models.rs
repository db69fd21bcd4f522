//! Report types shared by the renderers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::endpoint::EndpointConfig;
use super::poller::{GaugeLevel, PollSnapshot, PollState};

/// Schema tag for JSON output.
pub const SCHEMA_VERSION: &str = "copilot-usage.v1";

/// Usage as seen at one instant, ready for output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    pub state: PollState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    pub level: GaugeLevel,
    pub menu_title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl UsageReport {
    #[must_use]
    pub fn new(endpoint: &EndpointConfig, poll: &PollSnapshot) -> Self {
        Self {
            endpoint: endpoint.canonical.clone(),
            fallback: endpoint.fallback.as_ref().map(ToString::to_string),
            remaining: poll.state.snapshot().and_then(|s| s.remaining()),
            progress: poll.progress_value(),
            level: poll.state.gauge_level(),
            menu_title: poll.menu_title(),
            summary: poll.status_line(),
            last_updated: poll.last_updated,
            state: poll.state.clone(),
        }
    }
}

/// Active endpoint, plus the outcome of testing it when it just changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointReport {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    pub is_default: bool,
    /// Whether `set`/`reset` changed the stored endpoint; absent for `show`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
    pub settings_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<UsageReport>,
}

impl EndpointReport {
    #[must_use]
    pub fn new(endpoint: &EndpointConfig, settings_path: &std::path::Path) -> Self {
        Self {
            endpoint: endpoint.canonical.clone(),
            fallback: endpoint.fallback.as_ref().map(ToString::to_string),
            is_default: endpoint.is_default(),
            changed: None,
            settings_path: settings_path.display().to_string(),
            test: None,
        }
    }
}

/// Top-level JSON envelope for command output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T> {
    pub schema_version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,
}

impl<T> RobotOutput<T> {
    pub fn new(command: impl Into<String>, data: T) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            command: command.into(),
            data,
        }
    }
}
