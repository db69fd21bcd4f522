//! Output rendering for human and robot modes.

pub mod error;
pub mod human;
pub mod robot;

use crate::cli::args::OutputFormat;
use crate::core::models::{EndpointReport, UsageReport};
use crate::error::Result;

/// Render a one-shot usage report.
pub fn render_usage(report: &UsageReport, format: OutputFormat, pretty: bool) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_usage(report)),
        OutputFormat::Json => robot::render_json("status", report, pretty),
    }
}

/// Render one update in watch mode.
///
/// JSON updates are always compact so the stream stays one object per line.
pub fn render_update(report: &UsageReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_update_line(report)),
        OutputFormat::Json => robot::render_json("watch", report, false),
    }
}

/// Render endpoint settings.
pub fn render_endpoint(
    report: &EndpointReport,
    format: OutputFormat,
    pretty: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_endpoint(report)),
        OutputFormat::Json => robot::render_json("endpoint", report, pretty),
    }
}
