//! Human-readable output.

use crate::core::models::{EndpointReport, UsageReport};
use crate::util::format::usage_bar;

const BAR_WIDTH: usize = 24;

/// Multi-line usage summary for `status`.
#[must_use]
pub fn render_usage(report: &UsageReport) -> String {
    let mut lines = vec![
        "Copilot premium interactions".to_string(),
        format!("  {}", report.summary),
    ];

    if let Some(progress) = report.progress {
        lines.push(format!("  [{}]", usage_bar(progress, BAR_WIDTH)));
    }

    lines.push(format!(
        "  Endpoint: {}",
        endpoint_line(&report.endpoint, report.fallback.as_deref())
    ));
    lines.join("\n")
}

/// Timestamped single line for `watch`.
#[must_use]
pub fn render_update_line(report: &UsageReport) -> String {
    let now = chrono::Local::now().format("%H:%M:%S");
    match report.progress {
        Some(progress) => format!(
            "[{now}] {} {} {}",
            report.menu_title,
            usage_bar(progress, BAR_WIDTH / 2),
            report.summary
        ),
        None => format!("[{now}] {}", report.summary),
    }
}

/// Endpoint settings, with the test result after a change.
#[must_use]
pub fn render_endpoint(report: &EndpointReport) -> String {
    let mut lines = Vec::new();
    match report.changed {
        Some(true) => lines.push("Endpoint updated.".to_string()),
        Some(false) => lines.push("Endpoint unchanged.".to_string()),
        None => {}
    }

    lines.push(format!(
        "Endpoint: {}{}",
        endpoint_line(&report.endpoint, report.fallback.as_deref()),
        if report.is_default { " [default]" } else { "" }
    ));
    lines.push(format!("Settings: {}", report.settings_path));

    if let Some(test) = &report.test {
        lines.push(format!("Test: {}", test.summary));
    }

    lines.join("\n")
}

fn endpoint_line(endpoint: &str, fallback: Option<&str>) -> String {
    match fallback {
        Some(fallback) => format!("{endpoint} (fallback {fallback})"),
        None => endpoint.to_string(),
    }
}
