//! Error rendering.
//!
//! Human mode prints the error code, message and a fix hint. JSON mode
//! prints a structured object for scripts.

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::UsageError;

/// JSON representation of an error.
#[derive(Serialize)]
struct ErrorJson {
    error_code: &'static str,
    category: String,
    message: String,
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fix: Option<&'static str>,
}

impl ErrorJson {
    fn from_error(error: &UsageError) -> Self {
        Self {
            error_code: error.error_code(),
            category: error.category().to_string(),
            message: error.to_string(),
            summary: error.user_message(),
            fix: error.fix_hint(),
        }
    }
}

/// Render an error for stderr in the requested format.
#[must_use]
pub fn render_error(error: &UsageError, format: OutputFormat, pretty: bool) -> String {
    match format {
        OutputFormat::Json => render_error_json(error, pretty),
        OutputFormat::Human => render_simple(error),
    }
}

fn render_error_json(error: &UsageError, pretty: bool) -> String {
    let json = ErrorJson::from_error(error);
    let rendered = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    };
    rendered.unwrap_or_else(|_| render_simple(error))
}

fn render_simple(error: &UsageError) -> String {
    let mut lines = vec![format!("Error [{}]: {error}", error.error_code())];
    if let Some(fix) = error.fix_hint() {
        lines.push(format!("Fix: {fix}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EndpointError;

    #[test]
    fn human_includes_code_and_fix() {
        let err = UsageError::Endpoint(EndpointError::EmptyInput);
        let text = render_error(&err, OutputFormat::Human, false);
        assert!(text.starts_with("Error [CUS-U001]"), "{text}");
        assert!(text.contains("Fix: copilot-usage endpoint set"));
    }

    #[test]
    fn json_is_structured() {
        let err = UsageError::Http { status: 502 };
        let text = render_error(&err, OutputFormat::Json, false);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["error_code"], "CUS-R001");
        assert_eq!(parsed["summary"], "Request failed with status 502");
        assert!(parsed.get("fix").is_none());
    }

    #[test]
    fn pretty_json_is_indented() {
        let err = UsageError::MissingPremiumInteractions;
        assert!(render_error(&err, OutputFormat::Json, true).contains("\n  "));
    }
}
