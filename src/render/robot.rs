//! Robot-mode output (JSON).
//!
//! Every command wraps its data in a [`RobotOutput`] envelope.

use serde::Serialize;

use crate::core::models::RobotOutput;
use crate::error::Result;

/// Serialize `data` inside the command envelope.
pub fn render_json<T: Serialize>(command: &str, data: &T, pretty: bool) -> Result<String> {
    let output = RobotOutput::new(command, data);
    let json = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    Ok(json)
}
