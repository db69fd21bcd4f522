//! Utility functions.

pub mod format;
pub mod time;

pub use format::{format_percent, usage_bar};
pub use time::{format_interval, format_relative_time};
