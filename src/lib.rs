//! copilot-usage - Copilot premium interaction usage monitor
//!
//! Polls a local usage service for premium interaction quota, tolerating
//! several response shapes and falling back between `localhost` and
//! `127.0.0.1` when the service cannot be reached. The endpoint is
//! user-editable and persisted; state is published on a `watch` channel for
//! whatever front end renders it.

// Note: deny (not forbid) to allow #[allow(unsafe_code)] in test helpers for env var manipulation
#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod core;
pub mod error;
pub mod render;
pub mod storage;
pub mod util;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{ExitCode, Result, UsageError};

// Re-export test utilities for external test crates
#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::*;
