//! Common test utilities and fixtures for integration tests.
//!
//! # Modules
//!
//! - `fixtures`: isolated binary invocations and response bodies
//! - `logger`: Structured test logging infrastructure

pub mod fixtures;
pub mod logger;
