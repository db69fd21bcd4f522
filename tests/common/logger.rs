//! Test logging for structured test output and debugging.
//!
//! `TestLogger` prints phase-tagged lines to stderr so a failing test shows
//! how far it got. Output is captured by the test harness unless
//! `--nocapture` is passed.
//!
//! # Environment Variables
//!
//! - `TEST_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! - `TEST_LOG_JSON` - Set to "1" or "true" for JSON lines

#![allow(dead_code)]

use std::cell::RefCell;
use std::fmt::Display;
use std::sync::OnceLock;
use std::time::Instant;

use serde::Serialize;

/// Log severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        f.pad(s)
    }
}

#[derive(Serialize)]
struct LogEntry<'a> {
    level: LogLevel,
    test: &'a str,
    phase: &'a str,
    elapsed_ms: u64,
    message: &'a str,
}

struct Settings {
    level: LogLevel,
    json: bool,
}

fn settings() -> &'static Settings {
    static SETTINGS: OnceLock<Settings> = OnceLock::new();
    SETTINGS.get_or_init(|| Settings {
        level: std::env::var("TEST_LOG_LEVEL")
            .ok()
            .and_then(|v| LogLevel::parse(&v))
            .unwrap_or(LogLevel::Info),
        json: std::env::var("TEST_LOG_JSON")
            .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
    })
}

/// Per-test logger with phase and duration tracking.
pub struct TestLogger {
    name: String,
    phase: RefCell<String>,
    started: Instant,
}

impl TestLogger {
    pub fn new(test_name: &str) -> Self {
        let logger = Self {
            name: test_name.to_string(),
            phase: RefCell::new("init".to_string()),
            started: Instant::now(),
        };
        logger.log(LogLevel::Debug, "test started");
        logger
    }

    /// Mark the start of a phase (setup, execute, verify, ...).
    pub fn phase(&self, phase: &str) {
        *self.phase.borrow_mut() = phase.to_string();
        self.log(LogLevel::Debug, &format!("phase: {phase}"));
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn http_request(&self, method: &str, url: &str) {
        self.log(LogLevel::Debug, &format!("HTTP {method} {url}"));
    }

    pub fn finish_ok(&self) {
        self.log(LogLevel::Info, &format!("PASSED in {}ms", self.elapsed_ms()));
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn log(&self, level: LogLevel, message: &str) {
        let settings = settings();
        if level < settings.level {
            return;
        }

        let phase = self.phase.borrow();
        if settings.json {
            let entry = LogEntry {
                level,
                test: &self.name,
                phase: &phase,
                elapsed_ms: self.elapsed_ms(),
                message,
            };
            if let Ok(line) = serde_json::to_string(&entry) {
                eprintln!("{line}");
            }
        } else {
            eprintln!("[{level:5}] {}::{} {message}", self.name, phase);
        }
    }
}
