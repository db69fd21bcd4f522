//! Error types for copilot-usage.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into six main categories:
//! - **Network**: the usage service could not be reached at all
//! - **Response**: the service answered, but not with usable quota data
//! - **Endpoint**: user-supplied endpoint text failed normalization
//! - **Configuration**: config file or settings store problems
//! - **Environment**: missing helper tools, process failures
//! - **Internal**: I/O, serialization, or unclassified errors
//!
//! Each error has a stable error code (e.g., `CUS-N001`) for programmatic handling.
//! Only [`UsageError::is_connectivity`] errors are eligible for the
//! localhost/loopback fallback retry.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Host unreachable, timeout, DNS, connection lost.
    Network,
    /// Non-2xx status, malformed body, missing quota data.
    Response,
    /// Endpoint input rejected by the normalizer.
    Endpoint,
    /// Config file or settings store issues.
    Configuration,
    /// Missing tools, helper process failures.
    Environment,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network error",
            Self::Response => "Response error",
            Self::Endpoint => "Endpoint error",
            Self::Configuration => "Configuration error",
            Self::Environment => "Environment error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Network => "N",
            Self::Response => "R",
            Self::Endpoint => "U",
            Self::Configuration => "C",
            Self::Environment => "E",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Helper binary not found
    BinaryNotFound = 2,
    /// Parse/format errors, invalid endpoint, bad config
    ParseError = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

// =============================================================================
// Connectivity & Endpoint Kinds
// =============================================================================

/// Transport failures where the host could not be reached at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityKind {
    /// The request exceeded its timeout.
    Timeout,
    /// Connection refused or otherwise not established.
    CannotConnect,
    /// DNS resolution failed.
    HostNotFound,
    /// The connection dropped mid-exchange.
    ConnectionLost,
    /// No route to the network.
    NotConnected,
}

impl std::fmt::Display for ConnectivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Timeout => "timed out",
            Self::CannotConnect => "cannot connect",
            Self::HostNotFound => "host not found",
            Self::ConnectionLost => "connection lost",
            Self::NotConnected => "not connected",
        };
        f.write_str(s)
    }
}

/// Reasons endpoint input fails normalization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("endpoint cannot be empty")]
    EmptyInput,

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("endpoint URL is missing a host")]
    MissingHost,
}

// =============================================================================
// Main Error
// =============================================================================

/// Main error type for copilot-usage operations.
#[derive(Error, Debug)]
pub enum UsageError {
    // ==========================================================================
    // Fetch errors (Category: Network / Response)
    // ==========================================================================
    /// The host could not be reached. Eligible for fallback.
    #[error("{kind} while requesting {url}: {message}")]
    Connectivity {
        url: String,
        kind: ConnectivityKind,
        message: String,
    },

    /// Transport failure from a reachable host (TLS, redirect loops, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a status outside 200..300.
    #[error("request failed with HTTP status {status}")]
    Http { status: u16 },

    /// The body could not be decoded as a usage payload.
    #[error("invalid response from usage service: {0}")]
    InvalidResponse(String),

    /// Valid JSON, but neither `premium_interactions` path is present.
    #[error("response is missing premium_interactions data")]
    MissingPremiumInteractions,

    // ==========================================================================
    // Endpoint errors (Category: Endpoint)
    // ==========================================================================
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    #[error("configuration error: {0}")]
    Config(String),

    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    #[error("settings store error: {0}")]
    SettingsStore(String),

    // ==========================================================================
    // Backend helper errors (Category: Environment)
    // ==========================================================================
    #[error("backend command not found: {program}")]
    BackendNotFound { program: String },

    #[error("backend error: {0}")]
    Backend(String),

    // ==========================================================================
    // Internal errors
    // ==========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UsageError {
    /// Map error to process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::BackendNotFound { .. } => ExitCode::BinaryNotFound,

            Self::Endpoint(_)
            | Self::Config(_)
            | Self::ConfigParse { .. }
            | Self::InvalidResponse(_)
            | Self::MissingPremiumInteractions => ExitCode::ParseError,

            Self::Connectivity {
                kind: ConnectivityKind::Timeout,
                ..
            } => ExitCode::Timeout,

            Self::Connectivity { .. }
            | Self::Transport(_)
            | Self::Http { .. }
            | Self::SettingsStore(_)
            | Self::Backend(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Connectivity { .. } | Self::Transport(_) => ErrorCategory::Network,

            Self::Http { .. } | Self::InvalidResponse(_) | Self::MissingPremiumInteractions => {
                ErrorCategory::Response
            }

            Self::Endpoint(_) => ErrorCategory::Endpoint,

            Self::Config(_) | Self::ConfigParse { .. } | Self::SettingsStore(_) => {
                ErrorCategory::Configuration
            }

            Self::BackendNotFound { .. } | Self::Backend(_) => ErrorCategory::Environment,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            // Network errors (N001-N099)
            Self::Connectivity { kind, .. } => match kind {
                ConnectivityKind::Timeout => "CUS-N001",
                ConnectivityKind::CannotConnect => "CUS-N002",
                ConnectivityKind::HostNotFound => "CUS-N003",
                ConnectivityKind::ConnectionLost => "CUS-N004",
                ConnectivityKind::NotConnected => "CUS-N005",
            },
            Self::Transport(_) => "CUS-N099",

            // Response errors (R001-R099)
            Self::Http { .. } => "CUS-R001",
            Self::InvalidResponse(_) => "CUS-R002",
            Self::MissingPremiumInteractions => "CUS-R003",

            // Endpoint errors (U001-U099)
            Self::Endpoint(EndpointError::EmptyInput) => "CUS-U001",
            Self::Endpoint(EndpointError::InvalidUrl(_)) => "CUS-U002",
            Self::Endpoint(EndpointError::MissingHost) => "CUS-U003",

            // Configuration errors (C001-C099)
            Self::Config(_) => "CUS-C001",
            Self::ConfigParse { .. } => "CUS-C002",
            Self::SettingsStore(_) => "CUS-C003",

            // Environment errors (E001-E099)
            Self::BackendNotFound { .. } => "CUS-E001",
            Self::Backend(_) => "CUS-E002",

            // Internal errors (X001-X099)
            Self::Io(_) => "CUS-X001",
            Self::Json(_) => "CUS-X002",
            Self::Other(_) => "CUS-X099",
        }
    }

    /// Whether this failure means the host was never reached.
    ///
    /// The usage fetcher retries against the fallback endpoint only for
    /// these errors; everything else is surfaced immediately.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    /// Short message for the `Failed` poll state.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Connectivity { kind, .. } => match kind {
                ConnectivityKind::ConnectionLost | ConnectivityKind::NotConnected => {
                    "Network connection unavailable".to_string()
                }
                ConnectivityKind::CannotConnect
                | ConnectivityKind::Timeout
                | ConnectivityKind::HostNotFound => "Cannot reach the usage service".to_string(),
            },
            Self::InvalidResponse(_) => "Invalid response from the usage service".to_string(),
            Self::Http { status } => format!("Request failed with status {status}"),
            Self::MissingPremiumInteractions => "Missing premium_interactions data".to_string(),
            other => other.to_string(),
        }
    }

    /// A copy-paste command or next step for the user, when one is known.
    #[must_use]
    pub const fn fix_hint(&self) -> Option<&'static str> {
        match self {
            Self::Connectivity { .. } => Some("copilot-usage backend"),
            Self::Http { status: 404 } | Self::MissingPremiumInteractions => {
                Some("copilot-usage endpoint show")
            }
            Self::Endpoint(_) => Some("copilot-usage endpoint set localhost:4141"),
            Self::BackendNotFound { .. } => Some("Install Node.js and npm, then retry"),
            Self::ConfigParse { .. } => Some("Check the TOML syntax of your config file"),
            _ => None,
        }
    }
}

/// Result type alias for copilot-usage operations.
pub type Result<T> = std::result::Result<T, UsageError>;
