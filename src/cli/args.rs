//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};

/// Copilot premium interaction usage monitor.
#[derive(Parser, Debug)]
#[command(name = "copilot-usage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch usage once and print it (default command)
    Status,

    /// Poll usage on an interval and print every update
    Watch(WatchArgs),

    /// Show or change the usage service endpoint
    #[command(subcommand)]
    Endpoint(EndpointCommand),

    /// Run the local usage service helper in the foreground
    Backend,
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug, Default)]
pub struct WatchArgs {
    /// Seconds between refreshes (default: 60)
    #[arg(long, short = 'i', value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Start the local usage service helper first
    #[arg(long)]
    pub backend: bool,
}

/// Endpoint subcommands.
#[derive(Subcommand, Debug)]
pub enum EndpointCommand {
    /// Print the active endpoint and its fallback
    Show,

    /// Validate, save and test a new endpoint
    Set {
        /// Endpoint URL, e.g. `localhost:4141` or `http://host:8080/usage`
        url: String,
    },

    /// Restore the default endpoint
    Reset,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
}
