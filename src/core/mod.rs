//! Usage model, fetching, polling and endpoint management.

pub mod backend;
pub mod endpoint;
pub mod fetcher;
pub mod http;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod poller;
pub mod quota;
pub mod settings;

pub use backend::{BackendService, ServiceState};
pub use endpoint::{DEFAULT_ENDPOINT, EndpointConfig, normalize};
pub use fetcher::{ProviderFactory, SharedProvider, UsageFetcher, UsageProvider};
pub use models::{EndpointReport, RobotOutput, UsageReport};
pub use monitor::{MonitorView, UsageMonitor};
pub use poller::{GaugeLevel, PollSnapshot, PollState, Poller, PollerHandle};
pub use quota::{QuotaSnapshot, decode_response};
pub use settings::EndpointSettings;
