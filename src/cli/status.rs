//! `status`: fetch usage once and print it.

use chrono::Utc;

use crate::core::fetcher::UsageFetcher;
use crate::core::models::UsageReport;
use crate::core::poller::{PollSnapshot, PollState};
use crate::error::Result;
use crate::render;
use crate::storage::ResolvedConfig;

/// Fetch the active endpoint once.
///
/// Unlike `watch`, a failed fetch is returned as an error so the exit code
/// reflects it.
///
/// # Errors
///
/// Returns the fetch error, or an error if settings cannot be read.
pub async fn run_status(config: &ResolvedConfig) -> Result<()> {
    let endpoint = super::load_endpoint(config)?;
    let fetcher = UsageFetcher::with_timeout(&endpoint, config.timeout)?;
    tracing::debug!(%endpoint, "fetching usage once");

    let snapshot = fetcher.fetch_usage().await?;
    let poll = PollSnapshot {
        state: PollState::Loaded(snapshot),
        last_updated: Some(Utc::now()),
        running: false,
    };

    let report = UsageReport::new(&endpoint, &poll);
    println!("{}", render::render_usage(&report, config.format, config.pretty)?);
    Ok(())
}
