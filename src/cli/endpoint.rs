//! `endpoint show|set|reset`.

use std::time::Duration;

use tokio::sync::watch;

use crate::cli::args::EndpointCommand;
use crate::core::endpoint::normalize;
use crate::core::models::{EndpointReport, UsageReport};
use crate::core::poller::{PollSnapshot, PollState};
use crate::core::settings::EndpointSettings;
use crate::error::Result;
use crate::render;
use crate::storage::ResolvedConfig;

/// Run an endpoint subcommand.
///
/// `set` and `reset` test a changed endpoint with one fetch and include the
/// outcome in the output. A failed test does not undo the change.
///
/// # Errors
///
/// Returns an error if the new endpoint is invalid or cannot be saved.
pub async fn run_endpoint(command: &EndpointCommand, config: &ResolvedConfig) -> Result<()> {
    match command {
        EndpointCommand::Show => {
            let endpoint = super::load_endpoint(config)?;
            let report = EndpointReport::new(&endpoint, &config.settings_path);
            println!(
                "{}",
                render::render_endpoint(&report, config.format, config.pretty)?
            );
            Ok(())
        }
        EndpointCommand::Set { url } => {
            normalize(url)?;
            change_endpoint(config, |settings| {
                settings.set_draft(url.as_str());
                settings.apply()
            })
            .await
        }
        EndpointCommand::Reset => change_endpoint(config, EndpointSettings::reset).await,
    }
}

async fn change_endpoint(
    config: &ResolvedConfig,
    change: impl FnOnce(&mut EndpointSettings) -> Result<bool>,
) -> Result<()> {
    let mut monitor = super::open_monitor(config)?;
    let mut updates = monitor.poller().subscribe();

    let outcome = match change(monitor.settings_mut()) {
        Ok(changed) => {
            let active = monitor.settings().active().clone();
            let mut report = EndpointReport::new(&active, &config.settings_path);
            report.changed = Some(changed);
            if changed {
                // One fetch per URL at most, plus slack.
                let limit = config.timeout * 2 + Duration::from_secs(1);
                report.test = wait_for_result(&mut updates, limit)
                    .await
                    .map(|poll| UsageReport::new(&active, &poll));
            }
            render::render_endpoint(&report, config.format, config.pretty)
                .map(|text| println!("{text}"))
        }
        Err(e) => Err(e),
    };

    monitor.shutdown().await;
    outcome
}

async fn wait_for_result(
    updates: &mut watch::Receiver<PollSnapshot>,
    limit: Duration,
) -> Option<PollSnapshot> {
    let finished = updates.wait_for(|poll| {
        matches!(poll.state, PollState::Loaded(_) | PollState::Failed(_))
    });
    match tokio::time::timeout(limit, finished).await {
        Ok(Ok(poll)) => Some(poll.clone()),
        Ok(Err(_)) => None,
        Err(_) => {
            tracing::warn!(?limit, "endpoint test did not finish in time");
            None
        }
    }
}
