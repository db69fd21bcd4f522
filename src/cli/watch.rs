//! `watch`: poll on an interval and print every update until Ctrl+C.

use crate::cli::args::OutputFormat;
use crate::core::backend::BackendService;
use crate::core::models::UsageReport;
use crate::core::poller::PollState;
use crate::error::Result;
use crate::render;
use crate::storage::ResolvedConfig;
use crate::util::format_interval;

/// Run watch mode.
///
/// Fetch failures are printed and polling continues; only output and
/// startup errors end the loop early.
///
/// # Errors
///
/// Returns an error if the backend helper cannot be started, settings
/// cannot be read, or output cannot be rendered.
pub async fn run_watch(config: &ResolvedConfig) -> Result<()> {
    let mut backend = if config.auto_start_backend {
        let mut service = BackendService::new(&config.backend);
        service.start().await?;
        Some(service)
    } else {
        None
    };

    let monitor = super::open_monitor(config)?;
    let endpoint = monitor.settings().active().clone();
    let mut updates = monitor.poller().subscribe();

    if config.format == OutputFormat::Human {
        println!(
            "Watching {endpoint} every {}. Press Ctrl+C to stop.",
            format_interval(config.refresh_interval)
        );
    }
    monitor.start();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let poll = updates.borrow_and_update().clone();
                if !matches!(poll.state, PollState::Loaded(_) | PollState::Failed(_)) {
                    continue;
                }
                match render::render_update(&UsageReport::new(&endpoint, &poll), config.format) {
                    Ok(line) => println!("{line}"),
                    Err(e) => break Err(e),
                }
            }
            _ = &mut shutdown => {
                tracing::debug!("interrupted, shutting down");
                break Ok(());
            }
        }
    };

    monitor.stop();
    monitor.shutdown().await;
    if let Some(service) = backend.as_mut() {
        service.stop().await;
    }
    result
}
