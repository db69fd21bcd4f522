//! `backend`: run the usage service helper in the foreground.

use crate::cli::args::OutputFormat;
use crate::core::backend::{BackendService, ServiceState};
use crate::error::{Result, UsageError};
use crate::render::robot::render_json;
use crate::storage::ResolvedConfig;

/// Start the helper and report its state until it exits or Ctrl+C.
///
/// # Errors
///
/// Returns an error if the helper cannot be started or ends in `Failed`.
pub async fn run_backend(config: &ResolvedConfig) -> Result<()> {
    let mut service = BackendService::new(&config.backend);
    let mut states = service.subscribe();
    service.start().await?;
    let current = states.borrow_and_update().clone();
    print_state(&current, config)?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                print_state(&state, config)?;
                if matches!(state, ServiceState::Stopped(_) | ServiceState::Failed(_)) {
                    break;
                }
            }
            _ = &mut shutdown => {
                service.stop().await;
                print_state(&service.state(), config)?;
                break;
            }
        }
    }

    match service.state() {
        ServiceState::Failed(message) => Err(UsageError::Backend(message)),
        _ => Ok(()),
    }
}

fn print_state(state: &ServiceState, config: &ResolvedConfig) -> Result<()> {
    match config.format {
        OutputFormat::Human => println!("Backend {state}"),
        OutputFormat::Json => println!("{}", render_json("backend", state, false)?),
    }
    Ok(())
}
