//! Poller plus endpoint settings, wired together.

use std::time::Duration;

use serde::Serialize;

use super::fetcher::ProviderFactory;
use super::poller::{PollSnapshot, Poller, PollerHandle};
use super::settings::EndpointSettings;
use crate::error::Result;
use crate::storage::SettingsStore;

/// Everything a front end renders, captured at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorView {
    #[serde(flatten)]
    pub poll: PollSnapshot,
    pub endpoint: String,
    pub draft: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
    pub can_apply: bool,
    pub can_reset_endpoint: bool,
    pub menu_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_value: Option<f64>,
}

/// Usage monitor: one poller and the endpoint settings that feed it.
pub struct UsageMonitor {
    poller: Poller,
    settings: EndpointSettings,
}

impl UsageMonitor {
    /// Load the stored endpoint, build its provider and spawn an idle poller.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the provider for the stored endpoint cannot be built.
    pub fn open(
        mut store: Box<dyn SettingsStore>,
        factory: ProviderFactory,
        interval: Duration,
    ) -> Result<Self> {
        let active = EndpointSettings::load_active(store.as_mut());
        let provider = factory(&active)?;
        let poller = Poller::spawn(provider, interval);
        let settings = EndpointSettings::new(store, active, factory, poller.handle());
        tracing::debug!(endpoint = %settings.active(), "usage monitor ready");
        Ok(Self { poller, settings })
    }

    #[must_use]
    pub fn poller(&self) -> PollerHandle {
        self.poller.handle()
    }

    #[must_use]
    pub const fn settings(&self) -> &EndpointSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut EndpointSettings {
        &mut self.settings
    }

    pub fn start(&self) {
        self.poller.handle().start();
    }

    pub fn stop(&self) {
        self.poller.handle().stop();
    }

    pub fn refresh_now(&self) {
        self.poller.handle().refresh_now();
    }

    /// Current observable state.
    #[must_use]
    pub fn view(&self) -> MonitorView {
        let poll = self.poller.handle().snapshot();
        MonitorView {
            menu_title: poll.menu_title(),
            progress_value: poll.progress_value(),
            poll,
            endpoint: self.settings.active().canonical.clone(),
            draft: self.settings.draft().to_string(),
            validation_error: self.settings.validation_error().map(str::to_string),
            can_apply: self.settings.can_apply(),
            can_reset_endpoint: self.settings.can_reset(),
        }
    }

    /// Stop polling and wait for the poller task to exit.
    pub async fn shutdown(self) {
        self.poller.shutdown().await;
    }
}
