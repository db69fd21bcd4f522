//! Endpoint settings: draft editing, validation, persistence and apply.
//!
//! [`EndpointSettings`] owns the user's draft endpoint text and the endpoint
//! currently in use. Every draft edit is re-validated; `apply` persists the
//! accepted value, swaps the poller's provider and forces one refresh.

use super::endpoint::{DEFAULT_ENDPOINT, EndpointConfig, normalize};
use super::fetcher::ProviderFactory;
use super::poller::PollerHandle;
use crate::error::Result;
use crate::storage::{ENDPOINT_KEY, SettingsStore};

/// Editable endpoint settings bound to a running poller.
pub struct EndpointSettings {
    store: Box<dyn SettingsStore>,
    factory: ProviderFactory,
    poller: PollerHandle,
    draft: String,
    validation_error: Option<String>,
    pending: Option<EndpointConfig>,
    active: EndpointConfig,
}

impl std::fmt::Debug for EndpointSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointSettings")
            .field("draft", &self.draft)
            .field("validation_error", &self.validation_error)
            .field("pending", &self.pending)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl EndpointSettings {
    /// Read the persisted endpoint, repairing the stored value if needed.
    ///
    /// An unset value yields the default without writing. A stored value
    /// that fails to normalize is replaced by the default; one that
    /// normalizes to a different string is rewritten in canonical form.
    /// Write failures are logged and otherwise ignored.
    pub fn load_active(store: &mut dyn SettingsStore) -> EndpointConfig {
        let persisted = store.get(ENDPOINT_KEY);

        let active = match persisted.as_deref().map(normalize) {
            Some(Ok(config)) => config,
            Some(Err(err)) => {
                tracing::warn!(
                    stored = persisted.as_deref().unwrap_or_default(),
                    "stored endpoint is invalid ({err}), using default"
                );
                EndpointConfig::default_endpoint()
            }
            None => EndpointConfig::default_endpoint(),
        };

        if let Some(stored) = persisted.filter(|stored| *stored != active.canonical) {
            tracing::info!(%stored, canonical = %active, "rewriting stored endpoint");
            if let Err(err) = store.set(ENDPOINT_KEY, &active.canonical) {
                tracing::warn!("could not rewrite stored endpoint: {err}");
            }
        }

        active
    }

    /// Bind settings to a poller already using `active`.
    #[must_use]
    pub fn new(
        store: Box<dyn SettingsStore>,
        active: EndpointConfig,
        factory: ProviderFactory,
        poller: PollerHandle,
    ) -> Self {
        Self {
            store,
            factory,
            poller,
            draft: active.canonical.clone(),
            validation_error: None,
            pending: Some(active.clone()),
            active,
        }
    }

    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    #[must_use]
    pub fn validation_error(&self) -> Option<&str> {
        self.validation_error.as_deref()
    }

    /// Config the current draft normalizes to, if it is valid.
    #[must_use]
    pub const fn pending(&self) -> Option<&EndpointConfig> {
        self.pending.as_ref()
    }

    /// Endpoint in use by the poller.
    #[must_use]
    pub const fn active(&self) -> &EndpointConfig {
        &self.active
    }

    /// Replace the draft text and re-validate it.
    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
        match normalize(&self.draft) {
            Ok(config) => {
                self.validation_error = None;
                self.pending = Some(config);
            }
            Err(err) => {
                self.validation_error = Some(err.to_string());
                self.pending = None;
            }
        }
    }

    /// Whether the draft is valid and names a different endpoint.
    #[must_use]
    pub fn can_apply(&self) -> bool {
        self.validation_error.is_none()
            && self
                .pending
                .as_ref()
                .is_some_and(|pending| pending.canonical != self.active.canonical)
    }

    /// Switch to the pending endpoint.
    ///
    /// Returns `Ok(false)` without side effects when [`can_apply`] is false.
    /// Otherwise the provider is built, the canonical string persisted, the
    /// poller switched over and one forced refresh requested.
    ///
    /// [`can_apply`]: Self::can_apply
    ///
    /// # Errors
    ///
    /// Returns error if the provider cannot be built or the value cannot be
    /// persisted. Nothing changes in either case.
    pub fn apply(&mut self) -> Result<bool> {
        if !self.can_apply() {
            return Ok(false);
        }
        let Some(pending) = self.pending.clone() else {
            return Ok(false);
        };

        let provider = (self.factory)(&pending)?;
        self.store.set(ENDPOINT_KEY, &pending.canonical)?;
        self.poller.set_provider(provider);

        tracing::info!(from = %self.active, to = %pending, "endpoint applied");
        self.draft.clone_from(&pending.canonical);
        self.active = pending;
        self.poller.refresh_now();
        Ok(true)
    }

    /// Whether the active endpoint differs from the built-in default.
    #[must_use]
    pub fn can_reset(&self) -> bool {
        self.active.canonical != DEFAULT_ENDPOINT
    }

    /// Put the default endpoint in the draft and apply it.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub fn reset(&mut self) -> Result<bool> {
        self.set_draft(DEFAULT_ENDPOINT);
        self.apply()
    }
}
