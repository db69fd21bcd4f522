//! Usage fetching with loopback fallback.
//!
//! A [`UsageFetcher`] GETs the primary endpoint and, only when the host could
//! not be reached at all, retries once against the fallback endpoint. HTTP
//! status errors and decode failures are surfaced immediately.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use url::Url;

use super::endpoint::EndpointConfig;
use super::http::{self, DEFAULT_TIMEOUT};
use super::quota::{QuotaSnapshot, decode_response};
use crate::error::Result;

/// Source of quota snapshots for the poller.
///
/// Implemented by [`UsageFetcher`] for the HTTP service; tests and embedders
/// can supply their own.
pub trait UsageProvider: Send + Sync {
    /// Fetch the current premium interaction usage.
    fn fetch(&self) -> BoxFuture<'_, Result<QuotaSnapshot>>;

    /// Short description for logs.
    fn describe(&self) -> String {
        "custom provider".to_string()
    }
}

/// Shared handle to a provider.
pub type SharedProvider = Arc<dyn UsageProvider>;

/// Builds a provider for an endpoint. Used when the endpoint changes.
pub type ProviderFactory = Arc<dyn Fn(&EndpointConfig) -> Result<SharedProvider> + Send + Sync>;

/// HTTP fetcher for the usage service.
#[derive(Debug, Clone)]
pub struct UsageFetcher {
    client: Client,
    primary: Url,
    fallback: Option<Url>,
}

impl UsageFetcher {
    /// Create a fetcher for `endpoint` with the default 15 s timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Create a fetcher with an explicit per-attempt timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn with_timeout(endpoint: &EndpointConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            primary: endpoint.primary.clone(),
            fallback: endpoint.fallback.clone(),
        })
    }

    /// Factory producing HTTP fetchers with the given timeout.
    #[must_use]
    pub fn factory(timeout: Duration) -> ProviderFactory {
        Arc::new(move |endpoint: &EndpointConfig| {
            let fetcher: SharedProvider = Arc::new(Self::with_timeout(endpoint, timeout)?);
            Ok(fetcher)
        })
    }

    #[must_use]
    pub const fn primary(&self) -> &Url {
        &self.primary
    }

    #[must_use]
    pub const fn fallback(&self) -> Option<&Url> {
        self.fallback.as_ref()
    }

    /// Fetch usage, falling back on connectivity failures.
    ///
    /// # Errors
    ///
    /// Returns the primary error unless it is connectivity-class and a
    /// fallback exists, in which case the fallback attempt's result is
    /// returned as-is.
    pub async fn fetch_usage(&self) -> Result<QuotaSnapshot> {
        match self.fetch_from(&self.primary).await {
            Err(err) if err.is_connectivity() => {
                let Some(fallback) = &self.fallback else {
                    return Err(err);
                };
                tracing::warn!(
                    primary = %self.primary,
                    %fallback,
                    error = %err,
                    "primary endpoint unreachable, trying fallback"
                );
                self.fetch_from(fallback).await
            }
            result => result,
        }
    }

    async fn fetch_from(&self, url: &Url) -> Result<QuotaSnapshot> {
        let body = http::get_body(&self.client, url).await?;
        decode_response(&body)
    }
}

impl UsageProvider for UsageFetcher {
    fn fetch(&self) -> BoxFuture<'_, Result<QuotaSnapshot>> {
        Box::pin(self.fetch_usage())
    }

    fn describe(&self) -> String {
        match &self.fallback {
            Some(fallback) => format!("{} (fallback {fallback})", self.primary),
            None => self.primary.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::endpoint::normalize;

    #[test]
    fn fetcher_keeps_both_urls() {
        let fetcher = UsageFetcher::new(&normalize("localhost:4141").unwrap()).unwrap();
        assert_eq!(fetcher.primary().as_str(), "http://localhost:4141/usage");
        assert_eq!(
            fetcher.fallback().map(Url::as_str),
            Some("http://127.0.0.1:4141/usage")
        );
    }

    #[test]
    fn custom_host_has_no_fallback() {
        let fetcher = UsageFetcher::new(&normalize("http://custom-server:9999").unwrap()).unwrap();
        assert_eq!(fetcher.primary().as_str(), "http://custom-server:9999/usage");
        assert!(fetcher.fallback().is_none());
        assert_eq!(fetcher.describe(), "http://custom-server:9999/usage");
    }

    #[test]
    fn factory_builds_providers() {
        let factory = UsageFetcher::factory(Duration::from_secs(3));
        let provider = factory(&normalize("127.0.0.1:4141").unwrap()).unwrap();
        assert!(provider.describe().contains("fallback http://localhost:4141/usage"));
    }
}
