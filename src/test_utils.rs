//! Test utilities for copilot-usage.
//!
//! Provides usage providers with controllable results, data factories and a
//! temporary directory helper for use across all test modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use copilot_usage::test_utils::*;
//!
//! let provider = StaticProvider::ok(make_test_snapshot(10, 50));
//! let dir = TestDir::new();
//! dir.create_file("config.toml", "[general]\ntimeout_seconds = 5");
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use tokio::sync::{Notify, mpsc};

use crate::core::endpoint::EndpointConfig;
use crate::core::fetcher::{ProviderFactory, SharedProvider, UsageProvider};
use crate::core::quota::QuotaSnapshot;
use crate::error::{Result, UsageError};

// =============================================================================
// Test Data Factories
// =============================================================================

/// Snapshot with `used` and `total`.
#[must_use]
pub const fn make_test_snapshot(used: u64, total: u64) -> QuotaSnapshot {
    QuotaSnapshot::with_total(used, total)
}

/// Response body in the direct `premium_interactions` object form.
#[must_use]
pub fn make_test_usage_body(used: u64, total: u64) -> serde_json::Value {
    serde_json::json!({
        "premium_interactions": { "used": used, "total": total }
    })
}

/// Response body in the nested `quota_snapshots` form with string numbers.
#[must_use]
pub fn make_test_nested_body(used: u64, entitlement: u64) -> serde_json::Value {
    serde_json::json!({
        "quota_snapshots": {
            "premium_interactions": {
                "used": used.to_string(),
                "entitlement": entitlement.to_string()
            }
        }
    })
}

// =============================================================================
// Static Provider
// =============================================================================

#[derive(Debug, Clone)]
enum Outcome {
    Snapshot(QuotaSnapshot),
    HttpStatus(u16),
}

/// Provider that returns the same result on every call and counts calls.
#[derive(Debug)]
pub struct StaticProvider {
    outcome: Mutex<Outcome>,
    calls: AtomicUsize,
    label: String,
}

impl StaticProvider {
    /// Always succeeds with `snapshot`.
    #[must_use]
    pub fn ok(snapshot: QuotaSnapshot) -> Arc<Self> {
        Arc::new(Self::new(Outcome::Snapshot(snapshot), "static"))
    }

    /// Always fails with an HTTP status error.
    #[must_use]
    pub fn http_error(status: u16) -> Arc<Self> {
        Arc::new(Self::new(Outcome::HttpStatus(status), "static"))
    }

    /// Succeeds with `snapshot` and describes itself as `label`.
    #[must_use]
    pub fn labeled(label: &str, snapshot: QuotaSnapshot) -> Arc<Self> {
        Arc::new(Self::new(Outcome::Snapshot(snapshot), label))
    }

    fn new(outcome: Outcome, label: &str) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            calls: AtomicUsize::new(0),
            label: label.to_string(),
        }
    }

    /// Change the snapshot returned by later calls.
    pub fn set_snapshot(&self, snapshot: QuotaSnapshot) {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) =
            Outcome::Snapshot(snapshot);
    }

    /// Number of fetches so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl UsageProvider for StaticProvider {
    fn fetch(&self) -> BoxFuture<'_, Result<QuotaSnapshot>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Box::pin(async move {
            match outcome {
                Outcome::Snapshot(snapshot) => Ok(snapshot),
                Outcome::HttpStatus(status) => Err(UsageError::Http { status }),
            }
        })
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

// =============================================================================
// Scripted Provider
// =============================================================================

/// Provider whose fetches block until the test sends a result.
///
/// Results are handed out in order, one per fetch. A fetch with no result
/// queued stays pending, which lets tests hold a request in flight.
pub struct ScriptedProvider {
    results: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<QuotaSnapshot>>>,
    calls: AtomicUsize,
    called: Notify,
}

/// Sending side of a [`ScriptedProvider`].
#[derive(Clone)]
pub struct Script {
    results: mpsc::UnboundedSender<Result<QuotaSnapshot>>,
}

impl Script {
    /// Queue a successful result.
    pub fn succeed(&self, snapshot: QuotaSnapshot) {
        let _ = self.results.send(Ok(snapshot));
    }

    /// Queue a failure.
    pub fn fail(&self, error: UsageError) {
        let _ = self.results.send(Err(error));
    }
}

impl ScriptedProvider {
    #[must_use]
    pub fn channel() -> (Arc<Self>, Script) {
        let (tx, rx) = mpsc::unbounded_channel();
        let provider = Arc::new(Self {
            results: tokio::sync::Mutex::new(rx),
            calls: AtomicUsize::new(0),
            called: Notify::new(),
        });
        (provider, Script { results: tx })
    }

    /// Number of fetches started so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` fetches have started.
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let notified = self.called.notified();
            if self.calls() >= count {
                return;
            }
            notified.await;
        }
    }
}

impl UsageProvider for ScriptedProvider {
    fn fetch(&self) -> BoxFuture<'_, Result<QuotaSnapshot>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.called.notify_waiters();
            let mut results = self.results.lock().await;
            match results.recv().await {
                Some(result) => result,
                None => Err(UsageError::Other(anyhow::anyhow!("script closed"))),
            }
        })
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

// =============================================================================
// Recording Factory
// =============================================================================

/// Provider factory that records every endpoint it builds a provider for.
///
/// Each built provider is a [`StaticProvider`] labeled with the endpoint's
/// canonical string and returning the factory's current snapshot.
#[derive(Clone)]
pub struct RecordingFactory {
    built: Arc<Mutex<Vec<(String, Arc<StaticProvider>)>>>,
    snapshot: QuotaSnapshot,
}

impl RecordingFactory {
    #[must_use]
    pub fn new(snapshot: QuotaSnapshot) -> Self {
        Self {
            built: Arc::new(Mutex::new(Vec::new())),
            snapshot,
        }
    }

    /// The factory closure to hand to the monitor or settings.
    #[must_use]
    pub fn factory(&self) -> ProviderFactory {
        let built = Arc::clone(&self.built);
        let snapshot = self.snapshot.clone();
        Arc::new(move |endpoint: &EndpointConfig| {
            let provider = StaticProvider::labeled(&endpoint.canonical, snapshot.clone());
            built
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((endpoint.canonical.clone(), Arc::clone(&provider)));
            let shared: SharedProvider = provider;
            Ok(shared)
        })
    }

    /// Canonical endpoints built so far, in order.
    #[must_use]
    pub fn endpoints(&self) -> Vec<String> {
        self.lock().iter().map(|(url, _)| url.clone()).collect()
    }

    /// The most recently built provider.
    #[must_use]
    pub fn last(&self) -> Option<Arc<StaticProvider>> {
        self.lock().last().map(|(_, provider)| Arc::clone(provider))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Arc<StaticProvider>)>> {
        self.built.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Temporary Directory
// =============================================================================

/// An isolated temporary directory, removed on drop.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file with the given content, including parent directories.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.file_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&path, content).expect("Failed to write test file");
    }

    /// Read a file, or `None` if it does not exist.
    #[must_use]
    pub fn read_file(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.file_path(name)).ok()
    }

    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
