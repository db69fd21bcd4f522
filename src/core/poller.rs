//! Periodic usage polling.
//!
//! The poller is a single actor task that owns [`PollState`] and the
//! last-updated timestamp. Callers talk to it through [`PollerHandle`]
//! (start/stop/refresh/swap provider) and observe it through a `watch`
//! channel of [`PollSnapshot`]s.
//!
//! State rules:
//! - `Loading` is published only for forced refreshes or when the state is
//!   still `Idle`; background ticks go straight from `Loaded`/`Failed` to the
//!   next result.
//! - A failed cycle keeps `last_updated` from the last success.
//! - Fetches run as spawned tasks tagged with a generation number. `start`,
//!   `stop` and provider swaps bump the generation, so late results from an
//!   abandoned cycle are dropped instead of overwriting newer state.
//! - At most one background cycle runs at a time. The timer is paused while
//!   it is in flight and restarts from its completion, so a slow endpoint
//!   stretches the schedule instead of stacking requests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::fetcher::SharedProvider;
use super::quota::QuotaSnapshot;
use crate::error::Result;
use crate::util::format::format_percent;
use crate::util::time::format_relative_time;

/// Default time between background refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest accepted refresh interval.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

const MENU_TITLE: &str = "Copilot";

// =============================================================================
// Poll State
// =============================================================================

/// Observable state of the usage poller.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum PollState {
    #[default]
    Idle,
    Loading,
    Loaded(QuotaSnapshot),
    Failed(String),
}

impl PollState {
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The loaded snapshot, if any.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&QuotaSnapshot> {
        match self {
            Self::Loaded(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// Coarse fill level for a gauge or icon.
    #[must_use]
    pub fn gauge_level(&self) -> GaugeLevel {
        match self {
            Self::Idle | Self::Loading => GaugeLevel::Pending,
            Self::Failed(_) => GaugeLevel::Error,
            Self::Loaded(snapshot) => match snapshot.progress() {
                None => GaugeLevel::Unknown,
                Some(p) if p < 0.5 => GaugeLevel::Low,
                Some(p) if p < 0.8 => GaugeLevel::Medium,
                Some(_) => GaugeLevel::High,
            },
        }
    }
}

/// Bucketed usage level for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeLevel {
    /// Nothing loaded yet.
    Pending,
    /// Loaded, but no total to compare against.
    Unknown,
    Low,
    Medium,
    High,
    Error,
}

// =============================================================================
// Poll Snapshot
// =============================================================================

/// Everything the presentation layer observes after each transition.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSnapshot {
    pub state: PollState,
    /// Time of the last successful fetch.
    pub last_updated: Option<DateTime<Utc>>,
    /// Whether the periodic refresh is active.
    pub running: bool,
}

impl PollSnapshot {
    /// Compact label for a menu bar or prompt.
    #[must_use]
    pub fn menu_title(&self) -> String {
        match &self.state {
            PollState::Idle | PollState::Loading => MENU_TITLE.to_string(),
            PollState::Loaded(snapshot) => match snapshot.total {
                Some(total) => format!("{}/{total}", snapshot.used),
                None => format!("{} used", snapshot.used),
            },
            PollState::Failed(_) => format!("{MENU_TITLE} ⚠️"),
        }
    }

    /// Fraction used, only while loaded with a positive total.
    #[must_use]
    pub fn progress_value(&self) -> Option<f64> {
        self.state.snapshot().and_then(QuotaSnapshot::progress)
    }

    /// One-line human description of the current state.
    #[must_use]
    pub fn status_line(&self) -> String {
        let body = match &self.state {
            PollState::Idle => "Waiting for first update".to_string(),
            PollState::Loading => "Loading premium interaction usage…".to_string(),
            PollState::Loaded(snapshot) => describe_snapshot(snapshot),
            PollState::Failed(message) => format!("Failed: {message}"),
        };

        match self.last_updated {
            Some(at) => format!("{body} (updated {})", format_relative_time(at)),
            None => body,
        }
    }
}

fn describe_snapshot(snapshot: &QuotaSnapshot) -> String {
    if snapshot.is_unlimited() {
        return format!("{} used (unlimited)", snapshot.used);
    }

    let mut line = match snapshot.total {
        Some(total) => format!("{}/{total} used", snapshot.used),
        None => format!("{} used", snapshot.used),
    };
    if let Some(remaining) = snapshot.remaining() {
        line.push_str(&format!(", {remaining} remaining"));
    }
    if let Some(progress) = snapshot.progress() {
        line.push_str(&format!(" ({})", format_percent(progress * 100.0)));
    }
    line
}

// =============================================================================
// Handle
// =============================================================================

enum PollCommand {
    Start,
    Stop,
    RefreshNow,
    SetProvider(SharedProvider),
    Shutdown,
}

struct Completion {
    generation: u64,
    background: bool,
    result: Result<QuotaSnapshot>,
}

/// Cloneable control surface for a running poller.
#[derive(Clone)]
pub struct PollerHandle {
    commands: mpsc::UnboundedSender<PollCommand>,
    snapshots: watch::Receiver<PollSnapshot>,
}

impl PollerHandle {
    /// Restart periodic polling: one cycle now, then one per interval.
    ///
    /// Calling this while already running replaces the timer.
    pub fn start(&self) {
        self.send(PollCommand::Start);
    }

    /// Cancel periodic polling. Idempotent.
    pub fn stop(&self) {
        self.send(PollCommand::Stop);
    }

    /// One forced cycle outside the schedule; always publishes `Loading`.
    pub fn refresh_now(&self) {
        self.send(PollCommand::RefreshNow);
    }

    /// Replace the provider used by subsequent cycles.
    pub fn set_provider(&self, provider: SharedProvider) {
        self.send(PollCommand::SetProvider(provider));
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> PollSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified after every published transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot> {
        self.snapshots.clone()
    }

    fn send(&self, command: PollCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!("poller already shut down, command ignored");
        }
    }
}

/// Owner of the poller task.
pub struct Poller {
    handle: PollerHandle,
    task: JoinHandle<()>,
}

impl Poller {
    /// Spawn the poller task in `Idle`, not yet running.
    ///
    /// Must be called from within a tokio runtime. Intervals shorter than
    /// [`MIN_REFRESH_INTERVAL`] are raised to it.
    #[must_use]
    pub fn spawn(provider: SharedProvider, interval: Duration) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(PollSnapshot::default());

        tracing::debug!(provider = %provider.describe(), ?interval, "spawning poller");

        let worker = PollWorker {
            provider,
            interval: interval.max(MIN_REFRESH_INTERVAL),
            commands: commands_rx,
            completions_tx,
            completions: completions_rx,
            snapshots: snapshots_tx,
            ticker: None,
            generation: 0,
            cycle_pending: false,
        };

        Self {
            handle: PollerHandle {
                commands: commands_tx,
                snapshots: snapshots_rx,
            },
            task: tokio::spawn(worker.run()),
        }
    }

    /// A cloneable handle for controlling and observing this poller.
    #[must_use]
    pub fn handle(&self) -> PollerHandle {
        self.handle.clone()
    }

    /// Stop polling and wait for the task to exit.
    ///
    /// In-flight HTTP requests are left to finish; their results are dropped.
    pub async fn shutdown(self) {
        self.handle.send(PollCommand::Shutdown);
        if let Err(e) = self.task.await {
            tracing::warn!("poller task ended abnormally: {e}");
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

struct PollWorker {
    provider: SharedProvider,
    interval: Duration,
    commands: mpsc::UnboundedReceiver<PollCommand>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    snapshots: watch::Sender<PollSnapshot>,
    ticker: Option<Interval>,
    generation: u64,
    /// A background cycle of the current generation is in flight.
    cycle_pending: bool,
}

impl PollWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(PollCommand::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                Some(done) = self.completions.recv() => self.complete(done),
                () = next_tick(&mut self.ticker), if !self.cycle_pending => {
                    self.begin_cycle(false);
                }
            }
        }
        tracing::debug!("poller task exiting");
    }

    fn handle(&mut self, command: PollCommand) {
        match command {
            PollCommand::Start => {
                self.bump_generation();
                let mut ticker =
                    tokio::time::interval_at(Instant::now() + self.interval, self.interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.ticker = Some(ticker);
                self.snapshots.send_modify(|s| s.running = true);
                tracing::debug!(generation = self.generation, "polling started");
                self.begin_cycle(false);
            }
            PollCommand::Stop => {
                if self.ticker.take().is_some() {
                    self.bump_generation();
                    self.snapshots.send_modify(|s| s.running = false);
                    tracing::debug!(generation = self.generation, "polling stopped");
                }
            }
            PollCommand::RefreshNow => self.begin_cycle(true),
            PollCommand::SetProvider(provider) => {
                self.bump_generation();
                tracing::debug!(provider = %provider.describe(), "provider replaced");
                self.provider = provider;
            }
            PollCommand::Shutdown => {}
        }
    }

    /// Invalidate in-flight results. A pending background cycle is abandoned.
    fn bump_generation(&mut self) {
        self.generation += 1;
        self.cycle_pending = false;
    }

    /// Start one fetch. Forced cycles run alongside the schedule; background
    /// cycles hold the timer until they complete.
    fn begin_cycle(&mut self, force: bool) {
        if force || self.snapshots.borrow().state.is_idle() {
            self.snapshots.send_modify(|s| s.state = PollState::Loading);
        }

        let background = !force;
        if background {
            self.cycle_pending = true;
        }

        let provider = Arc::clone(&self.provider);
        let completions = self.completions_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = provider.fetch().await;
            // The worker may have exited; nothing to report to then.
            let _ = completions.send(Completion {
                generation,
                background,
                result,
            });
        });
    }

    fn complete(&mut self, done: Completion) {
        if done.generation != self.generation {
            tracing::debug!(
                stale = done.generation,
                current = self.generation,
                "discarding stale fetch result"
            );
            return;
        }

        if done.background {
            self.cycle_pending = false;
            if let Some(ticker) = self.ticker.as_mut() {
                ticker.reset();
            }
        }

        match done.result {
            Ok(snapshot) => {
                tracing::debug!(used = snapshot.used, total = ?snapshot.total, "usage loaded");
                self.snapshots.send_modify(|s| {
                    s.state = PollState::Loaded(snapshot);
                    s.last_updated = Some(Utc::now());
                });
            }
            Err(err) => {
                tracing::warn!(code = err.error_code(), "usage fetch failed: {err}");
                let message = err.user_message();
                self.snapshots
                    .send_modify(|s| s.state = PollState::Failed(message));
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(snapshot: QuotaSnapshot) -> PollSnapshot {
        PollSnapshot {
            state: PollState::Loaded(snapshot),
            last_updated: None,
            running: true,
        }
    }

    #[test]
    fn menu_title_per_state() {
        let mut snap = PollSnapshot::default();
        assert_eq!(snap.menu_title(), "Copilot");

        snap.state = PollState::Loading;
        assert_eq!(snap.menu_title(), "Copilot");

        snap.state = PollState::Failed("down".into());
        assert!(snap.menu_title().starts_with("Copilot "));

        assert_eq!(loaded(QuotaSnapshot::with_total(12, 300)).menu_title(), "12/300");
        assert_eq!(loaded(QuotaSnapshot::from_used(12)).menu_title(), "12 used");
    }

    #[test]
    fn progress_value_only_when_loaded() {
        assert_eq!(PollSnapshot::default().progress_value(), None);
        assert_eq!(loaded(QuotaSnapshot::from_used(3)).progress_value(), None);
        let value = loaded(QuotaSnapshot::with_total(25, 100)).progress_value().unwrap();
        assert!((value - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn gauge_levels() {
        let level =
            |used, total| PollState::Loaded(QuotaSnapshot::with_total(used, total)).gauge_level();
        assert_eq!(PollState::Idle.gauge_level(), GaugeLevel::Pending);
        assert_eq!(PollState::Failed(String::new()).gauge_level(), GaugeLevel::Error);
        assert_eq!(
            PollState::Loaded(QuotaSnapshot::from_used(9)).gauge_level(),
            GaugeLevel::Unknown
        );
        assert_eq!(level(10, 100), GaugeLevel::Low);
        assert_eq!(level(50, 100), GaugeLevel::Medium);
        assert_eq!(level(80, 100), GaugeLevel::High);
        assert_eq!(level(120, 100), GaugeLevel::High);
    }

    #[test]
    fn status_line_mentions_remaining_and_percent() {
        let line = loaded(QuotaSnapshot::with_total(10, 50)).status_line();
        assert!(line.contains("10/50 used"), "{line}");
        assert!(line.contains("40 remaining"), "{line}");
        assert!(line.contains("20%"), "{line}");
    }

    #[test]
    fn status_line_keeps_last_update_when_failed() {
        let snap = PollSnapshot {
            state: PollState::Failed("Cannot reach the usage service".into()),
            last_updated: Some(Utc::now()),
            running: true,
        };
        let line = snap.status_line();
        assert!(line.starts_with("Failed: Cannot reach"), "{line}");
        assert!(line.contains("updated just now"), "{line}");
    }
}
