//! Supervisor for the local helper process that serves usage data.
//!
//! The helper (by default `npx copilot-api@latest start`) is launched from the
//! user's home directory with piped output. A background task watches its
//! output and exit; state changes are published on a `watch` channel.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{Result, UsageError};
use crate::storage::BackendConfig;

/// Output fragments that mean the helper is serving.
const READY_MARKERS: &[&str] = &["Server running", "Listening on", "4141", "ready"];

/// Directories searched when the program is not on `PATH`.
const COMMON_BIN_DIRS: &[&str] = &["/usr/local/bin", "/opt/homebrew/bin"];

/// Lifecycle of the helper process.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum ServiceState {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped(String),
    Failed(String),
}

impl ServiceState {
    /// Whether a process is (or is about to be) alive.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped(message) => write!(f, "stopped: {message}"),
            Self::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}

struct Supervised {
    kill: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Launches and stops the helper process.
pub struct BackendService {
    program: String,
    args: Vec<String>,
    state: Arc<watch::Sender<ServiceState>>,
    child: Option<Supervised>,
}

impl BackendService {
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        let (state, _) = watch::channel(ServiceState::Idle);
        Self {
            program: config.command.clone(),
            args: config.args.clone(),
            state: Arc::new(state),
            child: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ServiceState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ServiceState> {
        self.state.subscribe()
    }

    /// Launch the helper unless it is already starting, running or stopping.
    ///
    /// # Errors
    ///
    /// Returns error if the program cannot be found or spawned. The state is
    /// `Failed` in that case.
    pub async fn start(&mut self) -> Result<()> {
        if matches!(
            *self.state.borrow(),
            ServiceState::Starting | ServiceState::Running | ServiceState::Stopping
        ) {
            return Ok(());
        }

        // A previous process has already exited; reap its supervisor.
        if let Some(old) = self.child.take() {
            let _ = old.kill.send(());
            let _ = old.task.await;
        }

        self.state.send_replace(ServiceState::Starting);

        let child = match self.spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::error!(program = %self.program, "backend failed to start: {err}");
                self.state.send_replace(ServiceState::Failed(err.to_string()));
                return Err(err);
            }
        };

        tracing::info!(program = %self.program, pid = ?child.id(), "backend started");
        self.state.send_replace(ServiceState::Running);

        let (kill_tx, kill_rx) = oneshot::channel();
        let task = tokio::spawn(supervise(child, kill_rx, Arc::clone(&self.state)));
        self.child = Some(Supervised {
            kill: kill_tx,
            task,
        });
        Ok(())
    }

    /// Terminate the helper if it is starting or running.
    pub async fn stop(&mut self) {
        if !self.state.borrow().is_active() {
            return;
        }

        self.state.send_replace(ServiceState::Stopping);
        if let Some(child) = self.child.take() {
            let _ = child.kill.send(());
            if let Err(e) = child.task.await {
                tracing::warn!("backend supervisor ended abnormally: {e}");
            }
        }
        tracing::info!("backend stopped");
        self.state
            .send_replace(ServiceState::Stopped("Service stopped".to_string()));
    }

    fn spawn(&self) -> Result<Child> {
        let program = resolve_program(&self.program)?;
        tracing::debug!(?program, args = ?self.args, "spawning backend");

        let mut command = Command::new(&program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dirs) = directories::BaseDirs::new() {
            command.current_dir(dirs.home_dir());
        }

        command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => UsageError::BackendNotFound {
                program: program.display().to_string(),
            },
            std::io::ErrorKind::PermissionDenied => {
                UsageError::Backend(format!("Permission denied running {}", program.display()))
            }
            _ => UsageError::Backend(format!("Failed to start {}: {e}", program.display())),
        })
    }
}

impl Drop for BackendService {
    fn drop(&mut self) {
        if let Some(child) = self.child.take() {
            let _ = child.kill.send(());
        }
    }
}

/// Find the program on `PATH`, then in well-known install locations.
///
/// # Errors
///
/// Returns [`UsageError::BackendNotFound`] if no executable is found.
pub fn resolve_program(program: &str) -> Result<PathBuf> {
    let not_found = || UsageError::BackendNotFound {
        program: program.to_string(),
    };

    if program.contains('/') {
        let path = PathBuf::from(program);
        return if path.is_file() {
            Ok(path)
        } else {
            Err(not_found())
        };
    }

    if let Ok(path) = which::which(program) {
        return Ok(path);
    }

    let mut candidates: Vec<PathBuf> = COMMON_BIN_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(program))
        .collect();
    if let Some(dirs) = directories::BaseDirs::new() {
        candidates.extend(nvm_candidates(&dirs.home_dir().join(".nvm/versions/node"), program));
    }

    candidates
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(not_found)
}

fn nvm_candidates(root: &Path, program: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path().join("bin").join(program))
        .collect();
    // Newest node version first.
    found.sort();
    found.reverse();
    found
}

async fn supervise(
    mut child: Child,
    mut kill: oneshot::Receiver<()>,
    state: Arc<watch::Sender<ServiceState>>,
) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(watch_stdout(stdout));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(watch_stderr(stderr, Arc::clone(&state)));
    }

    let status = tokio::select! {
        status = child.wait() => status,
        _ = &mut kill => {
            if let Err(e) = child.kill().await {
                tracing::warn!("failed to kill backend: {e}");
            }
            return;
        }
    };

    let next = match status {
        Ok(status) if status.success() => {
            ServiceState::Stopped("Service completed normally".to_string())
        }
        Ok(status) => match status.code() {
            Some(code) => ServiceState::Failed(format!("Service exited with code {code}")),
            None => ServiceState::Failed("Service terminated by signal".to_string()),
        },
        Err(e) => ServiceState::Failed(format!("Failed to wait for service: {e}")),
    };
    tracing::info!(state = %next, "backend exited");
    set_if_active(&state, next);
}

async fn watch_stdout(stdout: impl AsyncRead + Unpin) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if READY_MARKERS.iter().any(|marker| line.contains(marker)) {
            tracing::info!(%line, "backend ready");
        } else {
            tracing::debug!(%line, "backend output");
        }
    }
}

async fn watch_stderr(stderr: impl AsyncRead + Unpin, state: Arc<watch::Sender<ServiceState>>) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::warn!(%line, "backend error output");
        let lower = line.to_lowercase();
        if lower.contains("not found") {
            set_if_active(
                &state,
                ServiceState::Failed(
                    "Command not found. Please install Node.js and npm.".to_string(),
                ),
            );
        } else if lower.contains("permission denied") {
            set_if_active(
                &state,
                ServiceState::Failed("Permission denied. Check file permissions.".to_string()),
            );
        }
    }
}

fn set_if_active(state: &watch::Sender<ServiceState>, next: ServiceState) {
    state.send_if_modified(|current| {
        if current.is_active() {
            *current = next;
            true
        } else {
            false
        }
    });
}
