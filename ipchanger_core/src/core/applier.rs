use crate::network::errors::{ApplyError, CycleWarning};
use crate::network::nmcli::{Ipv4Settings, Nmcli};
use crate::network::runner::{CommandRunner, TokioCommandRunner};
use ipchanger_storage::Profile;
use log::{debug, error, info, warn};
use std::fmt::{self, Display};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tokio::task::{AbortHandle, JoinHandle};

/// Pause between `connection down` finishing and `connection up` starting.
pub const DEFAULT_CYCLE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ApplierConfig {
    /// nmcli executable, looked up on `PATH` when relative.
    pub nmcli: PathBuf,
    pub cycle_delay: Duration,
}

impl Default for ApplierConfig {
    fn default() -> Self {
        Self {
            nmcli: PathBuf::from("nmcli"),
            cycle_delay: DEFAULT_CYCLE_DELAY,
        }
    }
}

/// Where the most recent apply request is.
///
/// `Failed` is only reachable from `Locating` and `Modifying`; once the
/// modify succeeded the request always ends in `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyState {
    Idle,
    Locating,
    Modifying,
    Cycling,
    Done,
    Failed,
}

/// User-facing text for a successful apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
}

impl Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of a successful modify: the message to show plus the still
/// running down/up cycle.
#[derive(Debug)]
pub struct ApplyOutcome {
    pub notification: Notification,
    pub connection: String,
    pub cycle: CycleHandle,
}

/// Completion signal of a scheduled down/up cycle.
#[derive(Debug)]
pub struct CycleHandle {
    task: JoinHandle<Result<(), CycleWarning>>,
}

impl CycleHandle {
    /// Resolves once the connection has been brought back up (or the cycle
    /// was cancelled).
    pub async fn wait(self) -> Result<(), CycleWarning> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(CycleWarning::Cancelled),
            Err(e) => Err(CycleWarning::Panicked(e.to_string())),
        }
    }

    /// Stop the cycle wherever it is. An `up` that has not started yet never runs.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Applies profiles to the active NetworkManager connection.
///
/// Requests are serialized: each one holds `apply_lock` from the active
/// connection lookup until its cycle has finished, so two quick clicks
/// cannot interleave their down/up sequences. Cloning is cheap and every
/// clone shares the same lock, state and pending cycle.
#[derive(Clone)]
pub struct ConnectionApplier {
    nmcli: Nmcli,
    cycle_delay: Duration,
    apply_lock: Arc<Mutex<()>>,
    state_tx: Arc<watch::Sender<ApplyState>>,
    pending: Arc<std::sync::Mutex<Option<AbortHandle>>>,
}

impl Default for ConnectionApplier {
    fn default() -> Self {
        Self::new(ApplierConfig::default())
    }
}

impl ConnectionApplier {
    pub fn new(config: ApplierConfig) -> Self {
        Self::with_runner(config, Arc::new(TokioCommandRunner))
    }

    /// Build an applier on top of any [`CommandRunner`], e.g. a fake in tests.
    pub fn with_runner(config: ApplierConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let (state_tx, _) = watch::channel(ApplyState::Idle);
        Self {
            nmcli: Nmcli::new(runner, config.nmcli),
            cycle_delay: config.cycle_delay,
            apply_lock: Arc::new(Mutex::new(())),
            state_tx: Arc::new(state_tx),
            pending: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    /// Watch the state of the current (or last) request.
    pub fn subscribe(&self) -> watch::Receiver<ApplyState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> ApplyState {
        *self.state_tx.borrow()
    }

    /// Re-queried on every call; the active connection can change at any time.
    pub async fn active_connection_name(&self) -> Option<String> {
        self.nmcli.active_connection().await
    }

    /// Switch the active connection to the static settings of `profile`.
    pub async fn apply_profile(&self, profile: &Profile) -> Result<ApplyOutcome, ApplyError> {
        let settings = Ipv4Settings::Manual {
            address: profile.address(),
            gateway: profile.gateway().to_string(),
            dns: profile.dns().map(str::to_string),
        };
        info!("Applying IP profile '{}' ({})", profile.name(), profile.address());
        self.run(settings, format!("Applied IP profile: {}", profile.name()))
            .await
    }

    /// Put the active connection back on DHCP.
    pub async fn reset_to_dhcp(&self) -> Result<ApplyOutcome, ApplyError> {
        info!("Resetting active connection to DHCP");
        self.run(Ipv4Settings::Auto, "Switched to DHCP".to_string())
            .await
    }

    /// Abort the cycle in flight, if any. Returns `true` when one was running.
    pub fn cancel_pending_cycle(&self) -> bool {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match pending {
            Some(handle) if !handle.is_finished() => {
                info!("Cancelling pending connection cycle");
                handle.abort();
                true
            }
            _ => false,
        }
    }

    async fn run(
        &self,
        settings: Ipv4Settings,
        success_message: String,
    ) -> Result<ApplyOutcome, ApplyError> {
        let guard = Arc::clone(&self.apply_lock).lock_owned().await;

        self.state_tx.send_replace(ApplyState::Locating);
        let Some(connection) = self.nmcli.active_connection().await else {
            warn!("No active connection found");
            self.state_tx.send_replace(ApplyState::Failed);
            return Err(ApplyError::NoActiveConnection);
        };

        self.state_tx.send_replace(ApplyState::Modifying);
        debug!("Modifying '{}' with {:?}", connection, settings);
        if let Err(e) = self.nmcli.modify(&connection, &settings).await {
            error!("Modifying '{}' failed: {}", connection, e);
            self.state_tx.send_replace(ApplyState::Failed);
            return Err(e);
        }

        self.state_tx.send_replace(ApplyState::Cycling);
        let cycle = self.spawn_cycle(connection.clone(), guard);
        info!("{}", success_message);
        Ok(ApplyOutcome {
            notification: Notification {
                message: success_message,
            },
            connection,
            cycle,
        })
    }

    fn spawn_cycle(&self, connection: String, lock: OwnedMutexGuard<()>) -> CycleHandle {
        let nmcli = self.nmcli.clone();
        let delay = self.cycle_delay;
        let guard = CycleGuard {
            state_tx: Arc::clone(&self.state_tx),
            completed: false,
            _lock: lock,
        };
        let task = tokio::spawn(async move {
            let mut guard = guard;
            let result = cycle_connection(&nmcli, &connection, delay).await;
            guard.completed = true;
            result
        });
        *self.pending.lock().unwrap_or_else(|e| e.into_inner()) = Some(task.abort_handle());
        CycleHandle { task }
    }
}

/// Lives inside the cycle task. Dropping it, on completion or on abort,
/// publishes the final state and then releases the apply lock.
struct CycleGuard {
    state_tx: Arc<watch::Sender<ApplyState>>,
    completed: bool,
    _lock: OwnedMutexGuard<()>,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        let state = if self.completed {
            ApplyState::Done
        } else {
            ApplyState::Idle
        };
        self.state_tx.send_replace(state);
    }
}

/// Down, wait for `down` to exit, sleep `delay`, then up.
///
/// A failing `down` is only logged; `up` still runs so the connection is not
/// left torn down.
async fn cycle_connection(
    nmcli: &Nmcli,
    connection: &str,
    delay: Duration,
) -> Result<(), CycleWarning> {
    info!("Bringing connection '{}' down", connection);
    match nmcli.down(connection).await {
        Ok(out) if out.success => debug!("'{}' is down", connection),
        Ok(out) => warn!("Bringing '{}' down failed: {}", connection, out.stderr.trim()),
        Err(e) => warn!("Error bringing '{}' down: {e}", connection),
    }

    tokio::time::sleep(delay).await;

    info!("Bringing connection '{}' up", connection);
    let warning = match nmcli.up(connection).await {
        Ok(out) if out.success => {
            info!("Connection '{}' is back up", connection);
            return Ok(());
        }
        Ok(out) => CycleWarning::UpFailed {
            connection: connection.to_string(),
            stderr: out.stderr,
        },
        Err(e) => CycleWarning::Launch(e),
    };
    warn!("{warning}");
    Err(warning)
}
