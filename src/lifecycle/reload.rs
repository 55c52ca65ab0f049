//! Logging reconfiguration loop.
//!
//! # Data Flow
//! ```text
//! armed ──SIGHUP──▶ reload_once()
//!   ▲                 ├─ path exists? → configure (faults logged, swallowed)
//!   │                 ├─ initialize every sink
//!   └─────────────────┘  re-arm
//!
//! armed ──shutdown / trigger gone──▶ exit (no reload, no re-arm)
//! ```
//!
//! # Design Decisions
//! - One spawned task with an explicit loop; re-arming is the next `select!`
//! - Shutdown is polled first, so a signal racing with shutdown never reloads
//! - A bad file at runtime is an error line, never a crash; panics inside the
//!   configurator or a sink's initialization are caught too
//! - No retries and no timeout on the wait

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::lifecycle::fault::Fault;
use crate::lifecycle::signals::ReloadTrigger;
use crate::observability::logging::Configure;
use crate::observability::metrics;
use crate::observability::registry::SinkRegistry;

/// Result of one reload cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The file was loaded and applied.
    Applied,
    /// The file did not exist; nothing was loaded.
    Skipped,
    /// Loading or applying failed; the fault was logged.
    Failed,
}

impl ReloadOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ReloadOutcome::Applied => "applied",
            ReloadOutcome::Skipped => "skipped",
            ReloadOutcome::Failed => "failed",
        }
    }
}

/// Observable state of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadStatus {
    /// A pending watch is outstanding.
    pub armed: bool,
    /// Completed reload cycles.
    pub cycles: u64,
    /// Cycles that actually read the file.
    pub loads_attempted: u64,
    pub failures: u64,
    pub last_outcome: Option<ReloadOutcome>,
}

/// The self re-arming reload watcher.
pub struct ReloadLoop<C> {
    config_path: PathBuf,
    configurator: Arc<C>,
    sinks: SinkRegistry,
    handle: Handle,
    status: watch::Sender<ReloadStatus>,
}

impl<C: Configure> ReloadLoop<C> {
    pub fn new(
        config_path: PathBuf,
        configurator: Arc<C>,
        sinks: SinkRegistry,
        handle: Handle,
    ) -> Self {
        let (status, _) = watch::channel(ReloadStatus::default());
        Self {
            config_path,
            configurator,
            sinks,
            handle,
            status,
        }
    }

    /// Arm the first watch and run the loop on the runtime.
    pub fn spawn<T: ReloadTrigger>(
        self,
        trigger: T,
        shutdown: broadcast::Receiver<()>,
    ) -> ReloadWatch {
        self.status.send_modify(|s| s.armed = true);
        let status = self.status.subscribe();
        let task = self.handle.clone().spawn(self.run(trigger, shutdown));
        ReloadWatch { task, status }
    }

    async fn run<T: ReloadTrigger>(self, mut trigger: T, mut shutdown: broadcast::Receiver<()>) {
        loop {
            let fired = tokio::select! {
                biased;
                _ = shutdown.recv() => false,
                received = trigger.recv() => received.is_some(),
            };
            if !fired {
                self.status.send_modify(|s| s.armed = false);
                tracing::debug!("Logging reload watch cancelled");
                return;
            }

            self.status.send_modify(|s| s.armed = false);
            let outcome = self.reload_once();
            self.status.send_modify(|s| {
                s.cycles += 1;
                if outcome != ReloadOutcome::Skipped {
                    s.loads_attempted += 1;
                }
                if outcome == ReloadOutcome::Failed {
                    s.failures += 1;
                }
                s.last_outcome = Some(outcome);
                s.armed = true;
            });
        }
    }

    /// One reconfiguration cycle. Never fails.
    pub fn reload_once(&self) -> ReloadOutcome {
        tracing::info!("Received HUP. Reloading logging configuration.");
        metrics::record_reload_signal();

        let outcome = if self.config_path.exists() {
            match self.configure_guarded() {
                Ok(()) => {
                    tracing::info!(
                        path = %self.config_path.display(),
                        "Logging configuration reloaded"
                    );
                    ReloadOutcome::Applied
                }
                Err(fault) => {
                    log_reload_fault(&self.config_path, &fault);
                    ReloadOutcome::Failed
                }
            }
        } else {
            tracing::debug!(
                path = %self.config_path.display(),
                "No logging configuration to reload"
            );
            ReloadOutcome::Skipped
        };

        let outcome = match self.initialize_sinks_guarded() {
            Ok(()) => outcome,
            Err(fault) => {
                tracing::error!(error = %fault, "Error initializing log sinks");
                ReloadOutcome::Failed
            }
        };
        metrics::record_reload(outcome.as_str());
        outcome
    }

    fn configure_guarded(&self) -> Result<(), Fault> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            self.configurator.configure(&self.config_path)
        }))
        .unwrap_or_else(|payload| Err(Fault::from_panic(payload)))
    }

    fn initialize_sinks_guarded(&self) -> Result<(), Fault> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            self.sinks.initialize_all(&self.handle);
        }))
        .map_err(Fault::from_panic)
    }
}

fn log_reload_fault(path: &Path, fault: &Fault) {
    match fault.detailed_description() {
        Some(detail) => tracing::error!(
            path = %path.display(),
            error = %detail,
            "Error reloading logging configuration"
        ),
        None => tracing::error!(
            path = %path.display(),
            "Error reloading logging configuration"
        ),
    }
}

/// Handle on a running reload loop.
#[derive(Debug)]
pub struct ReloadWatch {
    task: JoinHandle<()>,
    status: watch::Receiver<ReloadStatus>,
}

impl ReloadWatch {
    pub fn status(&self) -> ReloadStatus {
        *self.status.borrow()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<ReloadStatus> {
        self.status.clone()
    }

    /// Wait for the loop to end (after shutdown or trigger loss).
    pub async fn join(self) -> Result<(), Fault> {
        self.task.await.map_err(|e| {
            if e.is_panic() {
                Fault::from_panic(e.into_panic())
            } else {
                Fault::runtime("logging reload task cancelled")
            }
        })
    }
}
