//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize the hosted application
//! - Bootstrap logging and arm the reload loop
//! - Log version, config file and data directory
//! - Start the application and run its event loop to completion
//! - Turn whatever escapes into an exit code
//!
//! # Design Decisions
//! - Fail fast: any startup fault is fatal, including a bad logging file
//! - Initialization refusal is a boolean and bypasses the classifier
//! - Single-threaded runtime; everything here runs on the loop thread
//! - Panics are caught at the top scope, initialization included, and
//!   classified like any other fault
//! - A startup fault still stops the application and the reload loop

use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::broadcast;

use crate::lifecycle::exit::{self, ExitStatus};
use crate::lifecycle::fault::Fault;
use crate::lifecycle::reload::{ReloadLoop, ReloadWatch};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::ReloadTrigger;
use crate::observability::logging::Configure;
use crate::observability::registry::SinkRegistry;

/// The hosted application, as seen by the orchestrator.
pub trait Application {
    /// Parse arguments and initialize plugins. `false` aborts the process.
    fn initialize(&mut self, args: Vec<OsString>) -> bool;

    fn startup(&mut self) -> Result<(), Fault>;

    /// Run until shutdown.
    fn exec(&mut self) -> impl Future<Output = Result<(), Fault>>;

    /// Location of the logging configuration file.
    fn logging_conf(&self) -> PathBuf;

    fn version_string(&self) -> String;

    fn full_config_file_path(&self) -> PathBuf;

    fn data_dir(&self) -> PathBuf;

    /// Shutdown coordinator of the event loop.
    fn shutdown(&self) -> &Shutdown;

    /// Release what a failed `startup` acquired. `exec` does this on the normal path.
    fn stop(&mut self) {}
}

/// One-time logging setup.
pub struct LoggingBootstrap<C> {
    config_path: PathBuf,
    configurator: Arc<C>,
    sinks: SinkRegistry,
}

impl<C: Configure> LoggingBootstrap<C> {
    pub fn new(config_path: PathBuf, configurator: Arc<C>, sinks: SinkRegistry) -> Self {
        Self {
            config_path,
            configurator,
            sinks,
        }
    }

    /// Load the file if present, initialize sinks, arm the reload loop.
    ///
    /// Configuration faults are not caught here: a broken file at startup
    /// must stop the process.
    pub fn initialize<T, F>(
        self,
        handle: &Handle,
        make_trigger: F,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<ReloadWatch, Fault>
    where
        T: ReloadTrigger,
        F: FnOnce() -> io::Result<T>,
    {
        if self.config_path.exists() {
            self.configurator.configure(&self.config_path)?;
        }
        self.sinks.initialize_all(handle);

        let trigger = make_trigger()?;
        let reload = ReloadLoop::new(
            self.config_path,
            self.configurator,
            self.sinks,
            handle.clone(),
        );
        Ok(reload.spawn(trigger, shutdown))
    }
}

/// Top-level sequencing of the process.
pub struct Service<A, C> {
    app: A,
    sinks: SinkRegistry,
    configurator: Arc<C>,
}

impl<A: Application, C: Configure> Service<A, C> {
    pub fn new(app: A, sinks: SinkRegistry, configurator: Arc<C>) -> Self {
        Self {
            app,
            sinks,
            configurator,
        }
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    /// Run the whole process lifetime and return its exit status.
    pub fn run<I, S, T, F>(&mut self, args: I, make_trigger: F) -> ExitStatus
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
        T: ReloadTrigger,
        F: FnOnce() -> io::Result<T>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            if !self.app.initialize(args) {
                return Ok(false);
            }
            self.run_initialized(make_trigger).map(|()| true)
        }))
        .unwrap_or_else(|payload| Err(Fault::from_panic(payload)));

        match result {
            Ok(true) => ExitStatus::Success,
            Ok(false) => ExitStatus::InitializeFail,
            Err(fault) => exit::report(&fault),
        }
    }

    fn run_initialized<T, F>(&mut self, make_trigger: F) -> Result<(), Fault>
    where
        T: ReloadTrigger,
        F: FnOnce() -> io::Result<T>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.serve(make_trigger))
    }

    async fn serve<T, F>(&mut self, make_trigger: F) -> Result<(), Fault>
    where
        T: ReloadTrigger,
        F: FnOnce() -> io::Result<T>,
    {
        let bootstrap = LoggingBootstrap::new(
            self.app.logging_conf(),
            Arc::clone(&self.configurator),
            self.sinks.clone(),
        );
        let reload = bootstrap.initialize(
            &Handle::current(),
            make_trigger,
            self.app.shutdown().subscribe(),
        )?;

        tracing::info!("fill-postgresql version {}", self.app.version_string());
        tracing::info!(
            "fill-postgresql using configuration file {}",
            self.app.full_config_file_path().display()
        );
        tracing::info!(
            "fill-postgresql data directory is {}",
            self.app.data_dir().display()
        );

        if let Err(fault) = self.app.startup() {
            self.app.shutdown().trigger();
            self.app.stop();
            // The startup fault is the one reported.
            if let Err(e) = reload.join().await {
                tracing::warn!(error = %e, "Reload loop did not stop cleanly");
            }
            return Err(fault);
        }
        let result = self.app.exec().await;

        self.app.shutdown().trigger();
        let stopped = reload.join().await;
        result.and(stopped)
    }
}
