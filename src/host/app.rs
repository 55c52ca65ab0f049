//! The service application: arguments, options file, plugin lifecycle.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::loader::load_service_config;
use crate::config::schema::ServiceConfig;
use crate::host::cli::{Cli, ResolvedPaths};
use crate::host::plugin::{plugin_fault, Plugin};
use crate::lifecycle::fault::Fault;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_termination;
use crate::lifecycle::startup::Application;

/// Hosts plugins and runs until SIGINT/SIGTERM or an explicit shutdown.
pub struct ServiceApp {
    plugins: Vec<Box<dyn Plugin>>,
    default_data_dir: PathBuf,
    default_config_dir: PathBuf,
    paths: ResolvedPaths,
    config: ServiceConfig,
    shutdown: Shutdown,
    started: usize,
}

impl ServiceApp {
    /// Application rooted next to the running executable.
    pub fn new() -> Self {
        let root = app_root().join("eosio").join("fill-postgresql");
        Self::with_default_dirs(root.join("data"), root.join("config"))
    }

    pub fn with_default_dirs(
        data_dir: impl Into<PathBuf>,
        config_dir: impl Into<PathBuf>,
    ) -> Self {
        let default_data_dir = data_dir.into();
        let default_config_dir = config_dir.into();
        let paths = ResolvedPaths::defaults(&default_data_dir, &default_config_dir);
        Self {
            plugins: Vec::new(),
            default_data_dir,
            default_config_dir,
            paths,
            config: ServiceConfig::default(),
            shutdown: Shutdown::new(),
            started: 0,
        }
    }

    /// Register a plugin. Plugins start in registration order.
    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn shutdown_plugins(&mut self) {
        for plugin in self.plugins[..self.started].iter_mut().rev() {
            if let Err(e) = plugin.shutdown() {
                tracing::warn!(
                    plugin = plugin.name(),
                    error = %e,
                    "Plugin failed to shut down cleanly"
                );
            }
        }
        self.started = 0;
    }
}

impl Default for ServiceApp {
    fn default() -> Self {
        Self::new()
    }
}

fn app_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Application for ServiceApp {
    fn initialize(&mut self, args: Vec<OsString>) -> bool {
        let cli = match Cli::try_parse_from(args) {
            Ok(cli) => cli,
            Err(e) => {
                // Covers --help and --version as well as real errors.
                let _ = e.print();
                return false;
            }
        };
        self.paths =
            ResolvedPaths::resolve(&cli, &self.default_data_dir, &self.default_config_dir);

        if self.paths.config_file.exists() {
            match load_service_config(&self.paths.config_file) {
                Ok(config) => self.config = config,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load service configuration");
                    return false;
                }
            }
        }

        for plugin in &mut self.plugins {
            if let Err(e) = plugin.initialize(&self.config) {
                tracing::error!(
                    plugin = plugin.name(),
                    error = %e,
                    "Plugin failed to initialize"
                );
                return false;
            }
        }
        true
    }

    fn startup(&mut self) -> Result<(), Fault> {
        for index in 0..self.plugins.len() {
            let plugin = &mut self.plugins[index];
            plugin.startup().map_err(|e| plugin_fault(plugin.name(), e))?;
            self.started = index + 1;
            tracing::info!(plugin = plugin.name(), "Plugin started");
        }
        Ok(())
    }

    async fn exec(&mut self) -> Result<(), Fault> {
        if !self.shutdown.is_triggered() {
            let mut shutdown = self.shutdown.subscribe();
            // A trigger between the first check and subscribe is not broadcast to us.
            if !self.shutdown.is_triggered() {
                tokio::select! {
                    result = wait_for_termination() => result?,
                    _ = shutdown.recv() => tracing::info!("Shutdown requested"),
                }
            }
        }
        self.shutdown.trigger();
        self.shutdown_plugins();
        Ok(())
    }

    fn logging_conf(&self) -> PathBuf {
        self.paths.logging_conf.clone()
    }

    fn version_string(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn full_config_file_path(&self) -> PathBuf {
        self.paths.config_file.clone()
    }

    fn data_dir(&self) -> PathBuf {
        self.paths.data_dir.clone()
    }

    fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    fn stop(&mut self) {
        self.shutdown_plugins();
    }
}
