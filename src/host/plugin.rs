//! Plugin contract.

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::lifecycle::fault::{Fault, ServiceError};

#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin's options table is missing or wrong.
    #[error("invalid options: {0}")]
    Options(String),

    #[error("{0}")]
    Failed(String),
}

/// A unit of service functionality hosted by the application.
pub trait Plugin: Send {
    fn name(&self) -> &'static str;

    /// Read options. Called once, before logging is configured.
    fn initialize(&mut self, config: &ServiceConfig) -> Result<(), PluginError>;

    fn startup(&mut self) -> Result<(), PluginError>;

    fn shutdown(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Attach the plugin name to a plugin error.
pub fn plugin_fault(plugin: &str, err: PluginError) -> Fault {
    Fault::Service(
        ServiceError::new("plugin", err.to_string())
            .with_context(format!("plugin: {plugin}")),
    )
}
