//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{LoggingConfig, ServiceConfig};
use crate::config::validation::{validate_logging_config, ValidationError};
use crate::lifecycle::fault::{Fault, ServiceError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {}", .path.display(), .message)]
    Parse { path: PathBuf, message: String },

    #[error("{} failed validation ({} errors)", .path.display(), .errors.len())]
    Validation {
        path: PathBuf,
        errors: Vec<ValidationError>,
    },
}

impl ConfigError {
    /// File the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Io { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Validation { path, .. } => path,
        }
    }
}

impl From<ConfigError> for Fault {
    fn from(err: ConfigError) -> Self {
        let mut service = ServiceError::new("configuration", err.to_string())
            .with_context(format!("file: {}", err.path().display()));
        if let ConfigError::Validation { errors, .. } = &err {
            for e in errors {
                service = service.with_context(e.to_string());
            }
        }
        Fault::Service(service)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate a JSON logging configuration.
pub fn load_logging_config(path: &Path) -> Result<LoggingConfig, ConfigError> {
    let content = read(path)?;
    let config: LoggingConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    validate_logging_config(&config).map_err(|errors| ConfigError::Validation {
        path: path.to_path_buf(),
        errors,
    })?;

    Ok(config)
}

/// Load the TOML service options file.
pub fn load_service_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = read(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
