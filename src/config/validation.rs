//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation of the logging file (serde handles syntactic)
//! - Unique, non-empty appender names
//! - File appenders carry a path
//! - Level directives parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LoggingConfig → Result<(), Vec<ValidationError>>
//! - Runs before any sink is touched

use std::collections::HashSet;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::{AppenderKind, LoggingConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("appender #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("duplicate appender name '{0}'")]
    DuplicateName(String),

    #[error("file appender '{0}' has an empty path")]
    EmptyPath(String),

    #[error("invalid level directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },

    #[error("appender '{name}' has unknown level '{level}'")]
    UnknownLevel { name: String, level: String },
}

/// Validate a parsed logging configuration.
pub fn validate_logging_config(config: &LoggingConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = EnvFilter::try_new(&config.level) {
        errors.push(ValidationError::InvalidDirective {
            directive: config.level.clone(),
            reason: e.to_string(),
        });
    }

    let mut seen = HashSet::new();
    for (index, appender) in config.appenders.iter().enumerate() {
        if appender.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName { index });
        } else if !seen.insert(appender.name.as_str()) {
            errors.push(ValidationError::DuplicateName(appender.name.clone()));
        }

        if let AppenderKind::File { path } = &appender.kind {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::EmptyPath(appender.name.clone()));
            }
        }

        if appender.level_filter().is_none() {
            errors.push(ValidationError::UnknownLevel {
                name: appender.name.clone(),
                level: appender.level.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
