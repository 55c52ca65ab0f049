//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! logging.json
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → LoggingConfig
//!     → observability::logging::LoggingConfigurator (filter + sinks)
//!
//! On SIGHUP:
//!     lifecycle::reload re-runs the same pipeline
//!     → failure is logged, previous sinks keep running
//!
//! config.toml
//!     → loader.rs → ServiceConfig (read once by the host)
//! ```
//!
//! # Design Decisions
//! - A missing logging file is not an error; the active sinks stay as they are
//! - All fields have defaults to allow minimal files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{
    AppenderConfig, AppenderKind, ConsoleStream, LogFormat, LoggingConfig, ServiceConfig,
};
