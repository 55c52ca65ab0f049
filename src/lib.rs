//! fill-postgresql service bootstrap library

pub mod config;
pub mod host;
pub mod lifecycle;
pub mod observability;

pub use config::schema::{LoggingConfig, ServiceConfig};
pub use host::ServiceApp;
pub use lifecycle::{ExitStatus, Fault, Service, Shutdown};
pub use observability::{LoggingConfigurator, SinkRegistry};
