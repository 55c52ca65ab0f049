//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! tracing macros
//!     → reload::Layer<EnvFilter>   (global level, swapped on reload)
//!     → SinkLayer                  (logging.rs, per-sink threshold)
//!     → SinkRegistry::for_each     (registry.rs)
//!     → ConsoleSink / FileSink     (sinks.rs, fmt layer per sink)
//!
//! Reload cycle:
//!     → metrics.rs (signal counter, outcome counter, active sinks gauge)
//! ```
//!
//! # Design Decisions
//! - Sinks are named; reconfiguration replaces them by name
//! - File sinks buffer until initialized, then write from a background task
//! - Metrics go through the `metrics` facade; no exporter is installed here

pub mod logging;
pub mod metrics;
pub mod registry;
pub mod sinks;

pub use logging::{Configure, LoggingConfigurator};
pub use registry::SinkRegistry;
pub use sinks::Sink;
