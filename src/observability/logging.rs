//! Structured logging.
//!
//! # Responsibilities
//! - Install the tracing subscriber (sink fan-out + reloadable filter)
//! - Forward span and event callbacks to every sink in the registry
//! - Apply a [`LoggingConfig`] to the live filter and sinks
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging; each sink renders with its
//!   own `tracing_subscriber::fmt` layer
//! - The global level lives in a `reload::Layer<EnvFilter>` so it can change
//!   without rebuilding the subscriber
//! - Applying a configuration is best-effort, not transactional: stale sinks
//!   are dropped first, then new ones are inserted one by one

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::span::{Attributes, Id, Record};
use tracing::Event;
use tracing_subscriber::layer::{Context, Layer, Layered};
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{reload, EnvFilter, Registry};

use crate::config::loader::load_logging_config;
use crate::config::schema::LoggingConfig;
use crate::lifecycle::fault::{Fault, ServiceError};
use crate::observability::registry::SinkRegistry;
use crate::observability::sinks::build_sink;

/// Filter used until a configuration file says otherwise.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Handle to swap the global level filter at runtime.
pub type FilterHandle = reload::Handle<EnvFilter, Layered<SinkLayer, Registry>>;

/// Tracing layer fanning callbacks out to a [`SinkRegistry`].
///
/// Spans reach every sink so their formatters can store span fields; events
/// reach only the sinks whose threshold admits them.
#[derive(Debug, Clone)]
pub struct SinkLayer {
    sinks: SinkRegistry,
}

impl SinkLayer {
    pub fn new(sinks: SinkRegistry) -> Self {
        Self { sinks }
    }
}

impl Layer<Registry> for SinkLayer {
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, Registry>) {
        self.sinks.for_each(|sink| sink.on_new_span(attrs, id, ctx.clone()));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, Registry>) {
        self.sinks.for_each(|sink| sink.on_record(id, values, ctx.clone()));
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, Registry>) {
        let level = event.metadata().level();
        self.sinks.for_each(|sink| {
            if sink.admits(level) {
                sink.on_event(event, ctx.clone());
            }
        });
    }
}

/// Filter from `RUST_LOG`, falling back to [`DEFAULT_DIRECTIVE`].
pub fn initial_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber: the sink layer, gated by a reloadable filter.
pub fn init_subscriber(sinks: &SinkRegistry) -> Result<FilterHandle, TryInitError> {
    let (filter, handle) = reload::Layer::new(initial_filter());
    tracing_subscriber::registry()
        .with(SinkLayer::new(sinks.clone()))
        .with(filter)
        .try_init()?;
    Ok(handle)
}

/// "Configure logging from this file."
///
/// Implementations may fail in any way; callers decide whether that is fatal.
pub trait Configure: Send + Sync + 'static {
    fn configure(&self, path: &Path) -> Result<(), Fault>;
}

/// Applies logging files to the live filter and sink registry.
#[derive(Clone)]
pub struct LoggingConfigurator {
    sinks: SinkRegistry,
    filter: Option<FilterHandle>,
    current: Arc<ArcSwapOption<LoggingConfig>>,
}

impl LoggingConfigurator {
    /// Configurator that only manages sinks.
    pub fn new(sinks: SinkRegistry) -> Self {
        Self {
            sinks,
            filter: None,
            current: Arc::new(ArcSwapOption::empty()),
        }
    }

    /// Also drive the global level filter.
    pub fn with_filter(mut self, filter: FilterHandle) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sinks(&self) -> &SinkRegistry {
        &self.sinks
    }

    /// Last successfully applied configuration.
    pub fn current(&self) -> Option<Arc<LoggingConfig>> {
        self.current.load_full()
    }

    /// Apply an already validated configuration.
    pub fn apply(&self, config: LoggingConfig) -> Result<(), Fault> {
        if let Some(filter) = &self.filter {
            let directive = EnvFilter::try_new(&config.level).map_err(|e| {
                ServiceError::new("logging", "invalid level directive")
                    .with_context(format!("directive: {}", config.level))
                    .with_context(e.to_string())
            })?;
            filter.reload(directive).map_err(Fault::diagnostic)?;
        }

        let configured: HashSet<&str> =
            config.appenders.iter().map(|a| a.name.as_str()).collect();
        self.sinks.retain(|name| configured.contains(name));
        for appender in &config.appenders {
            self.sinks.insert(Arc::from(build_sink(appender)));
        }

        tracing::debug!(
            level = %config.level,
            appenders = config.appenders.len(),
            "Logging configuration applied"
        );
        self.current.store(Some(Arc::new(config)));
        Ok(())
    }
}

impl Configure for LoggingConfigurator {
    fn configure(&self, path: &Path) -> Result<(), Fault> {
        let config = load_logging_config(path)?;
        self.apply(config)
    }
}

impl fmt::Debug for LoggingConfigurator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfigurator")
            .field("sinks", &self.sinks)
            .field("filter", &self.filter.is_some())
            .field("current", &self.current())
            .finish()
    }
}
