//! Sink registry.
//!
//! # Responsibilities
//! - Hold the live sinks keyed by name
//! - Fan tracing callbacks out to every sink
//! - Re-initialize all sinks against the runtime handle
//!
//! # Design Decisions
//! - Injectable handle (cheap `Clone`), not a global; each test builds its own
//! - Concurrent map because the tracing layer may run on any thread
//! - `initialize_all` works on a snapshot so no map lock is held while sinks log

use std::sync::Arc;

use dashmap::DashMap;
use tokio::runtime::Handle;

use crate::observability::metrics;
use crate::observability::sinks::{ConsoleSink, Sink};

/// Process-wide set of active sinks.
#[derive(Debug, Clone, Default)]
pub struct SinkRegistry {
    inner: Arc<DashMap<String, Arc<dyn Sink>>>,
}

impl SinkRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding only the default stderr sink.
    pub fn with_default_console() -> Self {
        let registry = Self::new();
        registry.insert(Arc::new(ConsoleSink::stderr()));
        registry
    }

    /// Insert or replace a sink under its own name.
    pub fn insert(&self, sink: Arc<dyn Sink>) -> Option<Arc<dyn Sink>> {
        self.inner.insert(sink.name().to_string(), sink)
    }

    pub fn remove(&self, name: &str) -> Option<Arc<dyn Sink>> {
        self.inner.remove(name).map(|(_, sink)| sink)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Sink>> {
        self.inner.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Keep only the sinks whose name satisfies `keep`.
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) {
        self.inner.retain(|name, _| keep(name.as_str()));
    }

    /// Sorted sink names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Owned copy of the current sinks.
    pub fn snapshot(&self) -> Vec<Arc<dyn Sink>> {
        self.inner.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Visit every live sink in place.
    pub fn for_each(&self, mut f: impl FnMut(&dyn Sink)) {
        for entry in self.inner.iter() {
            f(entry.value().as_ref());
        }
    }

    /// Re-initialize every registered sink. Returns how many failed.
    ///
    /// A failing sink is reported and skipped; the others still initialize.
    pub fn initialize_all(&self, handle: &Handle) -> usize {
        let sinks = self.snapshot();
        let mut failures = 0;
        for sink in &sinks {
            if let Err(e) = sink.initialize(handle) {
                failures += 1;
                tracing::warn!(sink = sink.name(), error = %e, "Failed to initialize log sink");
            }
        }
        metrics::record_active_sinks(sinks.len());
        failures
    }
}
