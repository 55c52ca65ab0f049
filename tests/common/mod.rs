//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use fill_postgresql::lifecycle::{Application, Fault, ServiceError, Shutdown};
use fill_postgresql::observability::logging::{Configure, SinkLayer};
use fill_postgresql::observability::{Sink, SinkRegistry};
use tokio::runtime::Handle;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::Registry;

/// One captured event.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LogRecord {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl Visit for LogRecord {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_debug(field, &format_args!("{value}"));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push((field.name().to_string(), format!("{value:?}")));
        }
    }
}

/// Sink that keeps every record in memory and counts initializations.
#[derive(Debug)]
pub struct MemorySink {
    name: String,
    records: Mutex<Vec<LogRecord>>,
    initializations: AtomicUsize,
}

impl MemorySink {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            records: Mutex::new(Vec::new()),
            initializations: AtomicUsize::new(0),
        })
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.level == level)
            .count()
    }

    pub fn errors(&self) -> usize {
        self.count(Level::ERROR)
    }

    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.message.clone())
            .collect()
    }

    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> Level {
        Level::TRACE
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, Registry>) {
        let metadata = event.metadata();
        let mut record = LogRecord {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: String::new(),
            fields: Vec::new(),
        };
        event.record(&mut record);
        self.records.lock().unwrap().push(record);
    }

    fn initialize(&self, _handle: &Handle) -> std::io::Result<()> {
        self.initializations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Route this thread's events into a fresh [`MemorySink`] until the guard drops.
pub fn capture() -> (Arc<MemorySink>, DefaultGuard) {
    let sink = MemorySink::new("capture");
    let registry = SinkRegistry::new();
    registry.insert(sink.clone());
    let subscriber = tracing_subscriber::registry().with(SinkLayer::new(registry));
    (sink, tracing::subscriber::set_default(subscriber))
}

/// What a scripted call does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Succeed,
    FailService,
    FailOutOfMemory,
    FailRuntime,
    FailUnknown,
    Panic,
}

impl Step {
    /// Play the step, returning the fault it stands for.
    pub fn play(self) -> Result<(), Fault> {
        match self {
            Step::Succeed => Ok(()),
            Step::FailService => Err(ServiceError::new("logging", "unknown appender kind")
                .with_context("file: logging.json")
                .into()),
            Step::FailOutOfMemory => {
                Err(Fault::OutOfMemory("shared memory exhausted".into()))
            }
            Step::FailRuntime => Err(Fault::runtime("range error")),
            Step::FailUnknown => Err(Fault::Unknown),
            Step::Panic => panic!("configurator exploded"),
        }
    }
}

/// Configurator that follows a script, then succeeds forever.
#[derive(Debug, Default)]
pub struct ScriptedConfigurator {
    script: Mutex<Vec<Step>>,
    calls: AtomicUsize,
    paths: Mutex<Vec<PathBuf>>,
}

impl ScriptedConfigurator {
    pub fn new(script: &[Step]) -> Arc<Self> {
        let mut script = script.to_vec();
        script.reverse();
        Arc::new(Self {
            script: Mutex::new(script),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().unwrap().clone()
    }
}

impl Configure for ScriptedConfigurator {
    fn configure(&self, path: &Path) -> Result<(), Fault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.paths.lock().unwrap().push(path.to_path_buf());
        let step = self.script.lock().unwrap().pop().unwrap_or(Step::Succeed);
        step.play()
    }
}

/// Application whose every phase is scripted.
pub struct ScriptedApp {
    pub accept_init: bool,
    /// Panic with this message instead of answering `initialize`.
    pub init_panic: Option<&'static str>,
    pub logging_conf: PathBuf,
    pub startup: Step,
    pub exec: Step,
    pub shutdown: Shutdown,
    pub journal: Arc<Mutex<Vec<&'static str>>>,
}

impl ScriptedApp {
    pub fn new(logging_conf: impl Into<PathBuf>) -> Self {
        Self {
            accept_init: true,
            init_panic: None,
            logging_conf: logging_conf.into(),
            startup: Step::Succeed,
            exec: Step::Succeed,
            shutdown: Shutdown::new(),
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn journal(&self) -> Vec<&'static str> {
        self.journal.lock().unwrap().clone()
    }

    fn note(&self, entry: &'static str) {
        self.journal.lock().unwrap().push(entry);
    }
}

impl Application for ScriptedApp {
    fn initialize(&mut self, _args: Vec<OsString>) -> bool {
        self.note("initialize");
        if let Some(message) = self.init_panic {
            panic!("{message}");
        }
        self.accept_init
    }

    fn startup(&mut self) -> Result<(), Fault> {
        self.note("startup");
        self.startup.play()
    }

    async fn exec(&mut self) -> Result<(), Fault> {
        self.note("exec");
        self.exec.play()
    }

    fn logging_conf(&self) -> PathBuf {
        self.logging_conf.clone()
    }

    fn version_string(&self) -> String {
        "9.9.9-test".to_string()
    }

    fn full_config_file_path(&self) -> PathBuf {
        PathBuf::from("/srv/config/config.toml")
    }

    fn data_dir(&self) -> PathBuf {
        PathBuf::from("/srv/data")
    }

    fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    fn stop(&mut self) {
        self.note("stop");
    }
}

/// Arguments as the process would receive them.
pub fn argv() -> Vec<OsString> {
    vec![OsString::from("fill-postgresql")]
}
