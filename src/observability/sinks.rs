//! Log sinks (appenders).
//!
//! # Responsibilities
//! - Format events with a `tracing_subscriber::fmt` layer per sink
//!   (text or JSON)
//! - Deliver lines to stdout/stderr or to an append-only file
//! - Re-attach to the runtime on [`Sink::initialize`]
//!
//! # Design Decisions
//! - Sinks receive span and event callbacks from the fan-out layer and hand
//!   them to their own formatter; only the writer differs between sinks
//! - File writes happen on a writer task spawned on the runtime handle;
//!   the formatter only enqueues
//! - `initialize` reopens the file, so rotate-then-SIGHUP yields a fresh file
//! - Lines written before the first `initialize` are buffered (bounded)

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::Registry;

use crate::config::schema::{AppenderConfig, AppenderKind, ConsoleStream, LogFormat};

/// Upper bound of lines a file sink keeps before its first initialization.
const MAX_PENDING_LINES: usize = 1024;

/// Formatting layer owned by a sink.
pub type SinkFormatter = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the `fmt` layer for a format, writing through `writer`.
///
/// JSON output leaves spans out: a sink added after a span was created has
/// no formatted fields stored for it.
pub fn build_formatter<W>(format: LogFormat, ansi: bool, writer: W) -> SinkFormatter
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => Box::new(
            tracing_subscriber::fmt::layer::<Registry>()
                .with_ansi(ansi)
                .with_target(true)
                .with_writer(writer),
        ),
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt::layer::<Registry>()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_target(true)
                .with_writer(writer),
        ),
    }
}

/// A live output destination for log events.
pub trait Sink: Send + Sync + fmt::Debug {
    /// Registry key.
    fn name(&self) -> &str;

    /// Most verbose level this sink accepts.
    fn level(&self) -> Level;

    fn on_new_span(&self, _attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, Registry>) {}

    fn on_record(&self, _id: &Id, _values: &Record<'_>, _ctx: Context<'_, Registry>) {}

    /// Called only for events the sink [admits](Sink::admits).
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, Registry>);

    /// (Re)attach the sink to the runtime. Called after every configuration load.
    fn initialize(&self, handle: &Handle) -> io::Result<()>;

    fn admits(&self, level: &Level) -> bool {
        *level <= self.level()
    }
}

/// Build the sink described by an appender entry.
///
/// The level must already be validated; an unparsable one falls back to `TRACE`.
pub fn build_sink(config: &AppenderConfig) -> Box<dyn Sink> {
    let level = config.level_filter().unwrap_or(Level::TRACE);
    match &config.kind {
        AppenderKind::Console { stream } => Box::new(ConsoleSink::new(
            config.name.clone(),
            *stream,
            config.format,
            level,
        )),
        AppenderKind::File { path } => Box::new(FileSink::new(
            config.name.clone(),
            path.clone(),
            config.format,
            level,
        )),
    }
}

/// Writes lines to stdout or stderr.
pub struct ConsoleSink {
    name: String,
    stream: ConsoleStream,
    format: LogFormat,
    level: Level,
    formatter: SinkFormatter,
    initializations: AtomicU64,
}

impl ConsoleSink {
    pub fn new(
        name: impl Into<String>,
        stream: ConsoleStream,
        format: LogFormat,
        level: Level,
    ) -> Self {
        let formatter = match stream {
            ConsoleStream::Stdout => build_formatter(format, true, io::stdout),
            ConsoleStream::Stderr => build_formatter(format, true, io::stderr),
        };
        Self {
            name: name.into(),
            stream,
            format,
            level,
            formatter,
            initializations: AtomicU64::new(0),
        }
    }

    /// Standard-error text sink used before any configuration is loaded.
    pub fn stderr() -> Self {
        Self::new("stderr", ConsoleStream::Stderr, LogFormat::Text, Level::TRACE)
    }

    /// Number of times `initialize` ran.
    pub fn initializations(&self) -> u64 {
        self.initializations.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("name", &self.name)
            .field("stream", &self.stream)
            .field("format", &self.format)
            .field("level", &self.level)
            .finish()
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> Level {
        self.level
    }

    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, Registry>) {
        self.formatter.on_new_span(attrs, id, ctx);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, Registry>) {
        self.formatter.on_record(id, values, ctx);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, Registry>) {
        self.formatter.on_event(event, ctx);
    }

    fn initialize(&self, _handle: &Handle) -> io::Result<()> {
        self.initializations.fetch_add(1, Ordering::Relaxed);
        match self.stream {
            ConsoleStream::Stdout => io::stdout().flush(),
            ConsoleStream::Stderr => io::stderr().flush(),
        }
    }
}

enum FileState {
    /// Not initialized yet; lines wait here.
    Pending(Vec<Vec<u8>>),
    /// Lines go to the writer task of the current file handle.
    Running(mpsc::UnboundedSender<Vec<u8>>),
}

/// `MakeWriter` handing formatted lines to the file sink's current state.
#[derive(Clone)]
struct FileOutput {
    state: Arc<Mutex<FileState>>,
}

impl FileOutput {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FileState::Pending(Vec::new()))),
        }
    }
}

impl Write for FileOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("file sink state poisoned"))?;
        match &mut *state {
            FileState::Pending(lines) => {
                if lines.len() < MAX_PENDING_LINES {
                    lines.push(buf.to_vec());
                }
            }
            FileState::Running(tx) => {
                let _ = tx.send(buf.to_vec());
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for FileOutput {
    type Writer = FileOutput;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Append-only file sink.
pub struct FileSink {
    name: String,
    path: PathBuf,
    format: LogFormat,
    level: Level,
    output: FileOutput,
    formatter: SinkFormatter,
}

impl FileSink {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        format: LogFormat,
        level: Level,
    ) -> Self {
        let output = FileOutput::new();
        let formatter = build_formatter(format, false, output.clone());
        Self {
            name: name.into(),
            path: path.into(),
            format,
            level,
            output,
            formatter,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a writer task is attached.
    pub fn is_running(&self) -> bool {
        matches!(self.output.state.lock().as_deref(), Ok(FileState::Running(_)))
    }
}

impl fmt::Debug for FileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSink")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("format", &self.format)
            .field("level", &self.level)
            .finish()
    }
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> Level {
        self.level
    }

    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, Registry>) {
        self.formatter.on_new_span(attrs, id, ctx);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, Registry>) {
        self.formatter.on_record(id, values, ctx);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, Registry>) {
        self.formatter.on_event(event, ctx);
    }

    fn initialize(&self, handle: &Handle) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self
            .output
            .state
            .lock()
            .map_err(|_| io::Error::other("file sink state poisoned"))?;
        if let FileState::Pending(lines) = &mut *state {
            for line in lines.drain(..) {
                let _ = tx.send(line);
            }
        }
        // Dropping the previous sender lets the old writer drain and close its file.
        *state = FileState::Running(tx);
        drop(state);

        handle.spawn(write_lines(tokio::fs::File::from_std(file), rx));
        Ok(())
    }
}

async fn write_lines(mut file: tokio::fs::File, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(line) = rx.recv().await {
        if file.write_all(&line).await.is_err() {
            break;
        }
        if file.flush().await.is_err() {
            break;
        }
    }
    let _ = file.flush().await;
}
