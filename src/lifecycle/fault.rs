//! Fault taxonomy.
//!
//! Everything that can escape startup, the event loop, or a configuration
//! reload is expressed as a [`Fault`]. The variants are ordered from the
//! most to the least descriptive, which is the order the exit-code
//! classifier and the reload loop inspect them in.

use std::any::Any;
use std::collections::TryReserveError;
use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Boxed error accepted by the generic fault kinds.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Structured service fault.
///
/// Carries a short name, a message and any number of context lines
/// (file, plugin, offending value...). [`ServiceError::detail_string`]
/// renders all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    name: String,
    message: String,
    context: Vec<String>,
}

impl ServiceError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Append a context line.
    pub fn with_context(mut self, line: impl Into<String>) -> Self {
        self.context.push(line.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// Header line followed by one indented line per context entry.
    pub fn detail_string(&self) -> String {
        let mut out = format!("{}: {}", self.name, self.message);
        for line in &self.context {
            out.push_str("\n    ");
            out.push_str(line);
        }
        out
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl StdError for ServiceError {}

/// A failure caught at a phase boundary.
#[derive(Debug, Error)]
pub enum Fault {
    /// Domain fault with a detail report.
    #[error("{0}")]
    Service(#[from] ServiceError),

    /// Shared memory or allocator exhaustion.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Error whose cause chain is worth reporting in full.
    #[error("{0}")]
    Diagnostic(BoxError),

    /// Runtime failure described by a message (panics land here).
    #[error("{0}")]
    Runtime(String),

    /// Any other error; only its message is reported.
    #[error("{0}")]
    Other(BoxError),

    /// Nothing could be extracted from the failure.
    #[error("unknown exception")]
    Unknown,
}

impl Fault {
    pub fn diagnostic(err: impl Into<BoxError>) -> Self {
        Fault::Diagnostic(err.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Fault::Runtime(message.into())
    }

    pub fn other(err: impl Into<BoxError>) -> Self {
        Fault::Other(err.into())
    }

    /// Convert a payload caught by `catch_unwind` or a panicked task.
    ///
    /// String payloads become [`Fault::Runtime`]; anything else is opaque.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        match payload.downcast::<String>() {
            Ok(message) => Fault::Runtime(*message),
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => Fault::Runtime((*message).to_string()),
                Err(_) => Fault::Unknown,
            },
        }
    }

    /// The most detailed description available, `None` for opaque faults.
    pub fn detailed_description(&self) -> Option<String> {
        match self {
            Fault::Service(e) => Some(e.detail_string()),
            Fault::OutOfMemory(_) => Some(BAD_ALLOC_MESSAGE.to_string()),
            Fault::Diagnostic(e) => Some(diagnostic_information(e.as_ref())),
            Fault::Runtime(message) => Some(message.clone()),
            Fault::Other(e) => Some(e.to_string()),
            Fault::Unknown => None,
        }
    }
}

/// Fixed report for allocation faults.
pub const BAD_ALLOC_MESSAGE: &str = "bad alloc";

/// Fixed report for opaque faults.
pub const UNKNOWN_FAULT_MESSAGE: &str = "unknown exception";

impl From<std::io::Error> for Fault {
    fn from(err: std::io::Error) -> Self {
        Fault::Other(Box::new(err))
    }
}

impl From<TryReserveError> for Fault {
    fn from(err: TryReserveError) -> Self {
        Fault::OutOfMemory(err.to_string())
    }
}

/// Render an error together with its whole `source()` chain.
pub fn diagnostic_information(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
