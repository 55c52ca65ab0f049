//! Configuration schema definitions.
//!
//! Two files feed the service:
//! - `logging.json`: global level directive plus the appenders (sinks) to
//!   build. Re-read on every SIGHUP.
//! - `config.toml`: service options, one table per plugin. Read once at
//!   initialization.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Level;

/// Root of the logging configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global filter directive in `EnvFilter` syntax (e.g. "info,fill_postgresql=debug").
    pub level: String,

    /// Appenders to register. Replaces the whole sink set on every load.
    pub appenders: Vec<AppenderConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            appenders: vec![AppenderConfig {
                name: "stderr".to_string(),
                kind: AppenderKind::Console {
                    stream: ConsoleStream::Stderr,
                },
                format: LogFormat::Text,
                level: default_appender_level(),
            }],
        }
    }
}

/// One appender entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppenderConfig {
    /// Unique name; the key in the sink registry.
    pub name: String,

    /// Destination of the records.
    #[serde(flatten)]
    pub kind: AppenderKind,

    /// Line format.
    #[serde(default)]
    pub format: LogFormat,

    /// Most verbose level this appender accepts.
    #[serde(default = "default_appender_level")]
    pub level: String,
}

impl AppenderConfig {
    /// Parsed appender level, `None` if the string is not a tracing level.
    pub fn level_filter(&self) -> Option<Level> {
        Level::from_str(&self.level).ok()
    }
}

fn default_appender_level() -> String {
    "trace".to_string()
}

/// Appender destination, tagged by `kind` in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppenderKind {
    /// Standard output or standard error.
    Console {
        #[serde(default)]
        stream: ConsoleStream,
    },
    /// Append-only file, reopened on every sink initialization.
    File { path: PathBuf },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleStream {
    Stdout,
    #[default]
    Stderr,
}

/// Rendering of a single record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Service options file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Per-plugin option tables, keyed by plugin name.
    pub plugin: BTreeMap<String, toml::Table>,
}

impl ServiceConfig {
    /// Options for the named plugin, if the file has a `[plugin.<name>]` table.
    pub fn plugin_options(&self, name: &str) -> Option<&toml::Table> {
        self.plugin.get(name)
    }
}
