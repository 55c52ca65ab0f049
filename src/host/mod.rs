//! Service host.
//!
//! # Responsibilities
//! - Parse the command line and resolve data/config locations
//! - Load the service options file and hand each plugin its table
//! - Start plugins in order, stop them in reverse
//!
//! # Data Flow
//! ```text
//! argv ─▶ cli.rs ─▶ ResolvedPaths ─▶ config.toml ─▶ plugin.initialize()
//!                                                       │
//!                      startup() ◀──────────────────────┘
//!                          │
//!                   exec(): SIGINT/SIGTERM or Shutdown ─▶ plugin.shutdown() (reverse)
//! ```

pub mod app;
pub mod cli;
pub mod plugin;

pub use app::ServiceApp;
pub use plugin::{Plugin, PluginError};
