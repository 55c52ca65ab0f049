//! fill-postgresql
//!
//! Service bootstrap: argument parsing, logging setup with SIGHUP reload,
//! plugin lifecycle, and mapping of fatal faults to exit codes.
//!
//! # Architecture Overview
//!
//! ```text
//!   argv ──▶ ┌──────────────────────────────────────────────────────────┐
//!            │                       Service                            │
//!            │                                                          │
//!            │  ServiceApp::initialize ──false──▶ exit -1               │
//!            │          │                                               │
//!            │          ▼                                               │
//!            │  LoggingBootstrap ──▶ LoggingConfigurator ──▶ sinks      │
//!            │          │                     ▲                         │
//!            │          ▼                     │ SIGHUP                  │
//!            │  ReloadLoop ───────────────────┘                         │
//!            │          │                                               │
//!            │          ▼                                               │
//!            │  startup ──▶ exec (until SIGINT/SIGTERM)                 │
//!            │                                                          │
//!            │  any Fault / panic ──▶ exit::report ──▶ exit 1 / -2      │
//!            └──────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use fill_postgresql::lifecycle::{HangupSignal, Service};
use fill_postgresql::observability::logging::{init_subscriber, LoggingConfigurator};
use fill_postgresql::{ServiceApp, SinkRegistry};

fn main() {
    let sinks = SinkRegistry::with_default_console();

    let configurator = match init_subscriber(&sinks) {
        Ok(filter) => LoggingConfigurator::new(sinks.clone()).with_filter(filter),
        Err(e) => {
            eprintln!("fill-postgresql: failed to install log subscriber: {e}");
            LoggingConfigurator::new(sinks.clone())
        }
    };

    let mut service = Service::new(ServiceApp::new(), sinks, Arc::new(configurator));
    let status = service.run(std::env::args_os(), HangupSignal::register);

    std::process::exit(status.code());
}
