//! Metrics collection.
//!
//! # Metrics
//! - `logging_reload_signals_total` (counter): reload signals handled
//! - `logging_reloads_total` (counter): reload outcomes by `outcome`
//! - `logging_active_sinks` (gauge): sinks registered after the last initialization
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; installing an exporter is up to
//!   the embedding binary
//! - Without a recorder every call is a no-op

use metrics::{counter, gauge};

pub fn record_reload_signal() {
    counter!("logging_reload_signals_total").increment(1);
}

/// Record the outcome of one reload cycle ("applied", "skipped", "failed").
pub fn record_reload(outcome: &'static str) {
    counter!("logging_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_active_sinks(count: usize) {
    gauge!("logging_active_sinks").set(count as f64);
}
