//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     initialize app → configure logging → init sinks → arm reload
//!         → log version/config/data dir → startup → exec
//!
//! Reload (reload.rs):
//!     SIGHUP → reload file if present → re-init sinks → re-arm
//!
//! Shutdown (shutdown.rs):
//!     exec returns → trigger → reload watch cancelled → join
//!
//! Exit (exit.rs):
//!     Fault → classify → one error line → exit code
//! ```
//!
//! # Design Decisions
//! - Everything runs on one current-thread runtime
//! - Faults are values ([`fault::Fault`]); panics are caught and converted
//! - Only the top-level scope turns a fault into an exit code

pub mod exit;
pub mod fault;
pub mod reload;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use exit::ExitStatus;
pub use fault::{Fault, ServiceError};
pub use reload::{ReloadLoop, ReloadOutcome, ReloadStatus, ReloadWatch};
pub use shutdown::Shutdown;
pub use signals::{HangupSignal, ReloadTrigger};
pub use startup::{Application, LoggingBootstrap, Service};
