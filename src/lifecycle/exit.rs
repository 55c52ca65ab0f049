//! Fault to exit-code translation.
//!
//! # Responsibilities
//! - Map any fault reaching the top level onto a process exit code
//! - Emit exactly one error record describing it
//!
//! # Design Decisions
//! - One ordered match over [`Fault`] instead of type inspection
//! - Initialization refusal never gets here; the orchestrator returns
//!   [`ExitStatus::InitializeFail`] directly

use crate::lifecycle::fault::{
    diagnostic_information, Fault, BAD_ALLOC_MESSAGE, UNKNOWN_FAULT_MESSAGE,
};

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitStatus {
    /// Any other fault reached the top level.
    OtherFail = -2,
    /// The application or one of its plugins refused to initialize.
    InitializeFail = -1,
    Success = 0,
    /// Shared memory or allocator exhaustion.
    BadAlloc = 1,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<ExitStatus> for i32 {
    fn from(status: ExitStatus) -> Self {
        status.code()
    }
}

/// Outcome of classifying a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    pub status: ExitStatus,
    pub message: String,
}

/// Classify a fault without logging it.
pub fn classify(fault: &Fault) -> FaultReport {
    let (status, message) = match fault {
        Fault::Service(e) => (ExitStatus::OtherFail, e.detail_string()),
        Fault::OutOfMemory(_) => (ExitStatus::BadAlloc, BAD_ALLOC_MESSAGE.to_string()),
        Fault::Diagnostic(e) => (ExitStatus::OtherFail, diagnostic_information(e.as_ref())),
        Fault::Runtime(message) => (ExitStatus::OtherFail, message.clone()),
        Fault::Other(e) => (ExitStatus::OtherFail, e.to_string()),
        Fault::Unknown => (ExitStatus::OtherFail, UNKNOWN_FAULT_MESSAGE.to_string()),
    };
    FaultReport { status, message }
}

/// Classify a fault and log it once at error level.
pub fn report(fault: &Fault) -> ExitStatus {
    let FaultReport { status, message } = classify(fault);
    tracing::error!(exit_code = status.code(), "{}", message);
    status
}
