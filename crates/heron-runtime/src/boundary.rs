//! The process boundary: where an unhandled raise ends up

use std::panic;

use crate::error::UncaughtException;

/// Default exit status for an uncaught exception
pub const UNCAUGHT_EXIT_CODE: i32 = 2;

/// Terminal target of a raise with no installed handler
pub trait ProcessBoundary {
    /// Report the exception and stop
    fn terminate(&mut self, report: UncaughtException) -> !;
}

/// Print the exception to stderr and exit the process
#[derive(Debug)]
pub struct ExitBoundary {
    exit_code: i32,
}

impl ExitBoundary {
    /// Exit with the given status
    pub fn new(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

impl Default for ExitBoundary {
    fn default() -> Self {
        Self::new(UNCAUGHT_EXIT_CODE)
    }
}

impl ProcessBoundary for ExitBoundary {
    fn terminate(&mut self, report: UncaughtException) -> ! {
        eprintln!("Fatal error: {report}");
        std::process::exit(self.exit_code)
    }
}

/// Unwind out of the runtime with the report as panic payload.
///
/// For embedders that host the runtime on a thread they want to keep.
#[derive(Debug, Default)]
pub struct UnwindBoundary;

impl ProcessBoundary for UnwindBoundary {
    fn terminate(&mut self, report: UncaughtException) -> ! {
        panic::resume_unwind(Box::new(report))
    }
}
