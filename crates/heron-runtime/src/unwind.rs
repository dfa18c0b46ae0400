//! Non-local control transfer
//!
//! Raising abandons the current call chain and resumes at the most recently
//! installed handler. The default mechanism rides on Rust unwinding: the
//! bucket travels as a private panic payload via [`std::panic::resume_unwind`]
//! (which skips the panic hook) and [`Runtime::try_with`](crate::Runtime::try_with)
//! catches it with `catch_unwind`. Panics that do not carry a bucket pass
//! through handlers untouched.

use std::any::Any;
use std::panic;

use crate::exception::ExceptionObject;

/// Payload of an in-flight unwind
pub type Payload = Box<dyn Any + Send + 'static>;

/// Marker payload carrying a raised bucket
struct Raised(ExceptionObject);

/// Handler-frame bookkeeping and the transfer primitive
pub trait Unwinder {
    /// True if at least one handler is installed
    fn has_handler(&self) -> bool;

    /// A handler scope is being entered
    fn enter_handler(&mut self);

    /// A handler scope is being left, normally or by catching
    fn leave_handler(&mut self);

    /// Resume at the innermost handler with `exn` as the result
    fn transfer_to_handler(&mut self, exn: ExceptionObject) -> !;

    /// Extract the bucket from a caught payload, or hand the payload back if
    /// the unwind was not a raise
    fn recover(&mut self, payload: Payload) -> Result<ExceptionObject, Payload> {
        recover(payload)
    }
}

/// Start unwinding with `exn` as the payload
pub fn unwind(exn: ExceptionObject) -> ! {
    panic::resume_unwind(Box::new(Raised(exn)))
}

/// Extract the bucket from a payload produced by [`unwind`]
pub fn recover(payload: Payload) -> Result<ExceptionObject, Payload> {
    payload.downcast::<Raised>().map(|raised| raised.0)
}

/// Default unwinder: counts installed handlers and unwinds the Rust stack
#[derive(Debug, Default)]
pub struct PanicUnwinder {
    depth: usize,
}

impl PanicUnwinder {
    /// Create an unwinder with no handlers installed
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of installed handlers
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Unwinder for PanicUnwinder {
    fn has_handler(&self) -> bool {
        self.depth > 0
    }

    fn enter_handler(&mut self) {
        self.depth += 1;
    }

    fn leave_handler(&mut self) {
        debug_assert!(self.depth > 0, "handler stack underflow");
        self.depth = self.depth.saturating_sub(1);
    }

    fn transfer_to_handler(&mut self, exn: ExceptionObject) -> ! {
        tracing::trace!(target: "heron::raise", depth = self.depth, "transferring to handler");
        unwind(exn)
    }
}
