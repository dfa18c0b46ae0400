//! Runtime error types

use std::fmt;

use thiserror::Error;

use crate::exception::ExceptionObject;

/// An exception that reached the process boundary without a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncaughtException {
    exception: ExceptionObject,
    description: String,
}

impl UncaughtException {
    /// Pair a bucket with its rendering
    pub fn new(exception: ExceptionObject, description: impl Into<String>) -> Self {
        Self {
            exception,
            description: description.into(),
        }
    }

    /// The bucket exactly as it was raised
    pub fn exception(&self) -> ExceptionObject {
        self.exception
    }

    /// Rendering such as `Failure("bad input")`
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for UncaughtException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exception {}", self.description)
    }
}

/// Errors surfaced to embedders
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A raise escaped the outermost handler
    #[error("uncaught {0}")]
    Uncaught(UncaughtException),
}

impl From<UncaughtException> for RuntimeError {
    fn from(report: UncaughtException) -> Self {
        Self::Uncaught(report)
    }
}

/// Result type for embedder-facing entry points
pub type RuntimeResult<T> = Result<T, RuntimeError>;
