//! # Heron Runtime
//!
//! Exception raising for the Heron runtime: turning native error conditions
//! into exception objects and delivering them to the nearest handler.
//!
//! ## Design Principles
//!
//! - **Never returns**: every raising entry point has type `!`
//! - **Allocation-safe**: constructors and arguments are rooted across the
//!   bucket allocation, so a collection mid-construction is harmless
//! - **Out_of_memory without memory**: its bucket is a static block, raising
//!   it never calls the allocator
//! - **Invariants first**: a raise leaves any blocking section before control
//!   moves to a handler
//!
//! ```
//! use heron_runtime::{Predefined, Runtime};
//!
//! let mut rt = Runtime::new();
//! let exn = rt.try_with(|rt| rt.failure("bad input")).err().unwrap();
//! assert_eq!(exn.tag(rt.heap()), Some(Predefined::Failure.into()));
//! assert_eq!(rt.describe(exn), "Failure(\"bad input\")");
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod boundary;
pub mod construct;
pub mod error;
pub mod exception;
pub mod format;
pub mod raise;
pub mod runtime;
pub mod section;
pub mod tag;
pub mod unwind;

pub use boundary::{ExitBoundary, ProcessBoundary, UNCAUGHT_EXIT_CODE, UnwindBoundary};
pub use error::{RuntimeError, RuntimeResult, UncaughtException};
pub use exception::ExceptionObject;
pub use runtime::{Runtime, RuntimeConfig};
pub use section::{BlockingSection, SectionFlag};
pub use tag::{ExnTag, Predefined, UserTag};
pub use unwind::{PanicUnwinder, Payload, Unwinder};

pub use heron_gc::{GcConfig, Value};
